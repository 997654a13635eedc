use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Characters per transport message.
pub const TITLE_CHUNK_LEN: usize = 17;
/// Longest title the device buffer accepts, ellipsis included.
pub const TITLE_MAX_LEN: usize = 127;

pub const LOADING_TITLE: &str = "Loading...";
pub const NO_ITEM: &str = "No item";
pub const ITEM_HAS_NO_TITLE: &str = "Item has no title";

const ELLIPSIS: &str = "...";

/// Reduces `text` to printable ASCII: compatibility decomposition, accents
/// dropped, anything still outside ASCII replaced by a space.
pub fn transliterate(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { ' ' })
        .collect()
}

/// Display form of a feed title: ASCII only, single spaces, at most
/// [`TITLE_MAX_LEN`] characters.
pub fn format_title(title: &str) -> String {
    let collapsed = collapse_whitespace(&transliterate(title));
    if collapsed.len() <= TITLE_MAX_LEN {
        return collapsed;
    }

    let keep = TITLE_MAX_LEN - ELLIPSIS.len();
    let mut cut = collapsed[..keep].trim_end().to_string();
    cut.push_str(ELLIPSIS);
    cut
}

/// Splits a formatted title into transport-sized pieces. Every chunk but the
/// last holds exactly `chunk_len` characters.
pub fn title_chunks(title: &str, chunk_len: usize) -> Vec<String> {
    let chars = title.chars().collect::<Vec<_>>();
    chars
        .chunks(chunk_len.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
