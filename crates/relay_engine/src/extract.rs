use relay_logging::relay_warn;
use roxmltree::{Document, Node, ParsingOptions};

/// Why a feed document produced no headline. The display text is what the
/// device shows in place of a title.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("No item")]
    NoItem,
    #[error("Item has no title")]
    NoTitle,
}

/// Title of the first feed entry:
/// - first RSS `<item>`, otherwise first Atom `<entry>`
/// - text of its first `<title>` descendant (empty for `<title/>`)
///
/// A document that is not well-formed XML has no items.
pub fn parse_first_title(document: &str) -> Result<String, ParseError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = match Document::parse_with_options(document, options) {
        Ok(doc) => doc,
        Err(err) => {
            relay_warn!("feed is not well-formed XML: {}", err);
            return Err(ParseError::NoItem);
        }
    };

    let item = first_element(doc.root(), "item")
        .or_else(|| first_element(doc.root(), "entry"))
        .ok_or(ParseError::NoItem)?;
    let title = first_element(item, "title").ok_or(ParseError::NoTitle)?;
    Ok(title
        .descendants()
        .filter(Node::is_text)
        .filter_map(|node| node.text())
        .collect())
}

/// First descendant element with the given local name, in document order.
fn first_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|candidate| candidate.is_element() && candidate.has_tag_name(name))
}
