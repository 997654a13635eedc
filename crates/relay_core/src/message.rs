use crate::{FieldKey, FieldValue};

/// Message-type tags shared with the device firmware. The integer values are
/// part of the wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Ping,
    AppClose,
    FetchFeed,
    FeedReady,
    FeedFetched,
    TitleStart,
    TitleEnd,
}

impl MsgType {
    pub fn tag(self) -> i64 {
        match self {
            MsgType::Ping => 0,
            MsgType::AppClose => 1,
            MsgType::FetchFeed => 2,
            MsgType::FeedReady => 3,
            MsgType::FeedFetched => 4,
            MsgType::TitleStart => 5,
            MsgType::TitleEnd => 6,
        }
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(MsgType::Ping),
            1 => Some(MsgType::AppClose),
            2 => Some(MsgType::FetchFeed),
            3 => Some(MsgType::FeedReady),
            4 => Some(MsgType::FeedFetched),
            5 => Some(MsgType::TitleStart),
            6 => Some(MsgType::TitleEnd),
            _ => None,
        }
    }
}

/// Field updates carried by an outbound message, applied to the settings
/// store at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsPatch {
    entries: Vec<(FieldKey, FieldValue)>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn msg_type(self, msg_type: MsgType) -> Self {
        self.with(FieldKey::MsgType, FieldValue::Int(msg_type.tag()))
    }

    pub fn feed_title(self, title: impl Into<String>) -> Self {
        self.with(FieldKey::FeedTitle, FieldValue::Text(title.into()))
    }

    pub fn with(mut self, key: FieldKey, value: FieldValue) -> Self {
        self.entries.retain(|(existing, _)| *existing != key);
        self.entries.push((key, value));
        self
    }

    pub fn entries(&self) -> &[(FieldKey, FieldValue)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A message handed to the gate. `Ping` re-sends the current snapshot as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Ping,
    Update(SettingsPatch),
}

impl Outbound {
    pub fn is_ping(&self) -> bool {
        matches!(self, Outbound::Ping)
    }
}
