use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::value::{to_flag, to_tag, to_text};
use crate::{FieldValue, KeyValueStore, MsgType, SettingsPatch, StorageError, TITLE_CHUNK_LEN};

/// Reserved storage key holding the full persisted blob.
pub const STORAGE_KEY: &str = "pebbleTerm";

/// Characters left unescaped by query component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("configuration payload is not valid UTF-8 after decoding: {0}")]
    Encoding(String),
    #[error("configuration payload is not valid JSON: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    BluetoothVibe,
    TypingAnimation,
    TimezoneOffset,
    MsgType,
    FeedUrl,
    FeedEnabled,
    FeedTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Send,
    Persist,
}

#[derive(Debug, Clone, Copy)]
enum Normalize {
    /// Nonzero -> 1, everything else -> 0.
    Flag,
    /// Integer message tag.
    Tag,
    /// Fixed at startup; inbound values are ignored.
    ReadOnly,
    /// Trimmed, and only kept when it is an http(s) URL.
    HttpUrl,
    /// Computed from other fields on read.
    Derived,
    /// Text clipped to one transport chunk.
    Title,
}

struct FieldDescriptor {
    key: FieldKey,
    name: &'static str,
    send: bool,
    persist: bool,
    normalize: Normalize,
}

const FIELDS: [FieldDescriptor; 7] = [
    FieldDescriptor {
        key: FieldKey::BluetoothVibe,
        name: "bluetoothVibe",
        send: true,
        persist: true,
        normalize: Normalize::Flag,
    },
    FieldDescriptor {
        key: FieldKey::TypingAnimation,
        name: "typingAnimation",
        send: true,
        persist: true,
        normalize: Normalize::Flag,
    },
    FieldDescriptor {
        key: FieldKey::TimezoneOffset,
        name: "timezoneOffset",
        send: true,
        persist: true,
        normalize: Normalize::ReadOnly,
    },
    FieldDescriptor {
        key: FieldKey::MsgType,
        name: "msgType",
        send: true,
        persist: false,
        normalize: Normalize::Tag,
    },
    FieldDescriptor {
        key: FieldKey::FeedUrl,
        name: "feedUrl",
        send: false,
        persist: true,
        normalize: Normalize::HttpUrl,
    },
    FieldDescriptor {
        key: FieldKey::FeedEnabled,
        name: "feedEnabled",
        send: true,
        persist: false,
        normalize: Normalize::Derived,
    },
    FieldDescriptor {
        key: FieldKey::FeedTitle,
        name: "feedTitle",
        send: true,
        persist: false,
        normalize: Normalize::Title,
    },
];

impl FieldKey {
    pub const ALL: [FieldKey; 7] = [
        FieldKey::BluetoothVibe,
        FieldKey::TypingAnimation,
        FieldKey::TimezoneOffset,
        FieldKey::MsgType,
        FieldKey::FeedUrl,
        FieldKey::FeedEnabled,
        FieldKey::FeedTitle,
    ];

    fn descriptor(self) -> &'static FieldDescriptor {
        let descriptor = &FIELDS[self as usize];
        debug_assert_eq!(descriptor.key, self);
        descriptor
    }

    /// Wire and storage name of the field.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FIELDS
            .iter()
            .find(|descriptor| descriptor.name == name)
            .map(|descriptor| descriptor.key)
    }

    pub fn is_sent(self) -> bool {
        self.descriptor().send
    }

    pub fn is_persisted(self) -> bool {
        self.descriptor().persist
    }

    fn selected_by(self, kind: SnapshotKind) -> bool {
        match kind {
            SnapshotKind::Send => self.is_sent(),
            SnapshotKind::Persist => self.is_persisted(),
        }
    }
}

/// Ordered field values selected for one purpose. Serializes as a JSON map
/// in field declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    entries: Vec<(FieldKey, FieldValue)>,
}

impl Snapshot {
    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, value)| value)
    }

    pub fn msg_type(&self) -> Option<MsgType> {
        self.get(FieldKey::MsgType)
            .and_then(FieldValue::as_int)
            .and_then(MsgType::from_tag)
    }

    pub fn feed_title(&self) -> Option<&str> {
        self.get(FieldKey::FeedTitle).and_then(FieldValue::as_text)
    }

    pub fn entries(&self) -> &[(FieldKey, FieldValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map = self
            .entries
            .iter()
            .map(|(key, value)| (key.name().to_string(), value.to_json()))
            .collect::<Map<String, Value>>();
        Value::Object(map)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.name(), value)?;
        }
        map.end()
    }
}

/// Typed settings shared by the message gate and the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsStore {
    values: [FieldValue; 7],
}

impl SettingsStore {
    /// `timezone_offset` is the local offset in seconds, positive west of UTC.
    pub fn new(timezone_offset: i64) -> Self {
        Self {
            values: [
                FieldValue::Int(1),
                FieldValue::Int(1),
                FieldValue::Int(timezone_offset),
                FieldValue::Int(MsgType::Ping.tag()),
                FieldValue::Text(String::new()),
                FieldValue::Int(0),
                FieldValue::Text(String::new()),
            ],
        }
    }

    pub fn get(&self, key: FieldKey) -> FieldValue {
        match key.descriptor().normalize {
            Normalize::Derived => self.derive(key),
            _ => self.values[key as usize].clone(),
        }
    }

    /// Normalizes `raw`, stores it and returns the value `get` now reports.
    pub fn set(&mut self, key: FieldKey, raw: &Value) -> FieldValue {
        let index = key as usize;
        let normalized = match key.descriptor().normalize {
            Normalize::Flag => Some(FieldValue::Int(to_flag(raw))),
            Normalize::Tag => Some(FieldValue::Int(to_tag(raw))),
            Normalize::ReadOnly | Normalize::Derived => None,
            Normalize::HttpUrl => Some(FieldValue::Text(normalize_url(
                &to_text(raw).unwrap_or_default(),
            ))),
            Normalize::Title => to_text(raw).map(|text| FieldValue::Text(clip_title(&text))),
        };
        if let Some(value) = normalized {
            self.values[index] = value;
        }
        self.get(key)
    }

    pub fn set_value(&mut self, key: FieldKey, value: &FieldValue) -> FieldValue {
        self.set(key, &value.to_json())
    }

    pub fn feed_url(&self) -> String {
        self.get(FieldKey::FeedUrl)
            .as_text()
            .unwrap_or_default()
            .to_string()
    }

    pub fn feed_title(&self) -> String {
        self.get(FieldKey::FeedTitle)
            .as_text()
            .unwrap_or_default()
            .to_string()
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        for (key, value) in patch.entries() {
            self.set_value(*key, value);
        }
    }

    /// Applies every recognized key of `data`; unknown keys are ignored.
    pub fn update_from(&mut self, data: &Map<String, Value>) -> usize {
        self.apply_matching(data, |_| true)
    }

    pub fn snapshot(&self, kind: SnapshotKind) -> Snapshot {
        let entries = FieldKey::ALL
            .into_iter()
            .filter(|key| key.selected_by(kind))
            .map(|key| (key, self.get(key)))
            .collect();
        Snapshot { entries }
    }

    pub fn serialize_for_transport(&self) -> Snapshot {
        self.snapshot(SnapshotKind::Send)
    }

    pub fn serialize_for_persistence(&self) -> Value {
        self.snapshot(SnapshotKind::Persist).to_json()
    }

    /// Appends the persisted fields to `base_url` as percent-encoded query
    /// parameters.
    pub fn encode_query_string(&self, base_url: &str) -> String {
        let query = self
            .snapshot(SnapshotKind::Persist)
            .entries()
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key.name(), COMPONENT),
                    utf8_percent_encode(&value.to_storage_string(), COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        let separator = if base_url.contains('?') { '&' } else { '?' };
        format!("{base_url}{separator}{query}")
    }

    /// Decodes the configuration page response and applies the persisted
    /// fields it names. Returns how many fields were applied.
    pub fn decode_configuration(&mut self, payload: &str) -> Result<usize, SettingsError> {
        let decoded = percent_decode_str(payload)
            .decode_utf8()
            .map_err(|err| SettingsError::Encoding(err.to_string()))?;
        let data: Value = serde_json::from_str(&decoded)
            .map_err(|err| SettingsError::MalformedPayload(err.to_string()))?;
        match data {
            Value::Object(map) => Ok(self.apply_matching(&map, FieldKey::is_persisted)),
            _ => Ok(0),
        }
    }

    /// Restores persisted fields, preferring the reserved blob over the
    /// per-field keys. Unreadable data leaves defaults in place.
    pub fn load(&mut self, storage: &dyn KeyValueStore) -> usize {
        let blob = storage
            .get(STORAGE_KEY)
            .and_then(|text| serde_json::from_str::<Value>(&text).ok());
        if let Some(Value::Object(map)) = blob {
            return self.apply_matching(&map, FieldKey::is_persisted);
        }

        let mut applied = 0;
        for key in FieldKey::ALL.into_iter().filter(|key| key.is_persisted()) {
            if let Some(text) = storage.get(key.name()) {
                self.set(key, &Value::String(text));
                applied += 1;
            }
        }
        applied
    }

    pub fn save(&self, storage: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let snapshot = self.snapshot(SnapshotKind::Persist);
        for (key, value) in snapshot.entries() {
            storage.set(key.name(), &value.to_storage_string())?;
        }
        storage.set(STORAGE_KEY, &snapshot.to_json().to_string())
    }

    /// Removes every stored key this store does not own. Returns the number
    /// of keys removed.
    pub fn clear_other_keys(&self, storage: &mut dyn KeyValueStore) -> Result<usize, StorageError> {
        let foreign = storage
            .keys()
            .into_iter()
            .filter(|key| !is_owned_key(key))
            .collect::<Vec<_>>();
        for key in &foreign {
            storage.remove(key)?;
        }
        Ok(foreign.len())
    }

    fn apply_matching(
        &mut self,
        data: &Map<String, Value>,
        accept: impl Fn(FieldKey) -> bool,
    ) -> usize {
        let mut applied = 0;
        for (name, raw) in data {
            if let Some(key) = FieldKey::from_name(name).filter(|key| accept(*key)) {
                self.set(key, raw);
                applied += 1;
            }
        }
        applied
    }

    fn derive(&self, key: FieldKey) -> FieldValue {
        match key {
            FieldKey::FeedEnabled => FieldValue::Int(i64::from(!self.feed_url().is_empty())),
            other => self.values[other as usize].clone(),
        }
    }
}

fn is_owned_key(key: &str) -> bool {
    key == STORAGE_KEY || FieldKey::from_name(key).is_some_and(FieldKey::is_persisted)
}

fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        String::new()
    }
}

fn clip_title(text: &str) -> String {
    text.chars().take(TITLE_CHUNK_LEN).collect()
}
