//! Relay core: pure settings model, message gate bookkeeping, title
//! formatting and the coordinator state machine.
mod effect;
mod gate;
mod message;
mod msg;
mod settings;
mod state;
mod storage;
mod title;
mod update;
mod value;

pub use effect::Effect;
pub use gate::{Admission, GateState, LockToken, QueuedMessage};
pub use message::{MsgType, Outbound, SettingsPatch};
pub use msg::Msg;
pub use settings::{
    FieldKey, SettingsError, SettingsStore, Snapshot, SnapshotKind, STORAGE_KEY,
};
pub use state::RelayState;
pub use storage::{KeyValueStore, MemoryStorage, StorageError};
pub use title::{
    format_title, title_chunks, transliterate, ITEM_HAS_NO_TITLE, LOADING_TITLE, NO_ITEM,
    TITLE_CHUNK_LEN, TITLE_MAX_LEN,
};
pub use update::update;
pub use value::FieldValue;
