//! Relay engine: IO pipeline and effect execution.
mod decode;
mod extract;
mod feed;
mod fetch;
mod gate;
mod host;
mod persist;
mod relay;
mod sync;
mod types;

pub use decode::{decode_feed, DecodeError, DecodedFeed};
pub use extract::{parse_first_title, ParseError};
pub use feed::{FeedSession, FeedTiming, FetchRejected};
pub use fetch::{FeedSource, FetchSettings, ReqwestFeedSource};
pub use gate::{GateTiming, MessageGate, SharedSettings};
pub use host::HostAdapter;
pub use persist::{ensure_parent_dir, AtomicFileWriter, JsonFileStorage, PersistError};
pub use relay::{local_timezone_offset, Relay, RelayConfig};
pub use sync::till;
pub use types::{FailureKind, FeedDocument, FetchError, FetchMetadata};
