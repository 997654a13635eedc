#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_core::{KeyValueStore, MemoryStorage, MsgType, SettingsStore, Snapshot, StorageError};
use relay_engine::{FeedDocument, FeedSource, FetchError, FetchMetadata, HostAdapter};

/// Host double that records everything the relay hands it.
#[derive(Default)]
pub struct RecordingHost {
    ready: AtomicBool,
    sent: Mutex<Vec<Snapshot>>,
    opened: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn ready() -> Arc<Self> {
        let host = Self::default();
        host.ready.store(true, Ordering::SeqCst);
        Arc::new(host)
    }

    pub fn not_ready() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Snapshot> {
        self.sent.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl HostAdapter for RecordingHost {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn send_app_message(&self, message: &Snapshot) {
        self.sent.lock().unwrap().push(message.clone());
    }

    fn open_url(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}

/// Feed source that always answers with the same body or error.
pub struct StaticSource {
    response: Result<String, FetchError>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn ok(body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn err(error: FetchError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FeedSource for StaticSource {
    async fn fetch_document(&self, url: &str) -> Result<FeedDocument, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map(|text| FeedDocument {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirect_count: 0,
                content_type: Some("application/rss+xml".to_string()),
                encoding_label: "UTF-8".to_string(),
                byte_len: text.len() as u64,
            },
            text,
        })
    }
}

/// Storage handle the test keeps a second reference to.
#[derive(Clone, Default)]
pub struct SharedStorage(pub Arc<Mutex<MemoryStorage>>);

impl SharedStorage {
    pub fn get(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key)
    }

    pub fn set(&self, key: &str, value: &str) {
        self.0.lock().unwrap().set(key, value).unwrap();
    }
}

impl KeyValueStore for SharedStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.lock().unwrap().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.0.lock().unwrap().remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.0.lock().unwrap().keys()
    }
}

pub fn shared_settings() -> Arc<Mutex<SettingsStore>> {
    Arc::new(Mutex::new(SettingsStore::new(0)))
}

pub const HELLO_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example channel</title>
    <link>http://example.com/</link>
    <item>
      <title>Hello World</title>
      <link>http://example.com/1</link>
    </item>
    <item>
      <title>Second</title>
    </item>
  </channel>
</rss>"#;

/// Yields (advancing a paused clock) until `cond` holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..20_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached");
}

/// Body text of every title transmission: the concatenated chunks sent
/// between a start marker and the following end marker.
pub fn transmitted_titles(sent: &[Snapshot]) -> Vec<String> {
    chunk_windows(sent)
        .into_iter()
        .map(|chunks| chunks.concat())
        .collect()
}

pub fn chunk_windows(sent: &[Snapshot]) -> Vec<Vec<String>> {
    let mut windows = Vec::new();
    let mut current: Option<Vec<String>> = None;
    for snapshot in sent {
        match snapshot.msg_type() {
            Some(MsgType::TitleStart) => current = Some(Vec::new()),
            Some(MsgType::TitleEnd) => {
                if let Some(chunks) = current.take() {
                    windows.push(chunks);
                }
            }
            _ => {
                if let Some(chunks) = current.as_mut() {
                    chunks.push(snapshot.feed_title().unwrap_or_default().to_string());
                }
            }
        }
    }
    windows
}
