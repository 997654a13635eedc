use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use relay_core::{
    format_title, title_chunks, FieldKey, FieldValue, LockToken, MsgType, Outbound, SettingsPatch,
    LOADING_TITLE, TITLE_CHUNK_LEN,
};
use relay_logging::{relay_debug, relay_info, relay_trace, relay_warn};
use tokio::time::{sleep, Instant};

use crate::sync::lock;
use crate::{parse_first_title, till, FeedSource, MessageGate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTiming {
    /// Time from one fetch start to the next automatic fetch.
    pub fetch_interval: Duration,
    /// Keep-alive ping period while waiting for the next fetch.
    pub ping_interval: Duration,
    /// Pause after each title chunk.
    pub chunk_interval: Duration,
    /// Pause after the start and end markers.
    pub marker_delay: Duration,
}

impl Default for FeedTiming {
    fn default() -> Self {
        Self {
            fetch_interval: Duration::from_secs(5 * 60),
            ping_interval: Duration::from_millis(2500),
            chunk_interval: Duration::from_millis(1000),
            marker_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FetchRejected {
    #[error("cannot fetch feed: app closed")]
    Closed,
    #[error("cannot fetch feed: fetch in progress")]
    InProgress,
}

#[derive(Debug, Default)]
struct SessionFlags {
    fetching: bool,
    stop: bool,
    closed: bool,
    refetch_requested: bool,
    /// A display loop task is alive (fetching or waiting for the next cycle).
    running: bool,
    started_at: Option<Instant>,
    title: String,
    lock: Option<LockToken>,
}

struct Inner {
    url: String,
    gate: MessageGate,
    source: Arc<dyn FeedSource>,
    timing: FeedTiming,
    flags: Mutex<SessionFlags>,
}

/// Fetches one feed URL and streams its newest headline to the device,
/// refetching periodically until stopped.
///
/// Cycle: fetch -> parse -> chunked transmission under the gate lock -> wait
/// (with keep-alive pings) -> fetch again. A failed fetch or parse shows the
/// error text and stops the loop until the next explicit fetch.
#[derive(Clone)]
pub struct FeedSession {
    inner: Arc<Inner>,
}

impl FeedSession {
    pub fn new(
        url: impl Into<String>,
        gate: MessageGate,
        source: Arc<dyn FeedSource>,
        timing: FeedTiming,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                gate,
                source,
                timing,
                flags: Mutex::new(SessionFlags::default()),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Starts a fetch cycle. A loop that is waiting for its next cycle is
    /// woken instead of starting a second loop.
    pub fn fetch(&self) -> Result<(), FetchRejected> {
        {
            let mut flags = self.flags();
            if flags.closed {
                return Err(FetchRejected::Closed);
            }
            if flags.fetching {
                return Err(FetchRejected::InProgress);
            }
            if flags.running {
                flags.refetch_requested = true;
                return Ok(());
            }
            flags.running = true;
        }

        self.begin_cycle();
        tokio::spawn(self.clone().run());
        Ok(())
    }

    /// Asks for an early refetch; fetches right away when no loop is alive.
    pub fn request_refetch(&self) {
        let idle = {
            let mut flags = self.flags();
            if flags.closed {
                return;
            }
            flags.refetch_requested = true;
            !flags.running
        };
        if idle {
            if let Err(err) = self.fetch() {
                relay_debug!("refetch of {} not started: {}", self.inner.url, err);
            }
        }
    }

    /// Ends the session. Observed by the loop at its next poll.
    pub fn close(&self) {
        let mut flags = self.flags();
        flags.closed = true;
        flags.stop = true;
    }

    pub fn is_fetching(&self) -> bool {
        self.flags().fetching
    }

    pub fn is_stopped(&self) -> bool {
        self.flags().stop
    }

    pub fn is_closed(&self) -> bool {
        self.flags().closed
    }

    pub fn is_running(&self) -> bool {
        self.flags().running
    }

    pub fn refetch_requested(&self) -> bool {
        self.flags().refetch_requested
    }

    /// Last title shown or being shown, before formatting.
    pub fn title(&self) -> String {
        self.flags().title.clone()
    }

    fn flags(&self) -> MutexGuard<'_, SessionFlags> {
        lock(&self.inner.flags)
    }

    fn begin_cycle(&self) {
        {
            let mut flags = self.flags();
            flags.fetching = true;
            flags.refetch_requested = false;
            flags.started_at = Some(Instant::now());
            flags.title = LOADING_TITLE.to_string();
        }
        self.announce(LOADING_TITLE);
    }

    fn announce(&self, title: &str) {
        let sender = self.flags().lock;
        self.inner
            .gate
            .send_from(sender, Outbound::Update(SettingsPatch::new().feed_title(title)));
    }

    async fn run(self) {
        relay_info!("feed loop started for {}", self.inner.url);
        loop {
            let title = self.retrieve_title().await;
            self.transmit_title(&title).await;
            self.flags().fetching = false;

            if self.end_if_stopped() {
                break;
            }
            self.wait_for_next_cycle().await;
            if self.end_if_stopped() {
                break;
            }
            self.begin_cycle();
        }
        relay_info!("feed loop ended for {}", self.inner.url);
    }

    /// Clears `running` under the same lock that decides the loop ends. A
    /// pending refetch overrides the stop left by a failed cycle.
    fn end_if_stopped(&self) -> bool {
        let mut flags = self.flags();
        let end = flags.closed || (flags.stop && !flags.refetch_requested);
        if end {
            flags.running = false;
        }
        end
    }

    async fn retrieve_title(&self) -> String {
        let (title, failed) = match self.inner.source.fetch_document(&self.inner.url).await {
            Ok(document) => {
                let meta = &document.metadata;
                relay_debug!(
                    "fetched {} bytes from {} ({} redirects, {}, {})",
                    meta.byte_len,
                    meta.final_url,
                    meta.redirect_count,
                    meta.content_type.as_deref().unwrap_or("no content type"),
                    meta.encoding_label
                );
                if meta.final_url != meta.original_url {
                    relay_info!("feed {} redirected to {}", meta.original_url, meta.final_url);
                }
                match parse_first_title(&document.text) {
                    Ok(title) => (title, false),
                    Err(err) => {
                        relay_warn!("feed {} has no headline: {}", self.inner.url, err);
                        (err.to_string(), true)
                    }
                }
            }
            Err(err) => {
                relay_warn!(
                    "feed fetch failed for {}: {} ({})",
                    self.inner.url,
                    err.kind,
                    err.message
                );
                (format!("Error:{err}"), true)
            }
        };

        let mut flags = self.flags();
        flags.stop = failed;
        flags.title = title.clone();
        title
    }

    /// Start marker, body chunks, end marker; nothing else reaches the
    /// device in between.
    async fn transmit_title(&self, title: &str) {
        let gate = &self.inner.gate;
        let timing = &self.inner.timing;
        let formatted = format_title(title);

        let token = gate.lock().await;
        self.flags().lock = Some(token);

        gate.send_from(
            Some(token),
            Outbound::Update(
                SettingsPatch::new()
                    .msg_type(MsgType::TitleStart)
                    .feed_title(""),
            ),
        );
        sleep(timing.marker_delay).await;

        for chunk in title_chunks(&formatted, TITLE_CHUNK_LEN) {
            relay_trace!("title chunk {:?}", chunk);
            gate.send_from(
                Some(token),
                Outbound::Update(SettingsPatch::new().feed_title(chunk)),
            );
            sleep(timing.chunk_interval).await;
        }

        gate.send_from(
            Some(token),
            Outbound::Update(SettingsPatch::new().msg_type(MsgType::TitleEnd).feed_title("")),
        );
        sleep(timing.marker_delay).await;

        gate.unlock(token).await;
        self.flags().lock = None;
        lock(gate.settings()).set_value(FieldKey::FeedTitle, &FieldValue::from(""));
        relay_debug!("title sent for {}: {:?}", self.inner.url, formatted);
    }

    /// Pings until the fetch interval has passed, a refetch is requested or
    /// the session stops.
    async fn wait_for_next_cycle(&self) {
        let fetch_interval = self.inner.timing.fetch_interval;
        till(
            || {
                {
                    let flags = self.flags();
                    if flags.stop || flags.closed || flags.refetch_requested {
                        return true;
                    }
                    let elapsed = flags
                        .started_at
                        .map(|started| started.elapsed())
                        .unwrap_or(fetch_interval);
                    if elapsed > fetch_interval {
                        return true;
                    }
                }
                self.inner.gate.send(Outbound::Ping);
                false
            },
            self.inner.timing.ping_interval,
        )
        .await;
    }
}
