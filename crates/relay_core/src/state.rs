/// Lifecycle flags of the relay as seen by the pure update function.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelayState {
    ready: bool,
    closed: bool,
    cleared: bool,
    feed_url: String,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The host has signalled that the transport is usable.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The device app has closed; no further fetches start.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Foreign storage keys have been purged once this run.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn has_feed(&self) -> bool {
        !self.feed_url.is_empty()
    }

    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub(crate) fn mark_cleared(&mut self) {
        self.cleared = true;
    }

    pub(crate) fn set_feed_url(&mut self, url: String) {
        self.feed_url = url;
    }
}
