use relay_core::Snapshot;

/// The wearable host's native API, as far as the relay uses it.
pub trait HostAdapter: Send + Sync {
    /// False until the host has finished loading; sends before that are lost.
    fn is_ready(&self) -> bool;
    fn send_app_message(&self, message: &Snapshot);
    fn open_url(&self, url: &str);
}
