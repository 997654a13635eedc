#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Host finished loading; the transport accepts messages from now on.
    HostReady,
    /// User opened the configuration page for this app.
    ConfigurationRequested,
    /// Configuration page closed, with its raw response if any.
    ConfigurationClosed { response: Option<String> },
    /// Message from the device carrying its integer type tag.
    DeviceMessage { msg_type: i64 },
    /// The settings store now holds this feed URL (possibly empty).
    FeedUrlConfigured(String),
}
