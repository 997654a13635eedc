#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadSettings,
    SaveSettings,
    /// Purge storage keys left behind by other apps or older versions.
    ClearForeignKeys,
    ApplyConfiguration { payload: String },
    OpenConfiguration,
    SendPing,
    StartFeed { url: String },
    /// Stop and discard the current feed session.
    CloseFeed,
    FetchFeed,
    RequestRefetch,
}
