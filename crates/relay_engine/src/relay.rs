use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use relay_core::{update, Effect, KeyValueStore, Msg, Outbound, RelayState, SettingsStore};
use relay_logging::{relay_debug, relay_error, relay_info, relay_warn};

use crate::sync::lock;
use crate::{FeedSession, FeedSource, FeedTiming, GateTiming, HostAdapter, MessageGate, SharedSettings};

const DEFAULT_SETTINGS_PAGE: &str =
    "http://polygonplanet.github.io/PebbleTermWatch/settings/1.0.4.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Configuration page opened when the user asks for settings.
    pub settings_page_url: String,
    pub gate: GateTiming,
    pub feed: FeedTiming,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            settings_page_url: DEFAULT_SETTINGS_PAGE.to_string(),
            gate: GateTiming::default(),
            feed: FeedTiming::default(),
        }
    }
}

/// Local UTC offset in seconds, positive west of Greenwich.
pub fn local_timezone_offset() -> i64 {
    -i64::from(chrono::Local::now().offset().local_minus_utc())
}

/// Owns the relay's state and runs the effects `update` asks for.
pub struct Relay {
    state: RelayState,
    settings: SharedSettings,
    gate: MessageGate,
    host: Arc<dyn HostAdapter>,
    storage: Box<dyn KeyValueStore + Send>,
    source: Arc<dyn FeedSource>,
    config: RelayConfig,
    feed: Option<FeedSession>,
}

impl Relay {
    pub fn new(
        config: RelayConfig,
        host: Arc<dyn HostAdapter>,
        storage: Box<dyn KeyValueStore + Send>,
        source: Arc<dyn FeedSource>,
    ) -> Self {
        let settings = SettingsStore::new(local_timezone_offset());
        Self::with_settings(config, host, storage, source, settings)
    }

    pub fn with_settings(
        config: RelayConfig,
        host: Arc<dyn HostAdapter>,
        storage: Box<dyn KeyValueStore + Send>,
        source: Arc<dyn FeedSource>,
        settings: SettingsStore,
    ) -> Self {
        let settings = Arc::new(Mutex::new(settings));
        let gate = MessageGate::new(settings.clone(), host.clone(), config.gate.clone());
        Self {
            state: RelayState::new(),
            settings,
            gate,
            host,
            storage,
            source,
            config,
            feed: None,
        }
    }

    /// Applies a message and every follow-up message its effects produce.
    pub fn handle(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            relay_debug!("handling {:?}", msg);
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect) {
                    inbox.push_back(follow_up);
                }
            }
        }
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn gate(&self) -> &MessageGate {
        &self.gate
    }

    pub fn feed(&self) -> Option<&FeedSession> {
        self.feed.as_ref()
    }

    fn run_effect(&mut self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::LoadSettings => {
                let mut settings = lock(&self.settings);
                let applied = settings.load(self.storage.as_ref());
                relay_info!("Restored {} persisted settings", applied);
                Some(Msg::FeedUrlConfigured(settings.feed_url()))
            }
            Effect::SaveSettings => {
                if let Err(err) = lock(&self.settings).save(self.storage.as_mut()) {
                    relay_error!("Failed to save settings: {}", err);
                }
                None
            }
            Effect::ClearForeignKeys => {
                match lock(&self.settings).clear_other_keys(self.storage.as_mut()) {
                    Ok(0) => {}
                    Ok(removed) => relay_info!("Removed {} foreign storage keys", removed),
                    Err(err) => relay_warn!("Failed to clear foreign storage keys: {}", err),
                }
                None
            }
            Effect::ApplyConfiguration { payload } => {
                let mut settings = lock(&self.settings);
                match settings.decode_configuration(&payload) {
                    Ok(applied) => relay_info!("Applied {} settings from configuration", applied),
                    Err(err) => relay_warn!("Ignoring configuration response: {}", err),
                }
                Some(Msg::FeedUrlConfigured(settings.feed_url()))
            }
            Effect::OpenConfiguration => {
                let url = lock(&self.settings).encode_query_string(&self.config.settings_page_url);
                self.host.open_url(&url);
                None
            }
            Effect::SendPing => {
                self.gate.send(Outbound::Ping);
                None
            }
            Effect::StartFeed { url } => {
                relay_info!("Starting feed session for {}", url);
                let session = FeedSession::new(
                    url,
                    self.gate.clone(),
                    self.source.clone(),
                    self.config.feed.clone(),
                );
                if let Err(err) = session.fetch() {
                    relay_warn!("Feed session did not start: {}", err);
                }
                self.feed = Some(session);
                None
            }
            Effect::CloseFeed => {
                if let Some(feed) = self.feed.take() {
                    relay_info!("Closing feed session for {}", feed.url());
                    feed.close();
                }
                None
            }
            Effect::FetchFeed => {
                if let Some(feed) = &self.feed {
                    if let Err(err) = feed.fetch() {
                        relay_debug!("Fetch request ignored: {}", err);
                    }
                }
                None
            }
            Effect::RequestRefetch => {
                if let Some(feed) = &self.feed {
                    feed.request_refetch();
                }
                None
            }
        }
    }
}
