use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use relay_core::{
    Admission, FieldKey, FieldValue, GateState, LockToken, MsgType, Outbound, QueuedMessage,
    SettingsStore,
};
use relay_logging::relay_trace;

use crate::sync::lock;
use crate::HostAdapter;

pub type SharedSettings = Arc<Mutex<SettingsStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateTiming {
    /// Minimum wait before a queued message is retried.
    pub drain_delay: Duration,
    /// Random extra wait added on top of `drain_delay`.
    pub drain_jitter: Duration,
    /// Interval between lock acquire/release attempts.
    pub lock_poll: Duration,
}

impl Default for GateTiming {
    fn default() -> Self {
        Self {
            drain_delay: Duration::from_millis(1000),
            drain_jitter: Duration::from_millis(500),
            lock_poll: Duration::from_millis(13),
        }
    }
}

/// Serializes outbound messages to the host transport.
///
/// Every dispatch sends the full transport snapshot of the settings store,
/// after applying the message's patch. A caller holding the advisory lock
/// passes its token to get through; everyone else is queued while the lock
/// is held, and the backlog drains one message per call after a jittered
/// delay.
#[derive(Clone)]
pub struct MessageGate {
    state: Arc<Mutex<GateState>>,
    settings: SharedSettings,
    host: Arc<dyn HostAdapter>,
    timing: GateTiming,
}

impl MessageGate {
    pub fn new(settings: SharedSettings, host: Arc<dyn HostAdapter>, timing: GateTiming) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::new())),
            settings,
            host,
            timing,
        }
    }

    pub fn send(&self, message: Outbound) {
        self.send_from(None, message);
    }

    pub fn send_from(&self, sender: Option<LockToken>, message: Outbound) {
        if !self.host.is_ready() {
            relay_trace!("transport not ready, dropping {:?}", message);
            return;
        }

        let (admission, backlog) = {
            let mut gate = lock(&self.state);
            let admission = gate.admit(message, sender);
            if matches!(admission, Admission::Dropped) {
                relay_trace!("ping dropped behind {} queued", gate.queue_len());
                return;
            }
            (admission, gate.next_queued())
        };

        if let Admission::Dispatch(message) = admission {
            self.dispatch(&message);
        }
        if let Some(queued) = backlog {
            self.schedule_retry(queued);
        }
    }

    pub fn try_acquire(&self) -> Option<LockToken> {
        lock(&self.state).acquire()
    }

    pub fn try_release(&self, token: LockToken) -> bool {
        lock(&self.state).release(token)
    }

    /// Waits cooperatively until the lock is ours.
    pub async fn lock(&self) -> LockToken {
        loop {
            if let Some(token) = self.try_acquire() {
                return token;
            }
            tokio::time::sleep(self.timing.lock_poll).await;
        }
    }

    /// Waits cooperatively until the release is confirmed.
    pub async fn unlock(&self, token: LockToken) {
        crate::till(|| self.try_release(token), self.timing.lock_poll).await;
    }

    pub fn is_locked(&self) -> bool {
        lock(&self.state).is_locked()
    }

    pub fn queue_len(&self) -> usize {
        lock(&self.state).queue_len()
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    fn dispatch(&self, message: &Outbound) {
        let snapshot = {
            let mut settings = lock(&self.settings);
            if let Outbound::Update(patch) = message {
                settings.apply(patch);
            }
            let snapshot = settings.serialize_for_transport();
            // The message type is a one-shot tag.
            settings.set_value(FieldKey::MsgType, &FieldValue::Int(MsgType::Ping.tag()));
            snapshot
        };
        self.host.send_app_message(&snapshot);
    }

    fn schedule_retry(&self, queued: QueuedMessage) {
        let gate = self.clone();
        let delay = self.retry_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            gate.send_from(queued.sender, queued.message);
        });
    }

    fn retry_delay(&self) -> Duration {
        let jitter_ms = self.timing.drain_jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..jitter_ms)
        };
        self.timing.drain_delay + Duration::from_millis(extra)
    }
}
