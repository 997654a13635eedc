use crate::{Effect, Msg, MsgType, RelayState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: RelayState, msg: Msg) -> (RelayState, Vec<Effect>) {
    let effects = match msg {
        Msg::HostReady => {
            if state.is_ready() {
                return (state, Vec::new());
            }
            state.mark_ready();
            vec![Effect::LoadSettings, Effect::SendPing]
        }
        Msg::ConfigurationRequested => vec![Effect::OpenConfiguration],
        Msg::ConfigurationClosed { response } => {
            let payload = match response {
                Some(payload) if !payload.trim().is_empty() => payload,
                _ => return (state, Vec::new()),
            };
            let mut effects = Vec::with_capacity(4);
            if !state.is_cleared() {
                state.mark_cleared();
                effects.push(Effect::ClearForeignKeys);
            }
            effects.push(Effect::ApplyConfiguration { payload });
            effects.push(Effect::SaveSettings);
            effects.push(Effect::SendPing);
            effects
        }
        Msg::FeedUrlConfigured(url) => {
            // Settings are reloaded on ready, which reports the URL again.
            if !state.is_ready() || url == state.feed_url() {
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(2);
            if state.has_feed() {
                effects.push(Effect::CloseFeed);
            }
            state.set_feed_url(url.clone());
            if state.has_feed() && !state.is_closed() {
                effects.push(Effect::StartFeed { url });
            }
            effects
        }
        Msg::DeviceMessage { msg_type } => device_message(&mut state, msg_type),
    };

    (state, effects)
}

fn device_message(state: &mut RelayState, msg_type: i64) -> Vec<Effect> {
    let feed_active = state.has_feed() && !state.is_closed();
    match MsgType::from_tag(msg_type) {
        Some(MsgType::AppClose) => {
            state.mark_closed();
            vec![Effect::CloseFeed]
        }
        Some(MsgType::FetchFeed) if feed_active => {
            vec![Effect::RequestRefetch, Effect::SendPing]
        }
        Some(MsgType::FeedReady) if feed_active => vec![Effect::FetchFeed, Effect::SendPing],
        _ => vec![Effect::SendPing],
    }
}
