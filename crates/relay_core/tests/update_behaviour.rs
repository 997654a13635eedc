use std::sync::Once;

use relay_core::{update, Effect, Msg, MsgType, RelayState};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

fn ready() -> RelayState {
    let (state, _) = update(RelayState::new(), Msg::HostReady);
    state
}

fn device(state: RelayState, msg_type: MsgType) -> (RelayState, Vec<Effect>) {
    update(
        state,
        Msg::DeviceMessage {
            msg_type: msg_type.tag(),
        },
    )
}

fn with_feed(url: &str) -> RelayState {
    let (state, _) = update(ready(), Msg::FeedUrlConfigured(url.to_string()));
    state
}

#[test]
fn ready_loads_settings_and_pings_once() {
    init_logging();
    let (state, effects) = update(RelayState::new(), Msg::HostReady);
    assert!(state.is_ready());
    assert_eq!(effects, vec![Effect::LoadSettings, Effect::SendPing]);

    let (_, effects) = update(state, Msg::HostReady);
    assert!(effects.is_empty());
}

#[test]
fn configuration_requested_opens_page() {
    let (_, effects) = update(ready(), Msg::ConfigurationRequested);
    assert_eq!(effects, vec![Effect::OpenConfiguration]);
}

#[test]
fn configuration_closed_clears_foreign_keys_only_once() {
    init_logging();
    let (state, effects) = update(
        ready(),
        Msg::ConfigurationClosed {
            response: Some("%7B%7D".to_string()),
        },
    );
    assert_eq!(
        effects,
        vec![
            Effect::ClearForeignKeys,
            Effect::ApplyConfiguration {
                payload: "%7B%7D".to_string()
            },
            Effect::SaveSettings,
            Effect::SendPing,
        ]
    );
    assert!(state.is_cleared());

    let (_, effects) = update(
        state,
        Msg::ConfigurationClosed {
            response: Some("%7B%7D".to_string()),
        },
    );
    assert_eq!(
        effects.first(),
        Some(&Effect::ApplyConfiguration {
            payload: "%7B%7D".to_string()
        })
    );
}

#[test]
fn cancelled_configuration_does_nothing() {
    for response in [None, Some(String::new()), Some("  ".to_string())] {
        let (state, effects) = update(ready(), Msg::ConfigurationClosed { response });
        assert!(effects.is_empty());
        assert!(!state.is_cleared());
    }
}

#[test]
fn feed_url_change_restarts_session() {
    init_logging();
    let (state, effects) = update(ready(), Msg::FeedUrlConfigured("http://a.example/rss".into()));
    assert_eq!(
        effects,
        vec![Effect::StartFeed {
            url: "http://a.example/rss".to_string()
        }]
    );

    let (state, effects) = update(state, Msg::FeedUrlConfigured("http://a.example/rss".into()));
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::FeedUrlConfigured("http://b.example/rss".into()));
    assert_eq!(
        effects,
        vec![
            Effect::CloseFeed,
            Effect::StartFeed {
                url: "http://b.example/rss".to_string()
            }
        ]
    );

    let (state, effects) = update(state, Msg::FeedUrlConfigured(String::new()));
    assert_eq!(effects, vec![Effect::CloseFeed]);
    assert!(!state.has_feed());
}

#[test]
fn feed_url_before_ready_is_deferred() {
    let (state, effects) = update(
        RelayState::new(),
        Msg::FeedUrlConfigured("http://a.example/rss".into()),
    );
    assert!(effects.is_empty());
    assert_eq!(state.feed_url(), "");
}

#[test]
fn app_close_stops_feed_without_ping() {
    init_logging();
    let (state, effects) = device(with_feed("http://a.example/rss"), MsgType::AppClose);
    assert_eq!(effects, vec![Effect::CloseFeed]);
    assert!(state.is_closed());

    let (_, effects) = device(state, MsgType::FeedReady);
    assert_eq!(effects, vec![Effect::SendPing]);
}

#[test]
fn feed_requests_are_routed_when_configured() {
    let (_, effects) = device(with_feed("http://a.example/rss"), MsgType::FetchFeed);
    assert_eq!(effects, vec![Effect::RequestRefetch, Effect::SendPing]);

    let (_, effects) = device(with_feed("http://a.example/rss"), MsgType::FeedReady);
    assert_eq!(effects, vec![Effect::FetchFeed, Effect::SendPing]);

    let (_, effects) = device(ready(), MsgType::FetchFeed);
    assert_eq!(effects, vec![Effect::SendPing]);
}

#[test]
fn other_device_messages_are_answered_with_ping() {
    for msg_type in [MsgType::Ping, MsgType::FeedFetched] {
        let (_, effects) = device(ready(), msg_type);
        assert_eq!(effects, vec![Effect::SendPing]);
    }
    let (_, effects) = update(ready(), Msg::DeviceMessage { msg_type: 99 });
    assert_eq!(effects, vec![Effect::SendPing]);
}
