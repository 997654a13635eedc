use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use relay_core::{Msg, MsgType, Snapshot};
use relay_engine::HostAdapter;
use relay_logging::{relay_error, relay_trace};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Event delivered by the host on stdin, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    Ready,
    ShowConfiguration,
    #[serde(rename = "webviewclosed")]
    WebviewClosed {
        #[serde(default)]
        response: Option<String>,
    },
    #[serde(rename = "appmessage")]
    AppMessage {
        #[serde(default)]
        payload: Map<String, Value>,
    },
}

impl HostEvent {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn into_msg(self) -> Msg {
        match self {
            HostEvent::Ready => Msg::HostReady,
            HostEvent::ShowConfiguration => Msg::ConfigurationRequested,
            HostEvent::WebviewClosed { response } => Msg::ConfigurationClosed { response },
            HostEvent::AppMessage { payload } => Msg::DeviceMessage {
                msg_type: message_type(&payload),
            },
        }
    }
}

/// Tag of an inbound device message; absent or unreadable means ping.
fn message_type(payload: &Map<String, Value>) -> i64 {
    let ping = MsgType::Ping.tag();
    match payload.get("msgType") {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value.trunc() as i64))
            .unwrap_or(ping),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(ping),
        _ => ping,
    }
}

/// Host transport speaking newline-delimited JSON over a writer (stdout in
/// the binary).
pub struct StdioHost {
    ready: AtomicBool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl StdioHost {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            ready: AtomicBool::new(false),
            out: Mutex::new(out),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    fn write_line(&self, value: &Value) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let result = writeln!(out, "{value}").and_then(|()| out.flush());
        if let Err(err) = result {
            relay_error!("Failed to write to host: {}", err);
        }
    }
}

impl HostAdapter for StdioHost {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn send_app_message(&self, message: &Snapshot) {
        relay_trace!("sendAppMessage {:?}", message);
        self.write_line(&json!({ "sendAppMessage": message.to_json() }));
    }

    fn open_url(&self, url: &str) {
        self.write_line(&json!({ "openURL": url }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_core::SettingsStore;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parses_every_host_event() {
        assert_eq!(HostEvent::parse(r#"{"event":"ready"}"#).unwrap(), HostEvent::Ready);
        assert_eq!(
            HostEvent::parse(r#"{"event":"showConfiguration"}"#).unwrap(),
            HostEvent::ShowConfiguration
        );
        assert_eq!(
            HostEvent::parse(r#"{"event":"webviewclosed","response":"%7B%7D"}"#)
                .unwrap()
                .into_msg(),
            Msg::ConfigurationClosed {
                response: Some("%7B%7D".to_string())
            }
        );
        assert_eq!(
            HostEvent::parse(r#"{"event":"webviewclosed"}"#)
                .unwrap()
                .into_msg(),
            Msg::ConfigurationClosed { response: None }
        );
        assert!(HostEvent::parse(r#"{"event":"reboot"}"#).is_err());
        assert!(HostEvent::parse("not json").is_err());
    }

    #[test]
    fn app_message_tag_is_read_leniently() {
        let tag = |line: &str| match HostEvent::parse(line).unwrap().into_msg() {
            Msg::DeviceMessage { msg_type } => msg_type,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(tag(r#"{"event":"appmessage","payload":{"msgType":2}}"#), 2);
        assert_eq!(tag(r#"{"event":"appmessage","payload":{"msgType":3.9}}"#), 3);
        assert_eq!(tag(r#"{"event":"appmessage","payload":{"msgType":"1"}}"#), 1);
        assert_eq!(tag(r#"{"event":"appmessage","payload":{"other":true}}"#), 0);
        assert_eq!(tag(r#"{"event":"appmessage"}"#), 0);
    }

    #[test]
    fn writes_one_json_line_per_call() {
        let buffer = SharedBuffer::default();
        let host = StdioHost::with_writer(Box::new(buffer.clone()));
        assert!(!host.is_ready());
        host.mark_ready();
        assert!(host.is_ready());

        let snapshot = SettingsStore::new(0).serialize_for_transport();
        host.send_app_message(&snapshot);
        host.open_url("http://settings.example/?a=1");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["sendAppMessage"], snapshot.to_json());
        assert_eq!(lines[1], json!({ "openURL": "http://settings.example/?a=1" }));
    }
}
