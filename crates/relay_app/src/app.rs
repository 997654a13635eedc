use std::io;

use relay_engine::Relay;
use relay_logging::{relay_info, relay_warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::host::{HostEvent, StdioHost};

/// Feeds host events from `input` into the relay until the input closes.
/// Returns the number of events handled.
pub async fn run<R>(relay: &mut Relay, host: &StdioHost, input: R) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = match HostEvent::parse(line) {
            Ok(event) => event,
            Err(err) => {
                relay_warn!("Ignoring malformed host event: {}", err);
                continue;
            }
        };
        if event == HostEvent::Ready {
            host.mark_ready();
        }
        relay.handle(event.into_msg());
        handled += 1;
    }
    relay_info!("Host input closed after {} events", handled);
    Ok(handled)
}
