//! Line-oriented command source.
//!
//! Each stdin line is `<recipient-id> <command text>`, for example
//! `42 /start` or `42 /interval 120`. Lines are forwarded to the command
//! dispatcher as [`InboundMessage`]s.

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use nodewatch_core::RecipientId;
use nodewatch_notify::InboundMessage;

/// Read stdin on a dedicated thread until EOF or the dispatcher goes away.
///
/// Blocking reads stay off the runtime so shutdown never waits on input.
pub fn spawn_command_source(tx: mpsc::Sender<InboundMessage>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(message) = parse_line(&line) else {
                    warn!(%line, "expected `<recipient-id> <command>`");
                    continue;
                };
                if tx.blocking_send(message).is_err() {
                    break;
                }
            }
            debug!("stdin command source finished");
        })?;
    Ok(())
}

/// Split a line into its originating recipient and command text.
pub fn parse_line(line: &str) -> Option<InboundMessage> {
    let (id, text) = line.trim().split_once(char::is_whitespace)?;
    let origin = id.parse::<RecipientId>().ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(InboundMessage::new(origin, text))
}
