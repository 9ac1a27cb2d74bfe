//! Operator commands.
//!
//! Transports translate whatever their users type into [`InboundMessage`]s.
//! The dispatcher turns each one into a [`Command`], applies it to the
//! shared registry and poll state, and replies to the originator.

use std::num::IntErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use nodewatch_core::RecipientId;

use crate::error::CommandError;
use crate::notifier::Notifier;
use crate::subscribers::SubscriberRegistry;

pub const MIN_INTERVAL_SECS: u64 = 15;
pub const MAX_INTERVAL_SECS: u64 = 3600;

pub(crate) const INTERVAL_USAGE: &str = "Usage: /interval <seconds>";
pub(crate) const COMMAND_HELP: &str = "Commands: /start, /stop, /interval <seconds>";

/// Poll interval shared between the command path and the scheduler.
///
/// Always holds a value in `MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS`.
#[derive(Debug)]
pub struct PollState {
    interval_secs: AtomicU64,
}

impl PollState {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval_secs: AtomicU64::new(interval_secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs())
    }

    /// Store `secs` clamped into range and return the stored value.
    pub fn set(&self, secs: i64) -> u64 {
        let clamped = secs.clamp(MIN_INTERVAL_SECS as i64, MAX_INTERVAL_SECS as i64) as u64;
        self.interval_secs.store(clamped, Ordering::Relaxed);
        clamped
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Command events accepted from any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Subscribe(RecipientId),
    Unsubscribe(RecipientId),
    SetInterval(i64),
}

impl Command {
    /// Parse chat-style text sent by `origin`.
    ///
    /// `/start`, `/stop` and `/interval <seconds>` are understood. A bot
    /// mention suffix (`/start@some_bot`) is ignored.
    pub fn parse(origin: RecipientId, text: &str) -> Result<Self, CommandError> {
        let mut words = text.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;
        let name = head.split('@').next().unwrap_or(head);

        match name {
            "/start" => Ok(Command::Subscribe(origin)),
            "/stop" => Ok(Command::Unsubscribe(origin)),
            "/interval" => words
                .next()
                .and_then(parse_seconds)
                .map(Command::SetInterval)
                .ok_or(CommandError::IntervalUsage),
            _ => Err(CommandError::Unknown(name.to_string())),
        }
    }
}

/// Integer argument of `/interval`. Values beyond `i64` saturate to the
/// nearest interval bound instead of being rejected.
fn parse_seconds(arg: &str) -> Option<i64> {
    match arg.parse::<i64>() {
        Ok(secs) => Some(secs),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(MAX_INTERVAL_SECS as i64),
            IntErrorKind::NegOverflow => Some(MIN_INTERVAL_SECS as i64),
            _ => None,
        },
    }
}

/// Raw text received from a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub origin: RecipientId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(origin: RecipientId, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
        }
    }
}

/// Applies operator commands to shared monitor state.
pub struct CommandDispatcher {
    registry: Arc<SubscriberRegistry>,
    poll: Arc<PollState>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<SubscriberRegistry>, poll: Arc<PollState>) -> Self {
        Self { registry, poll }
    }

    /// Apply a parsed command and return the reply text.
    pub fn apply(&self, command: Command) -> String {
        match command {
            Command::Subscribe(id) => {
                self.registry.subscribe(id);
                info!(recipient = id, "subscribed");
                "✅ You are subscribed for node alerts.".to_string()
            }
            Command::Unsubscribe(id) => {
                self.registry.unsubscribe(id);
                info!(recipient = id, "unsubscribed");
                "❌ You are unsubscribed from node alerts.".to_string()
            }
            Command::SetInterval(secs) => {
                let stored = self.poll.set(secs);
                info!(requested = secs, interval_secs = stored, "poll interval changed");
                format!("⏱ Interval set to {stored} sec")
            }
        }
    }

    /// Parse and apply `message`. Parse errors leave all state untouched
    /// and come back as the reply.
    pub fn dispatch(&self, message: &InboundMessage) -> String {
        match Command::parse(message.origin, &message.text) {
            Ok(command) => self.apply(command),
            Err(e) => {
                debug!(origin = message.origin, text = %message.text, error = %e, "rejected command");
                e.to_string()
            }
        }
    }

    /// Serve `inbox` until it closes or shutdown is signalled, replying
    /// to each originator through `notifier`.
    pub async fn run(
        &self,
        mut inbox: mpsc::Receiver<InboundMessage>,
        notifier: Arc<dyn Notifier>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("command dispatcher started");

        loop {
            tokio::select! {
                message = inbox.recv() => {
                    let Some(message) = message else {
                        info!("command source closed");
                        break;
                    };
                    let reply = self.dispatch(&message);
                    if let Err(e) = notifier.send(message.origin, &reply).await {
                        warn!(recipient = message.origin, error = %e, "reply delivery failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("command dispatcher shutting down");
                    break;
                }
            }
        }
    }
}
