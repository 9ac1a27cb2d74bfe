//! nodewatch-notify: who gets alerts, how they get them, and the
//! operator commands that change either.
//!
//! # Architecture
//!
//! ```text
//! Command source (any transport)
//!   └── InboundMessage { origin, text }
//!         └── CommandDispatcher
//!               ├── Subscribe / Unsubscribe → SubscriberRegistry
//!               ├── SetInterval             → PollState (clamped 15..=3600)
//!               └── reply                   → Notifier
//!
//! Scheduler fan-out
//!   └── SubscriberRegistry::eligible_recipients(AllowList)
//!         └── Notifier::send(recipient, text)
//! ```

pub mod commands;
pub mod error;
pub mod notifier;
pub mod subscribers;

pub use commands::{
    Command, CommandDispatcher, InboundMessage, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS, PollState,
};
pub use error::{CommandError, NotifyError, NotifyResult};
pub use notifier::{LogNotifier, Notifier, NotifyFuture, WebhookNotifier};
pub use subscribers::{AllowList, SubscriberRegistry};
