//! nodewatch-scheduler: the periodic health-check-and-alert loop.
//!
//! Each cycle probes every configured node, turns the outcomes into
//! verdicts, lets unhealthy nodes through the cooldown gate, and fans the
//! resulting alerts out to every eligible subscriber.
//!
//! # Cycle
//!
//! ```text
//! Scheduler::run
//!   loop
//!   ├── run_cycle()
//!   │   ├── Prober::probe (all nodes concurrently)
//!   │   ├── evaluate → HealthVerdict (configuration order)
//!   │   ├── CooldownGate::allow("down:<node>") for unhealthy nodes
//!   │   └── deliver(alerts) → Notifier per (recipient, message)
//!   └── sleep(PollState::interval())
//! ```
//!
//! Shutdown is observed while a cycle is probing and while sleeping. A
//! failed cycle is logged and the loop carries on.

pub mod error;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{CycleReport, Delivery, Scheduler};
