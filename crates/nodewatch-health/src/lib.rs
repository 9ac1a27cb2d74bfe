//! nodewatch-health: probing, health verdicts, and alert deduplication.
//!
//! # Architecture
//!
//! ```text
//! Prober (per node, per cycle)
//!   ├── probe_http()  GET dashboard (http or https, redirects followed), ok iff final status == 200
//!   ├── probe_tcp()   connect to public host:port
//!   └── probe_udp()   dispatch one datagram (optional)
//!         │
//!         ▼
//! evaluate() → HealthVerdict (healthy = http && tcp)
//!         │ unhealthy
//!         ▼
//! CooldownGate::allow("down:<node>") → at most one alert per window
//! ```
//!
//! Probes are total: every failure mode collapses to `false`.

pub mod cooldown;
pub mod evaluator;
pub mod prober;

pub use cooldown::{CooldownGate, down_key};
pub use evaluator::evaluate;
pub use prober::{NetworkProber, ProbeFuture, Prober, probe_http, probe_tcp, probe_udp};
