//! Scheduler: drives probe cycles and alert fan-out.
//!
//! The `Scheduler` owns read-only configuration and holds shared handles
//! to the mutable components (cooldown gate, subscriber registry, poll
//! state) so command handlers can change them between cycles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use nodewatch_core::{ChecksPolicy, HealthVerdict, NodeSpec};
use nodewatch_health::{CooldownGate, Prober, down_key, evaluate};
use nodewatch_notify::{AllowList, Notifier, PollState, SubscriberRegistry};

use crate::error::{SchedulerError, SchedulerResult};

const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Delivery counts for one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// What one cycle observed and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Verdicts in configuration order.
    pub verdicts: Vec<HealthVerdict>,
    /// Alerts that passed the cooldown gate.
    pub alerts: Vec<String>,
    pub delivery: Delivery,
}

impl CycleReport {
    pub fn unhealthy(&self) -> usize {
        self.verdicts.iter().filter(|v| !v.healthy).count()
    }
}

/// The health-check-and-alert loop.
pub struct Scheduler {
    nodes: Vec<NodeSpec>,
    policy: ChecksPolicy,
    cooldown: Duration,
    allow_list: AllowList,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    gate: Arc<CooldownGate>,
    registry: Arc<SubscriberRegistry>,
    poll: Arc<PollState>,
}

impl Scheduler {
    /// Create a scheduler with a fresh cooldown gate, an empty subscriber
    /// registry, the default poll interval and a 300 s cooldown.
    pub fn new(
        nodes: Vec<NodeSpec>,
        policy: ChecksPolicy,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            nodes,
            policy,
            cooldown: DEFAULT_COOLDOWN,
            allow_list: AllowList::unrestricted(),
            prober,
            notifier,
            gate: Arc::new(CooldownGate::new()),
            registry: Arc::new(SubscriberRegistry::new()),
            poll: Arc::new(PollState::default()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn with_cooldown_gate(mut self, gate: Arc<CooldownGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_registry(mut self, registry: Arc<SubscriberRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_poll_state(mut self, poll: Arc<PollState>) -> Self {
        self.poll = poll;
        self
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn cooldown_gate(&self) -> &Arc<CooldownGate> {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn poll_state(&self) -> &Arc<PollState> {
        &self.poll
    }

    /// Run the loop until `shutdown` flips or its sender goes away.
    ///
    /// Cycle errors are logged and never end the loop. The interval is
    /// re-read before every sleep.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            nodes = self.nodes.len(),
            interval_secs = self.poll.interval_secs(),
            cooldown_secs = self.cooldown.as_secs(),
            "scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                result = self.run_cycle() => match result {
                    Ok(report) => debug!(
                        nodes = report.verdicts.len(),
                        unhealthy = report.unhealthy(),
                        alerts = report.alerts.len(),
                        delivered = report.delivery.delivered,
                        failed = report.delivery.failed,
                        "cycle complete"
                    ),
                    Err(e) => error!(error = %e, "cycle failed"),
                },
                _ = shutdown.changed() => {
                    info!("scheduler shutting down mid-cycle");
                    break;
                }
            }

            let interval = self.poll.interval();
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Probe every node once, gate alerts, and deliver them.
    pub async fn run_cycle(&self) -> SchedulerResult<CycleReport> {
        let verdicts = self.probe_all().await?;

        let mut alerts = Vec::new();
        for verdict in verdicts.iter().filter(|v| !v.healthy) {
            let key = down_key(&verdict.node.name);
            if self.gate.allow(&key, self.cooldown) {
                info!(node = %verdict.node.name, summary = %verdict.summary(), "node down, alert raised");
                alerts.push(verdict.alert_message());
            } else {
                debug!(node = %verdict.node.name, "node still down, alert in cooldown");
            }
        }

        let delivery = self.deliver(&alerts).await;

        Ok(CycleReport {
            verdicts,
            alerts,
            delivery,
        })
    }

    /// Probe all nodes concurrently and return verdicts in config order.
    async fn probe_all(&self) -> SchedulerResult<Vec<HealthVerdict>> {
        let mut tasks = JoinSet::new();
        let mut task_nodes = HashMap::with_capacity(self.nodes.len());

        for (index, node) in self.nodes.iter().enumerate() {
            let node = node.clone();
            let prober = self.prober.clone();
            let policy = self.policy;
            let handle = tasks.spawn(async move {
                let outcomes = prober.probe(&node, &policy).await;
                (index, evaluate(&node, outcomes))
            });
            task_nodes.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<HealthVerdict>> = vec![None; self.nodes.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, verdict)) => slots[index] = Some(verdict),
                Err(source) => {
                    let node = task_nodes
                        .get(&source.id())
                        .map(|index| self.nodes[*index].name.clone())
                        .unwrap_or_default();
                    // Dropping `tasks` aborts the probes still in flight.
                    return Err(SchedulerError::ProbeTask { node, source });
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Send every message to every eligible recipient.
    ///
    /// Each (recipient, message) pair is independent: a failure is logged
    /// and delivery moves on.
    pub async fn deliver(&self, messages: &[String]) -> Delivery {
        let mut delivery = Delivery::default();
        if messages.is_empty() {
            return delivery;
        }

        let recipients = self.registry.eligible_recipients(&self.allow_list);
        if recipients.is_empty() {
            debug!(alerts = messages.len(), "no eligible recipients for alerts");
            return delivery;
        }

        for recipient in recipients {
            for message in messages {
                match self.notifier.send(recipient, message).await {
                    Ok(()) => delivery.delivered += 1,
                    Err(e) => {
                        warn!(recipient, error = %e, "send failed");
                        delivery.failed += 1;
                    }
                }
            }
        }

        delivery
    }
}
