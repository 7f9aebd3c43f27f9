//! ConnectivityMonitor - single source of truth for device connectivity.
//!
//! Provides:
//! - An immediate probe on `initialize`, then periodic re-probing
//! - Replay-on-subscribe listener fan-out with explicit unsubscribe
//! - At-most-once notification per actual status change
//!
//! Listeners run synchronously on the thread that is draining the delivery
//! queue, with no monitor lock held. A listener may call
//! [`ConnectivityMonitor::set_status`], [`ConnectivityMonitor::subscribe`] or
//! [`Subscription::unsubscribe`]; nested transitions are queued and delivered
//! after the current broadcast, in transition order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ConnectivityDefaults;
use crate::error::{CompanionError, Result};
use crate::network::probe::ConnectivityProbe;
use crate::network::status::{AtomicConnectivityStatus, ConnectivityStatus};
use crate::sync::lock;

/// Configuration for connectivity monitoring.
#[derive(Debug, Clone)]
pub struct ConnectivityConfig {
    /// How often to re-probe once monitoring has started.
    pub probe_interval: Duration,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval: ConnectivityDefaults::PROBE_INTERVAL,
        }
    }
}

impl ConnectivityConfig {
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }
}

type StatusCallback = Box<dyn Fn(ConnectivityStatus) + Send + Sync>;

struct ListenerSlot {
    active: AtomicBool,
    /// Transition sequence at registration; older transitions are skipped.
    since: u64,
    callback: StatusCallback,
}

impl ListenerSlot {
    fn deliver(&self, status: ConnectivityStatus) {
        if self.active.load(Ordering::SeqCst) {
            (self.callback)(status);
        }
    }
}

enum Pending {
    /// A status transition, numbered in transition order.
    Change { seq: u64, status: ConnectivityStatus },
    /// Current status for a newly registered listener.
    Replay {
        slot: Arc<ListenerSlot>,
        status: ConnectivityStatus,
    },
}

#[derive(Default)]
struct DeliveryQueue {
    seq: u64,
    pending: VecDeque<Pending>,
    /// Whether some caller is already draining `pending`.
    draining: bool,
}

/// Clears `draining` if a listener panics mid-drain, so later transitions
/// are still delivered.
struct DrainGuard<'a>(&'a Mutex<DeliveryQueue>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.0).draining = false;
        }
    }
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    /// Ordered by registration so fan-out order is stable.
    slots: BTreeMap<u64, Arc<ListenerSlot>>,
}

/// Handle returned by [`ConnectivityMonitor::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[must_use = "keep the Subscription to be able to unsubscribe later"]
pub struct Subscription {
    id: u64,
    slot: Arc<ListenerSlot>,
    registry: Weak<Mutex<ListenerRegistry>>,
}

impl Subscription {
    /// Stop receiving notifications.
    ///
    /// Takes effect immediately, including for a broadcast that is already
    /// being delivered to other listeners.
    pub fn unsubscribe(&self) {
        self.slot.active.store(false, Ordering::SeqCst);
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).slots.remove(&self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Connectivity summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub status: ConnectivityStatus,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub last_change_at: Option<DateTime<Utc>>,
    pub monitoring_active: bool,
    pub subscriber_count: usize,
}

/// Tracks device connectivity and notifies subscribers of changes.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    config: ConnectivityConfig,
    status: AtomicConnectivityStatus,
    listeners: Arc<Mutex<ListenerRegistry>>,
    /// Orders transitions and replays; drained outside the lock.
    delivery: Mutex<DeliveryQueue>,
    monitoring_active: AtomicBool,
    stopped: AtomicBool,
    last_probe_at: Mutex<Option<DateTime<Utc>>>,
    last_change_at: Mutex<Option<DateTime<Utc>>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the default probe interval.
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self::with_config(probe, ConnectivityConfig::default())
    }

    pub fn with_config(probe: Arc<dyn ConnectivityProbe>, config: ConnectivityConfig) -> Self {
        Self {
            probe,
            config,
            status: AtomicConnectivityStatus::new(ConnectivityStatus::Online),
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
            delivery: Mutex::new(DeliveryQueue::default()),
            monitoring_active: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            last_probe_at: Mutex::new(None),
            last_change_at: Mutex::new(None),
            poll_task: Mutex::new(None),
        }
    }

    /// Start monitoring.
    ///
    /// The first call probes immediately and then spawns the periodic
    /// re-probe task. Subsequent calls return without doing anything.
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CompanionError::MonitorStopped);
        }
        if self.monitoring_active.swap(true, Ordering::SeqCst) {
            debug!("Connectivity monitoring already active");
            return Ok(());
        }

        self.check_now().await;

        let weak = Arc::downgrade(self);
        let interval = self.config.probe_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the initial probe already ran.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(monitor) = weak.upgrade() else {
                    break;
                };
                if !monitor.monitoring_active.load(Ordering::SeqCst) {
                    break;
                }
                monitor.check_now().await;
            }

            debug!("Connectivity polling stopped");
        });
        *lock(&self.poll_task) = Some(handle);

        info!(
            "Connectivity monitor initialized ({}, every {:?})",
            self.status(),
            interval
        );
        Ok(())
    }

    /// Run one probe now and return the resulting status.
    ///
    /// A failed probe keeps the last known status.
    pub async fn check_now(&self) -> ConnectivityStatus {
        match self.probe.is_connected().await {
            Ok(connected) => {
                *lock(&self.last_probe_at) = Some(Utc::now());
                self.set_status(ConnectivityStatus::from_connected(connected));
            }
            Err(e) => {
                warn!(
                    "Connectivity probe failed, keeping status {}: {}",
                    self.status(),
                    e
                );
            }
        }
        self.status()
    }

    /// Replace the current status, notifying listeners if it changed.
    ///
    /// Returns whether a transition happened. If a broadcast is already in
    /// progress (for example when called from inside a listener), the
    /// notification is queued behind it.
    pub fn set_status(&self, status: ConnectivityStatus) -> bool {
        {
            let mut queue = lock(&self.delivery);
            let previous = self.status.swap(status);
            if previous == status {
                return false;
            }

            *lock(&self.last_change_at) = Some(Utc::now());
            info!("Connectivity changed: {} -> {}", previous, status);

            queue.seq += 1;
            let seq = queue.seq;
            queue.pending.push_back(Pending::Change { seq, status });
            if queue.draining {
                return true;
            }
            queue.draining = true;
        }

        self.drain_deliveries();
        true
    }

    /// Register a listener.
    ///
    /// The listener is called with the current status and then on every
    /// change until unsubscribed. Outside a listener the replay happens
    /// before this returns.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ConnectivityStatus) + Send + Sync + 'static,
    {
        let (id, slot, drain) = {
            let mut queue = lock(&self.delivery);
            let slot = Arc::new(ListenerSlot {
                active: AtomicBool::new(true),
                since: queue.seq,
                callback: Box::new(listener),
            });

            let id = {
                let mut registry = lock(&self.listeners);
                let id = registry.next_id;
                registry.next_id += 1;
                registry.slots.insert(id, Arc::clone(&slot));
                id
            };

            queue.pending.push_back(Pending::Replay {
                slot: Arc::clone(&slot),
                status: self.status.load(),
            });
            let drain = !queue.draining;
            queue.draining = true;
            (id, slot, drain)
        };

        if drain {
            self.drain_deliveries();
        }

        Subscription {
            id,
            slot,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver queued notifications until the queue is empty.
    ///
    /// Only the caller that set `draining` runs this, so deliveries never
    /// overlap and keep queue order.
    fn drain_deliveries(&self) {
        let _guard = DrainGuard(&self.delivery);
        loop {
            let next = {
                let mut queue = lock(&self.delivery);
                match queue.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };

            match next {
                Pending::Change { seq, status } => {
                    let slots: Vec<Arc<ListenerSlot>> =
                        lock(&self.listeners).slots.values().cloned().collect();
                    for slot in slots.iter().filter(|slot| slot.since < seq) {
                        slot.deliver(status);
                    }
                }
                Pending::Replay { slot, status } => slot.deliver(status),
            }
        }
    }

    /// Last known status. Never probes.
    pub fn status(&self) -> ConnectivityStatus {
        self.status.load()
    }

    pub fn is_online(&self) -> bool {
        self.status() == ConnectivityStatus::Online
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring_active.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).slots.len()
    }

    /// Stop periodic probing. The monitor cannot be initialized again.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.monitoring_active.store(false, Ordering::SeqCst);
        if let Some(handle) = lock(&self.poll_task).take() {
            handle.abort();
            info!("Connectivity monitoring stopped");
        }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            status: self.status(),
            last_probe_at: *lock(&self.last_probe_at),
            last_change_at: *lock(&self.last_change_at),
            monitoring_active: self.is_monitoring(),
            subscriber_count: self.subscriber_count(),
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.poll_task).take() {
            handle.abort();
        }
    }
}
