//! Post-commit notification of security configuration changes.
//!
//! Listeners run synchronously, in registration order, after a change has
//! been committed. A failing or panicking listener does not stop the ones
//! after it and does not undo the change; failures are collected into a
//! [`NotificationReport`] and logged.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::access::CatalogMode;
use crate::telemetry::metrics::record_listener_failures;

// ═══════════════════════════════════════════════════════════════════════════════
// Change events
// ═══════════════════════════════════════════════════════════════════════════════

/// What changed in the security configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SecurityChange {
    ChainAdded { name: String, position: usize },
    ChainUpdated { name: String },
    ChainRemoved { name: String },
    ChainMoved { name: String, position: usize },
    ChainsReplaced { count: usize },
    RulesReplaced { count: usize },
    CatalogModeChanged { mode: CatalogMode },
}

impl fmt::Display for SecurityChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChainAdded { name, position } => write!(f, "chain '{}' added at {}", name, position),
            Self::ChainUpdated { name } => write!(f, "chain '{}' updated", name),
            Self::ChainRemoved { name } => write!(f, "chain '{}' removed", name),
            Self::ChainMoved { name, position } => write!(f, "chain '{}' moved to {}", name, position),
            Self::ChainsReplaced { count } => write!(f, "filter chains replaced ({} chains)", count),
            Self::RulesReplaced { count } => write!(f, "access rules replaced ({} rules)", count),
            Self::CatalogModeChanged { mode } => write!(f, "catalog mode set to {}", mode),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Listener trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives a notification after every committed configuration change.
pub trait SecurityManagerListener: Send + Sync {
    fn handle_post_changed(&self, change: &SecurityChange) -> anyhow::Result<()>;
}

impl<F> SecurityManagerListener for F
where
    F: Fn(&SecurityChange) -> anyhow::Result<()> + Send + Sync,
{
    fn handle_post_changed(&self, change: &SecurityChange) -> anyhow::Result<()> {
        self(change)
    }
}

/// Handle returned on registration, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ListenerId(u64);

// ═══════════════════════════════════════════════════════════════════════════════
// Report
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerFailure {
    pub listener: ListenerId,
    pub message: String,
    pub panicked: bool,
}

/// Outcome of delivering one change to every listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub change: SecurityChange,
    pub delivered: usize,
    pub failures: Vec<ListenerFailure>,
}

impl NotificationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

type Entry = (ListenerId, Arc<dyn SecurityManagerListener>);

/// Ordered set of listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn SecurityManagerListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        debug!(listener = id.0, "Registered security listener");
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `change` to every listener registered at the time of the call.
    ///
    /// The registry lock is not held while listeners run, so a listener may
    /// add or remove listeners; such edits apply from the next change on.
    pub fn fire(&self, change: SecurityChange) -> NotificationReport {
        let listeners: Vec<Entry> = self.listeners.read().clone();
        let mut failures = Vec::new();

        for (id, listener) in &listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.handle_post_changed(&change)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(ListenerFailure {
                    listener: *id,
                    message: format!("{:#}", err),
                    panicked: false,
                }),
                Err(payload) => Some(ListenerFailure {
                    listener: *id,
                    message: panic_message(payload.as_ref()),
                    panicked: true,
                }),
            };

            if let Some(failure) = failure {
                warn!(
                    listener = id.0,
                    change = %change,
                    panicked = failure.panicked,
                    error = %failure.message,
                    "Security listener failed"
                );
                failures.push(failure);
            }
        }

        record_listener_failures(failures.len());
        NotificationReport {
            change,
            delivered: listeners.len() - failures.len(),
            failures,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "listener panicked".to_string()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn change() -> SecurityChange {
        SecurityChange::ChainRemoved { name: "rest".into() }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Arc<dyn SecurityManagerListener> {
        let log = log.clone();
        Arc::new(move |_: &SecurityChange| -> anyhow::Result<()> {
            log.lock().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_registration_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(recorder(&log, "a"));
        registry.add(recorder(&log, "b"));
        registry.add(recorder(&log, "c"));

        let report = registry.fire(change());
        assert!(report.is_clean());
        assert_eq!(report.delivered, 3);
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_collect_and_continue() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(recorder(&log, "first"));
        let failing = registry.add(Arc::new(|_: &SecurityChange| -> anyhow::Result<()> {
            anyhow::bail!("cache offline")
        }));
        let panicking = registry.add(Arc::new(|_: &SecurityChange| -> anyhow::Result<()> {
            panic!("listener bug")
        }));
        registry.add(recorder(&log, "last"));

        let report = registry.fire(change());
        assert_eq!(*log.lock(), vec!["first", "last"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].listener, failing);
        assert_eq!(report.failures[0].message, "cache offline");
        assert!(!report.failures[0].panicked);
        assert_eq!(report.failures[1].listener, panicking);
        assert_eq!(report.failures[1].message, "listener bug");
        assert!(report.failures[1].panicked);
    }

    #[test]
    fn test_remove() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = registry.add(recorder(&log, "gone"));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.fire(change());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_listener_may_reenter_registry() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = registry.clone();
        registry.add(Arc::new(move |_: &SecurityChange| -> anyhow::Result<()> {
            inner.add(Arc::new(|_: &SecurityChange| -> anyhow::Result<()> { Ok(()) }));
            Ok(())
        }));

        let report = registry.fire(change());
        assert_eq!(report.delivered, 1);
        assert_eq!(registry.len(), 2);
    }
}
