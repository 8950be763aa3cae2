//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use horizon_cascade::graph::{CascadeEvent, CascadeGraph, ChangeKind, NodeId};
use horizon_cascade_core::ConnectionGuard;
use parking_lot::Mutex;

/// Route `tracing` output to the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects every event a node emits while the guard is alive.
pub struct EventLog {
    events: Arc<Mutex<Vec<CascadeEvent>>>,
    _guard: ConnectionGuard<CascadeEvent>,
}

impl EventLog {
    pub fn attach(graph: &CascadeGraph, node: NodeId) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let guard = graph
            .subscribe(node, move |event| sink.lock().push(event.clone()))
            .unwrap();
        Self {
            events,
            _guard: guard,
        }
    }

    pub fn take(&self) -> Vec<CascadeEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}
