//! A cascade graph shared between threads.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use super::CascadeGraph;
use crate::config::CascadeConfig;

/// A [`CascadeGraph`] behind a read-write lock.
///
/// Mutations are serialized by the write lock; resolution takes the read
/// lock. Listeners run after the write lock has been released, so they may
/// read (or even mutate) the graph themselves.
///
/// Cloning is cheap and yields a handle to the same graph.
#[derive(Clone, Default)]
pub struct SharedCascadeGraph {
    inner: Arc<RwLock<CascadeGraph>>,
}

impl std::fmt::Debug for SharedCascadeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_read() {
            Some(graph) => f.debug_tuple("SharedCascadeGraph").field(&*graph).finish(),
            None => f.write_str("SharedCascadeGraph(<locked>)"),
        }
    }
}

impl SharedCascadeGraph {
    /// A new, empty shared graph with the default configuration.
    pub fn new() -> Self {
        Self::from_graph(CascadeGraph::new())
    }

    /// A new, empty shared graph with the given configuration.
    pub fn with_config(config: CascadeConfig) -> Self {
        Self::from_graph(CascadeGraph::with_config(config))
    }

    /// Share an existing graph.
    pub fn from_graph(graph: CascadeGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Lock the graph for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, CascadeGraph> {
        self.inner.read()
    }

    /// Run `f` with exclusive access to the graph.
    ///
    /// Notifications produced by `f` are collected and delivered after the
    /// lock is released, in the order they were produced.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut CascadeGraph) -> R) -> R {
        let (result, pending) = {
            let mut graph = self.inner.write();
            graph.set_deferred(true);
            let result = f(&mut graph);
            graph.set_deferred(false);
            (result, graph.take_pending())
        };
        for notify in pending {
            notify();
        }
        result
    }

    /// Returns `true` if both handles refer to the same graph.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

static_assertions::assert_impl_all!(SharedCascadeGraph: Send, Sync);
