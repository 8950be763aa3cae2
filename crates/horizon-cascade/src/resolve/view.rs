//! Stateful views: a cascade node bound to a live state set.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use horizon_cascade_core::logging::targets;
use horizon_cascade_core::{ConnectionGuard, Signal, ValueCell};
use parking_lot::{Mutex, RwLock};

use super::memo::{MemoEntry, ResolutionMemo};
use crate::Result;
use crate::attribute::{Attribute, AttributeId, AttributeValue};
use crate::graph::{NodeId, SharedCascadeGraph};
use crate::rules::{CellWatch, ErasedCell};
use crate::state::{StateName, StateSet};

struct ViewShared {
    graph: SharedCascadeGraph,
    node: NodeId,
    states: RwLock<StateSet>,
    memo: Mutex<ResolutionMemo>,
    /// Bumped on every invalidation; a resolution computed across a bump is
    /// not memoized.
    generation: AtomicU64,
    changed: Arc<Signal<AttributeId>>,
}

impl ViewShared {
    fn on_invalidated(self: &Arc<Self>, attribute: AttributeId) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let old = {
            let mut memo = self.memo.lock();
            if !memo.is_tracked(attribute) {
                return;
            }
            memo.take(attribute)
        };
        let entry = self.refresh(attribute);
        let changed = old.as_ref().is_none_or(|old| !entry.same_winner(old));
        tracing::trace!(
            target: targets::VIEW,
            node = ?self.node,
            ?attribute,
            changed,
            "view invalidated"
        );
        if changed {
            self.changed.emit(attribute);
        }
    }

    /// Resolve `attribute` for the current states, track it and memoize the
    /// result unless an invalidation raced with the computation.
    fn refresh(self: &Arc<Self>, attribute: AttributeId) -> MemoEntry {
        let generation = self.generation.load(Ordering::Acquire);
        let states = self.states.read().clone();
        let entry = self.compute(attribute, &states);
        let watch = entry.winner.as_ref().map(|cell| self.watch(cell, attribute));

        let mut memo = self.memo.lock();
        let current = self.generation.load(Ordering::Acquire) == generation;
        memo.store(attribute, current.then(|| entry.clone()), watch);
        entry
    }

    /// Report writes into the winning cell of `attribute`.
    fn watch(self: &Arc<Self>, cell: &Arc<dyn ErasedCell>, attribute: AttributeId) -> CellWatch {
        let weak = Arc::downgrade(self);
        cell.watch(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                tracing::trace!(target: targets::VIEW, node = ?shared.node, ?attribute, "winning cell written");
                shared.changed.emit(attribute);
            }
        }))
    }

    fn compute(&self, attribute: AttributeId, states: &StateSet) -> MemoEntry {
        let graph = self.graph.read();
        if !graph.contains(self.node) {
            return MemoEntry::default();
        }
        graph.resolve_erased(self.node, attribute, states).into()
    }
}

/// A read window onto one cascade node for the element's current states.
///
/// Resolutions are memoized per attribute. Every attribute resolved through
/// the view is tracked from then on: when the graph reports that it may
/// resolve differently, when a state its outcome depends on toggles, or when
/// its winning cell is written, the view resolves it again and
/// [`subscribe`](Self::subscribe) listeners hear about it if the winning
/// rule changed (or, for a cell write, its value). Attributes evicted from
/// the memo are reported on every such occasion.
///
/// # Example
///
/// ```
/// use horizon_cascade::attribute::AttributeRegistry;
/// use horizon_cascade::condition::{Condition, RuleCondition};
/// use horizon_cascade::graph::SharedCascadeGraph;
/// use horizon_cascade::resolve::StatefulView;
/// use horizon_cascade::state::states;
///
/// let mut registry = AttributeRegistry::new();
/// let color = registry.register("paint", "color", "white".to_string()).unwrap();
///
/// let graph = SharedCascadeGraph::new();
/// let button = graph.mutate(|g| g.create_node("Button"));
/// graph
///     .mutate(|g| g.set(button, &color, Condition::state(states::PRESSED), "blue".to_string()))
///     .unwrap();
///
/// let view = StatefulView::new(&graph, button).unwrap();
/// assert_eq!(view.resolve(&color), "white");
/// view.add_state(states::PRESSED);
/// assert_eq!(view.resolve(&color), "blue");
/// ```
pub struct StatefulView {
    shared: Arc<ViewShared>,
    _invalidated: ConnectionGuard<AttributeId>,
}

impl fmt::Debug for StatefulView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulView")
            .field("node", &self.shared.node)
            .field("states", &*self.shared.states.read())
            .field("memoized", &self.shared.memo.lock().len())
            .finish()
    }
}

impl StatefulView {
    /// A view of `node` with no active states.
    pub fn new(graph: &SharedCascadeGraph, node: NodeId) -> Result<Self> {
        Self::with_states(graph, node, StateSet::new())
    }

    /// A view of `node` starting in `states`.
    pub fn with_states(graph: &SharedCascadeGraph, node: NodeId, states: StateSet) -> Result<Self> {
        let (signal, capacity) = {
            let graph = graph.read();
            (graph.invalidation_signal(node)?, graph.config().memo_capacity)
        };

        let shared = Arc::new(ViewShared {
            graph: graph.clone(),
            node,
            states: RwLock::new(states),
            memo: Mutex::new(ResolutionMemo::with_capacity(capacity)),
            generation: AtomicU64::new(0),
            changed: Arc::new(Signal::new()),
        });
        let weak = Arc::downgrade(&shared);
        let invalidated = signal.connect_scoped(move |attribute: &AttributeId| {
            if let Some(shared) = weak.upgrade() {
                shared.on_invalidated(*attribute);
            }
        });

        Ok(Self {
            shared,
            _invalidated: invalidated,
        })
    }

    /// The viewed node.
    pub fn node(&self) -> NodeId {
        self.shared.node
    }

    /// The graph the node lives in.
    pub fn graph(&self) -> &SharedCascadeGraph {
        &self.shared.graph
    }

    /// The current state set.
    pub fn states(&self) -> StateSet {
        self.shared.states.read().clone()
    }

    /// Effective value of `attribute` for the current states.
    ///
    /// Never fails: without a matching rule the attribute default is
    /// returned.
    pub fn resolve<T: AttributeValue>(&self, attribute: &Attribute<T>) -> T {
        self.entry(attribute.id())
            .winner
            .and_then(|cell| cell.as_any().downcast_ref::<ValueCell<T>>().map(ValueCell::get))
            .unwrap_or_else(|| attribute.default_value().clone())
    }

    /// Returns `true` if a rule (rather than the default) supplies the value
    /// of `attribute` for the current states.
    pub fn is_set<T: AttributeValue>(&self, attribute: &Attribute<T>) -> bool {
        self.entry(attribute.id()).winner.is_some()
    }

    /// Replace the state set.
    ///
    /// Tracked attributes that depend on a toggled state are re-resolved,
    /// and subscribers hear about those whose winning rule changed.
    pub fn set_states(&self, states: StateSet) {
        let toggled: BTreeSet<StateName> = {
            let mut current = self.shared.states.write();
            if *current == states {
                return;
            }
            let toggled = current.toggled_against(&states).cloned().collect();
            *current = states;
            toggled
        };
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let stale = self.shared.memo.lock().invalidate_states(&toggled);
        tracing::trace!(
            target: targets::VIEW,
            node = ?self.shared.node,
            toggled = toggled.len(),
            stale = stale.len(),
            "state change"
        );

        let mut changed = Vec::new();
        for (attribute, old) in stale {
            let entry = self.shared.refresh(attribute);
            if old.is_none_or(|old| !entry.same_winner(&old)) {
                changed.push(attribute);
            }
        }
        for attribute in changed {
            self.shared.changed.emit(attribute);
        }
    }

    /// Activate `state`.
    pub fn add_state(&self, state: impl Into<StateName>) {
        let mut states = self.states();
        if states.insert(state) {
            self.set_states(states);
        }
    }

    /// Deactivate `state`.
    pub fn remove_state(&self, state: &str) {
        let mut states = self.states();
        if states.remove(state) {
            self.set_states(states);
        }
    }

    /// Listen for attributes whose resolved value may have changed.
    pub fn subscribe<F>(&self, listener: F) -> ConnectionGuard<AttributeId>
    where
        F: Fn(&AttributeId) + Send + Sync + 'static,
    {
        self.shared.changed.connect_scoped(listener)
    }

    /// Drop every memoized resolution. Attributes stay tracked.
    pub fn invalidate_all(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.shared.memo.lock().invalidate_all();
    }

    /// Number of memoized resolutions.
    pub fn memoized(&self) -> usize {
        self.shared.memo.lock().len()
    }

    fn entry(&self, attribute: AttributeId) -> MemoEntry {
        if let Some(entry) = self.shared.memo.lock().get(attribute) {
            return entry.clone();
        }
        self.shared.refresh(attribute)
    }
}

static_assertions::assert_impl_all!(StatefulView: Send, Sync);
