//! The cascade graph.
//!
//! Every cascade node (a widget's personal rules, a group refinement, a style
//! sheet, a projection of a sheet) lives in one [`CascadeGraph`] arena and is
//! addressed by a [`NodeId`]. Dependency edges are plain handles: removing an
//! edge never destroys the parent, and a node that still has dependents
//! cannot be removed.
//!
//! Mutators take `&mut self`. Listener notifications are queued while the
//! mutation runs and dispatched after it is structurally complete, so a
//! listener never observes a half-applied change. [`SharedCascadeGraph`]
//! additionally releases its write lock before dispatching.
//!
//! # Example
//!
//! ```
//! use horizon_cascade::attribute::AttributeRegistry;
//! use horizon_cascade::condition::{Condition, RuleCondition};
//! use horizon_cascade::graph::CascadeGraph;
//! use horizon_cascade::state::{StateSet, states};
//!
//! let mut registry = AttributeRegistry::new();
//! let color = registry.register("paint", "color", "white".to_string()).unwrap();
//!
//! let mut graph = CascadeGraph::new();
//! let group = graph.create_node("ButtonGroup");
//! let button = graph.create_node("Button");
//! graph.add_dependency(button, group, None).unwrap();
//!
//! graph.set(group, &color, RuleCondition::Always, "gray".to_string()).unwrap();
//! graph.set(button, &color, Condition::state(states::PRESSED), "blue".to_string()).unwrap();
//!
//! assert_eq!(graph.resolve_in(button, &color, &StateSet::new()), "gray");
//! let pressed = StateSet::new().with(states::PRESSED);
//! assert_eq!(graph.resolve_in(button, &color, &pressed), "blue");
//! ```

mod chain;
mod event;
mod shared;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use horizon_cascade_core::logging::targets;
use horizon_cascade_core::{ConnectionGuard, Signal, ValueCell};
use slotmap::{SlotMap, new_key_type};

pub use event::{CascadeEvent, ChangeKind};
pub use shared::SharedCascadeGraph;

use crate::attribute::{Attribute, AttributeId, AttributeValue};
use crate::condition::{RuleCondition, sort_by_specificity};
use crate::config::CascadeConfig;
use crate::projection::ProjectionFilter;
use crate::rules::{ErasedCell, LocalRules, Rule, SetOutcome, StoredRule};
use crate::state::{StateName, StateSet};
use crate::{Error, Result};

new_key_type! {
    /// Handle to a node in a [`CascadeGraph`].
    pub struct NodeId;
}

/// Deferred listener notification.
pub(crate) type Notification = Box<dyn FnOnce() + Send + Sync>;

/// What a cascade node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// State-conditioned rules and an ordered parent list.
    Plain,
    /// Style-sheet rules keyed by state, group and element type. A sheet has
    /// no parents and reaches plain nodes only through projections.
    StyleSheet,
    /// A read-only view of one sheet for a fixed group and element type.
    Projection,
}

pub(crate) struct NodeData {
    pub(crate) label: String,
    pub(crate) kind: NodeKind,
    pub(crate) filter: Option<ProjectionFilter>,
    pub(crate) rules: LocalRules,
    /// Ordered dependencies, index 0 first.
    pub(crate) parents: Vec<NodeId>,
    /// Reverse edges: nodes listing this one as a parent, and projections
    /// of this sheet.
    pub(crate) dependents: Vec<NodeId>,
    pub(crate) events: Arc<Signal<CascadeEvent>>,
    /// Attributes that may resolve differently on this node, including
    /// changes the shadow test keeps out of `events`.
    pub(crate) invalidated: Arc<Signal<AttributeId>>,
}

impl NodeData {
    pub(crate) fn new(label: String, kind: NodeKind, filter: Option<ProjectionFilter>) -> Self {
        Self {
            label,
            kind,
            filter,
            rules: LocalRules::default(),
            parents: Vec::new(),
            dependents: Vec::new(),
            events: Arc::new(Signal::new()),
            invalidated: Arc::new(Signal::new()),
        }
    }
}

/// Outcome of resolving one attribute for one state set.
pub(crate) struct Resolution {
    /// Cell of the winning rule, `None` for the attribute default.
    pub(crate) winner: Option<Arc<dyn ErasedCell>>,
    /// States mentioned by every condition examined up to the winner.
    pub(crate) depends_on: BTreeSet<StateName>,
}

/// An arena of cascade nodes and their dependency edges.
pub struct CascadeGraph {
    nodes: SlotMap<NodeId, NodeData>,
    config: CascadeConfig,
    pending: Vec<Notification>,
    deferred: bool,
}

impl fmt::Debug for CascadeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeGraph")
            .field("nodes", &self.nodes.len())
            .field("config", &self.config)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for CascadeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeGraph {
    /// An empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CascadeConfig::default())
    }

    /// An empty graph with the given configuration.
    pub fn with_config(config: CascadeConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            config,
            pending: Vec::new(),
            deferred: false,
        }
    }

    /// The configuration this graph was created with.
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Create a plain cascade node.
    pub fn create_node(&mut self, label: impl Into<String>) -> NodeId {
        self.insert_node(NodeData::new(label.into(), NodeKind::Plain, None))
    }

    /// Create a style-sheet node.
    pub fn create_sheet(&mut self, label: impl Into<String>) -> NodeId {
        self.insert_node(NodeData::new(label.into(), NodeKind::StyleSheet, None))
    }

    pub(crate) fn insert_node(&mut self, data: NodeData) -> NodeId {
        let kind = data.kind;
        let id = self.nodes.insert(data);
        tracing::debug!(target: targets::RULES, node = ?id, ?kind, "created cascade node");
        id
    }

    /// Destroy a node.
    ///
    /// Fails with [`Error::InvalidArgument`] while another node still depends
    /// on it (or, for a sheet, while projections of it exist). The node's own
    /// dependency edges are dropped silently: nothing downstream can observe
    /// them.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        let data = self.node(node)?;
        if !data.dependents.is_empty() {
            tracing::warn!(
                target: targets::CHAIN,
                ?node,
                dependents = data.dependents.len(),
                "refusing to remove a node that still has dependents"
            );
            return Err(Error::invalid_argument(format!(
                "cascade node '{}' still has {} dependents",
                data.label,
                data.dependents.len()
            )));
        }

        let Some(data) = self.nodes.remove(node) else {
            return Err(Error::UnknownNode(node));
        };
        let upstream = data.filter.as_ref().map(|f| f.sheet).into_iter();
        for parent in data.parents.iter().copied().chain(upstream) {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.dependents.retain(|d| *d != node);
            }
        }
        tracing::debug!(target: targets::RULES, ?node, label = %data.label, "removed cascade node");
        Ok(())
    }

    /// Returns `true` if `node` is live in this graph.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The label given at creation.
    pub fn label(&self, node: NodeId) -> Result<&str> {
        Ok(&self.node(node)?.label)
    }

    /// What kind of node `node` is.
    pub fn kind(&self, node: NodeId) -> Result<NodeKind> {
        Ok(self.node(node)?.kind)
    }

    /// Ordered dependencies of `node`, highest priority first.
    pub fn dependencies(&self, node: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(node)?.parents)
    }

    /// Nodes that depend on `node`.
    pub fn dependents(&self, node: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(node)?.dependents)
    }

    /// Listen to visible rule changes of `node`.
    ///
    /// The returned guard disconnects the listener when dropped.
    pub fn subscribe<F>(&self, node: NodeId, listener: F) -> Result<ConnectionGuard<CascadeEvent>>
    where
        F: Fn(&CascadeEvent) + Send + Sync + 'static,
    {
        Ok(self.node(node)?.events.connect_scoped(listener))
    }

    /// The raw event signal of `node`.
    pub fn signal(&self, node: NodeId) -> Result<Arc<Signal<CascadeEvent>>> {
        Ok(Arc::clone(&self.node(node)?.events))
    }

    /// Signal carrying every attribute that may now resolve differently on
    /// `node`, reported or not.
    pub(crate) fn invalidation_signal(&self, node: NodeId) -> Result<Arc<Signal<AttributeId>>> {
        Ok(Arc::clone(&self.node(node)?.invalidated))
    }

    // =========================================================================
    // Local storage
    // =========================================================================

    /// Set the value of the rule for `attribute` under `condition`.
    ///
    /// An existing rule with an equal condition keeps its cell and receives
    /// the value; dependents that see the rule get a
    /// [`ChangeKind::Changed`] event if the value differs. Otherwise a new
    /// rule is inserted and dependents that see it get
    /// [`ChangeKind::Visible`].
    pub fn set<T: AttributeValue>(
        &mut self,
        node: NodeId,
        attribute: &Attribute<T>,
        condition: impl Into<RuleCondition>,
        value: T,
    ) -> Result<()> {
        attribute.validate(&value)?;
        let condition = self.normalize(node, condition.into())?;
        let id = attribute.id();

        let exists = self.node(node)?.rules.get(id).iter().any(|r| r.condition == condition);
        let before = (!exists).then(|| self.local_snapshot(node, id, &condition));

        let data = self.node_mut(node)?;
        let (outcome, notify) = data.rules.set_value(id, condition.clone(), value);
        tracing::debug!(
            target: targets::RULES,
            ?node,
            attribute = %attribute.qualified_name(),
            %condition,
            ?outcome,
            "set rule"
        );
        self.pending.extend(notify);

        match (outcome, before) {
            (SetOutcome::Inserted, Some(before)) => self.queue_changes(before),
            (SetOutcome::Replaced, _) => self.queue_value_changed(node, id, &condition),
            _ => {}
        }
        self.flush();
        Ok(())
    }

    /// Store an externally owned value cell under `condition`.
    ///
    /// The cell stays shared with the caller: later writes to it are seen by
    /// every resolution that picks this rule. Swapping in a different cell
    /// under an existing condition is reported as [`ChangeKind::Changed`]
    /// even when both cells hold equal values.
    pub fn set_cell<T: AttributeValue>(
        &mut self,
        node: NodeId,
        attribute: &Attribute<T>,
        condition: impl Into<RuleCondition>,
        cell: ValueCell<T>,
    ) -> Result<()> {
        cell.with(|value| attribute.validate(value))?;
        let condition = self.normalize(node, condition.into())?;
        let id = attribute.id();

        let before = self.local_snapshot(node, id, &condition);
        let outcome = self.node_mut(node)?.rules.set_cell(id, condition.clone(), cell);
        tracing::debug!(
            target: targets::RULES,
            ?node,
            attribute = %attribute.qualified_name(),
            %condition,
            ?outcome,
            "set rule cell"
        );
        self.queue_changes(before);
        self.flush();
        Ok(())
    }

    /// Remove the rule stored under exactly `condition`.
    ///
    /// Returns `false` if there was none.
    pub fn clear<T: AttributeValue>(
        &mut self,
        node: NodeId,
        attribute: &Attribute<T>,
        condition: impl Into<RuleCondition>,
    ) -> Result<bool> {
        let condition = self.normalize(node, condition.into())?;
        let id = attribute.id();
        if !self.node(node)?.rules.get(id).iter().any(|r| r.condition == condition) {
            return Ok(false);
        }

        let before = self.local_snapshot(node, id, &condition);
        self.node_mut(node)?.rules.clear(id, &condition);
        tracing::debug!(
            target: targets::RULES,
            ?node,
            attribute = %attribute.qualified_name(),
            %condition,
            "cleared rule"
        );
        self.queue_changes(before);
        self.flush();
        Ok(true)
    }

    /// Local rules for `attribute`, in insertion order.
    ///
    /// For a projection these are the matching rules of its sheet, with the
    /// group and type dimensions dropped.
    pub fn get_local<T: AttributeValue>(
        &self,
        node: NodeId,
        attribute: &Attribute<T>,
    ) -> Result<Vec<Rule<T>>> {
        self.node(node)?;
        Ok(typed(node, self.local_rules(node, attribute.id())))
    }

    /// Local rules for `attribute`, most specific first.
    pub fn get_local_sorted<T: AttributeValue>(
        &self,
        node: NodeId,
        attribute: &Attribute<T>,
    ) -> Result<Vec<Rule<T>>> {
        let data = self.node(node)?;
        let rules = match data.filter {
            Some(_) => {
                let mut rules = self.local_rules(node, attribute.id());
                sort_by_specificity(&mut rules, |r| &r.condition);
                rules
            }
            None => data.rules.sorted(attribute.id()).cloned().collect(),
        };
        Ok(typed(node, rules))
    }

    /// Every rule for `attribute` reachable from `node`: its locals, then
    /// each dependency's effective rules in dependency order. A node reached
    /// along several paths contributes once, at its first position.
    pub fn get_effective<T: AttributeValue>(
        &self,
        node: NodeId,
        attribute: &Attribute<T>,
    ) -> Result<Vec<Rule<T>>> {
        self.node(node)?;
        Ok(self
            .effective_rules(node, attribute.id())
            .into_iter()
            .filter_map(|(owner, rule)| Rule::from_stored(&rule, owner))
            .collect())
    }

    /// Attributes with at least one local rule on `node`.
    pub fn local_attributes(&self, node: NodeId) -> Result<Vec<AttributeId>> {
        self.node(node)?;
        let mut attributes = self.local_attribute_ids(node);
        attributes.sort_unstable();
        Ok(attributes)
    }

    /// Resolve `attribute` on `node` for `states`, without memoization.
    ///
    /// Never fails: a stale handle or an attribute without a matching rule
    /// yields the attribute default.
    pub fn resolve_in<T: AttributeValue>(
        &self,
        node: NodeId,
        attribute: &Attribute<T>,
        states: &StateSet,
    ) -> T {
        if !self.contains(node) {
            tracing::warn!(target: targets::VIEW, ?node, "resolving on a destroyed node");
            return attribute.default_value().clone();
        }
        self.resolve_erased(node, attribute.id(), states)
            .winner
            .and_then(|cell| cell.as_any().downcast_ref::<ValueCell<T>>().map(ValueCell::get))
            .unwrap_or_else(|| attribute.default_value().clone())
    }

    /// Returns `true` if some rule for `attribute` matches `states`.
    pub fn is_set<T: AttributeValue>(
        &self,
        node: NodeId,
        attribute: &Attribute<T>,
        states: &StateSet,
    ) -> bool {
        self.contains(node) && self.resolve_erased(node, attribute.id(), states).winner.is_some()
    }

    // =========================================================================
    // Crate internals
    // =========================================================================

    pub(crate) fn node(&self, node: NodeId) -> Result<&NodeData> {
        self.nodes.get(node).ok_or(Error::UnknownNode(node))
    }

    pub(crate) fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeData> {
        self.nodes.get_mut(node).ok_or(Error::UnknownNode(node))
    }

    /// Bring a condition into the form stored by `node`.
    fn normalize(&self, node: NodeId, condition: RuleCondition) -> Result<RuleCondition> {
        match self.node(node)?.kind {
            NodeKind::StyleSheet => Ok(RuleCondition::Sheet(condition.into_sheet())),
            NodeKind::Plain => match condition {
                RuleCondition::Sheet(_) => Err(Error::invalid_argument(
                    "style-sheet conditions can only be stored on style-sheet nodes",
                )),
                other => Ok(other),
            },
            NodeKind::Projection => Err(Error::invalid_argument("projections are read-only")),
        }
    }

    /// Rules held by `node` itself for `attribute`, in insertion order.
    pub(crate) fn local_rules(&self, node: NodeId, attribute: AttributeId) -> Vec<StoredRule> {
        let Some(data) = self.nodes.get(node) else {
            return Vec::new();
        };
        match &data.filter {
            Some(filter) => self.project_rules(filter, attribute),
            None => data.rules.get(attribute).to_vec(),
        }
    }

    pub(crate) fn local_attribute_ids(&self, node: NodeId) -> Vec<AttributeId> {
        let Some(data) = self.nodes.get(node) else {
            return Vec::new();
        };
        match &data.filter {
            Some(filter) => self.projected_attributes(filter),
            None => data.rules.attributes().collect(),
        }
    }

    /// `(owner, rule)` for every rule on the chain of `node`.
    pub(crate) fn effective_rules(
        &self,
        node: NodeId,
        attribute: AttributeId,
    ) -> Vec<(NodeId, StoredRule)> {
        self.walk(node)
            .into_iter()
            .flat_map(|owner| {
                self.local_rules(owner, attribute)
                    .into_iter()
                    .map(move |rule| (owner, rule))
            })
            .collect()
    }

    pub(crate) fn resolve_erased(
        &self,
        node: NodeId,
        attribute: AttributeId,
        states: &StateSet,
    ) -> Resolution {
        let mut rules = self.effective_rules(node, attribute);
        sort_by_specificity(&mut rules, |(_, r)| &r.condition);

        let mut depends_on = BTreeSet::new();
        for (_, rule) in rules {
            depends_on.extend(rule.condition.states());
            if rule.condition.is_satisfied_by(states) {
                return Resolution {
                    winner: Some(rule.cell),
                    depends_on,
                };
            }
        }
        Resolution {
            winner: None,
            depends_on,
        }
    }

    /// Run queued notifications unless a caller holding a lock asked to
    /// collect them instead.
    pub(crate) fn flush(&mut self) {
        if self.deferred {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracing::trace!(target: targets::CHAIN, count = pending.len(), "dispatching notifications");
        }
        for notify in pending {
            notify();
        }
    }

    pub(crate) fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }
}

fn typed<T: AttributeValue>(owner: NodeId, rules: Vec<StoredRule>) -> Vec<Rule<T>> {
    rules
        .iter()
        .filter_map(|rule| Rule::from_stored(rule, owner))
        .collect()
}

static_assertions::assert_impl_all!(CascadeGraph: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::attribute::AttributeRegistry;
    use crate::condition::Condition;
    use crate::state::states;

    fn color() -> Attribute<String> {
        let mut registry = AttributeRegistry::new();
        registry.register("paint", "color", "white".to_string()).unwrap()
    }

    fn collect(graph: &CascadeGraph, node: NodeId) -> (Arc<Mutex<Vec<CascadeEvent>>>, ConnectionGuard<CascadeEvent>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let guard = graph
            .subscribe(node, move |e| sink.lock().push(e.clone()))
            .unwrap();
        (events, guard)
    }

    #[test]
    fn default_when_nothing_is_set() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        assert_eq!(graph.resolve_in(node, &color, &StateSet::new()), "white");
        assert!(!graph.is_set(node, &color, &StateSet::new()));
    }

    #[test]
    fn set_rejects_invalid_values_without_change() {
        let mut registry = AttributeRegistry::new();
        let width = registry
            .define("layout", "width", 0_i32)
            .validator(|v| *v >= 0)
            .register()
            .unwrap();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        let (events, _guard) = collect(&graph, node);

        let err = graph.set(node, &width, RuleCondition::Always, -1).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
        assert!(graph.get_local(node, &width).unwrap().is_empty());
        assert!(events.lock().is_empty());
    }

    #[test]
    fn reset_with_same_value_fires_once() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        let (events, _guard) = collect(&graph, node);

        let pressed = Condition::state(states::PRESSED);
        graph.set(node, &color, pressed.clone(), "blue".to_string()).unwrap();
        graph.set(node, &color, pressed.clone(), "blue".to_string()).unwrap();
        assert_eq!(events.lock().len(), 1);
        assert_eq!(events.lock()[0].kind, ChangeKind::Visible);

        graph.set(node, &color, pressed, "red".to_string()).unwrap();
        assert_eq!(events.lock().len(), 2);
        assert_eq!(events.lock()[1].kind, ChangeKind::Changed);
        assert_eq!(graph.get_local(node, &color).unwrap().len(), 1);
    }

    #[test]
    fn replacing_a_value_keeps_the_cell() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        graph.set(node, &color, RuleCondition::Always, "a".to_string()).unwrap();
        let rule = graph.get_local(node, &color).unwrap().remove(0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _guard = rule.value.subscribe(move |v| sink.lock().push(v.clone()));

        graph.set(node, &color, RuleCondition::Always, "b".to_string()).unwrap();
        assert_eq!(rule.get(), "b");
        assert_eq!(*seen.lock(), vec!["b".to_string()]);
    }

    #[test]
    fn clear_removes_exact_condition_only() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        let pressed = Condition::state(states::PRESSED);
        graph.set(node, &color, pressed.clone(), "blue".to_string()).unwrap();

        assert!(!graph.clear(node, &color, RuleCondition::Always).unwrap());
        assert!(graph.clear(node, &color, pressed).unwrap());
        assert!(graph.local_attributes(node).unwrap().is_empty());
    }

    #[test]
    fn sheet_conditions_are_rejected_on_plain_nodes() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        let sheet_condition = crate::condition::SheetCondition::new().in_group("g");
        assert!(graph.set(node, &color, sheet_condition, "x".to_string()).is_err());
    }

    #[test]
    fn shadowed_change_still_invalidates() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        let parent = graph.create_node("p");
        graph.add_dependency(node, parent, None).unwrap();
        graph.set(node, &color, Condition::state(states::PRESSED), "blue".to_string()).unwrap();

        let (events, _events_guard) = collect(&graph, node);
        let invalidated = Arc::new(Mutex::new(Vec::new()));
        let _guard = {
            let sink = Arc::clone(&invalidated);
            graph
                .invalidation_signal(node)
                .unwrap()
                .connect_scoped(move |attribute| sink.lock().push(*attribute))
        };

        let narrow = Condition::state(states::PRESSED).and(Condition::state(states::FOCUSED));
        graph.set(parent, &color, narrow, "red".to_string()).unwrap();
        assert!(events.lock().is_empty());
        assert_eq!(*invalidated.lock(), vec![color.id()]);

        let both = StateSet::new().with(states::PRESSED).with(states::FOCUSED);
        assert_eq!(graph.resolve_in(node, &color, &both), "red");
    }

    #[test]
    fn swapping_in_an_equal_cell_is_a_change() {
        let color = color();
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("n");
        graph
            .set_cell(node, &color, RuleCondition::Always, ValueCell::new("a".to_string()))
            .unwrap();
        let (events, _guard) = collect(&graph, node);

        let replacement = ValueCell::new("a".to_string());
        graph
            .set_cell(node, &color, RuleCondition::Always, replacement.clone())
            .unwrap();
        assert_eq!(events.lock().len(), 1);
        assert_eq!(events.lock()[0].kind, ChangeKind::Changed);

        replacement.set("b".to_string());
        assert_eq!(graph.resolve_in(node, &color, &StateSet::new()), "b");
    }

    #[test]
    fn remove_node_requires_no_dependents() {
        let mut graph = CascadeGraph::new();
        let parent = graph.create_node("parent");
        let child = graph.create_node("child");
        graph.add_dependency(child, parent, None).unwrap();

        assert!(matches!(graph.remove_node(parent), Err(Error::InvalidArgument(_))));
        graph.remove_node(child).unwrap();
        assert!(graph.dependents(parent).unwrap().is_empty());
        graph.remove_node(parent).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.label(parent), Err(Error::UnknownNode(parent)));
    }
}
