//! Dependency edges and shadow-aware change propagation.
//!
//! Every structural change (a rule inserted or removed, an edge added,
//! removed or re-pointed) is handled the same way: for each node that can
//! observe the change, the set of *visible* rules is captured before and
//! after the mutation, and the difference is reported as events.
//!
//! A rule is visible from a node when no node walked before its owner holds
//! a rule that shadows it. The walk visits the node's locals first and then
//! its dependencies in order, depth first, each node once.
//!
//! The shadow test can hide a narrower upstream rule that still wins
//! resolution under a broader local one. Memoizing readers therefore listen
//! to the per-node invalidation signal instead, which fires for every
//! examined (node, attribute) pair whether or not an event was reported.

use std::collections::HashSet;
use std::sync::Arc;

use horizon_cascade_core::logging::targets;

use super::{CascadeEvent, CascadeGraph, ChangeKind, NodeId, NodeKind};
use crate::attribute::AttributeId;
use crate::condition::{RuleCondition, shadows};
use crate::rules::ErasedCell;
use crate::{Error, Result};

/// A rule that is visible from some node.
#[derive(Clone)]
pub(crate) struct VisibleRule {
    pub(crate) condition: RuleCondition,
    pub(crate) owner: NodeId,
    pub(crate) cell: Arc<dyn ErasedCell>,
}

/// Visible rules of a set of nodes for a set of attributes, captured before
/// a mutation.
pub(crate) struct Snapshot {
    targets: Vec<NodeId>,
    attributes: Vec<AttributeId>,
    visible: Vec<Vec<VisibleRule>>,
    compare_values: bool,
}

impl Snapshot {
    /// Treat a rule whose cell was swapped for one holding an equal value
    /// as unchanged.
    fn comparing_values(mut self) -> Self {
        self.compare_values = true;
        self
    }
}

impl CascadeGraph {
    /// Insert `parent` into the dependency list of `node`.
    ///
    /// `after == None` inserts at the front (highest priority); otherwise
    /// `parent` goes right after `after`, which must already be a
    /// dependency. Every rule that becomes visible downstream is reported
    /// as [`ChangeKind::Visible`], every rule the new parent now shadows as
    /// [`ChangeKind::Hidden`].
    pub fn add_dependency(
        &mut self,
        node: NodeId,
        parent: NodeId,
        after: Option<NodeId>,
    ) -> Result<()> {
        self.check_edge(node, parent)?;
        let parents = &self.node(node)?.parents;
        if parents.contains(&parent) {
            return Err(Error::invalid_argument(format!(
                "{parent:?} is already a dependency of {node:?}"
            )));
        }
        let index = match after {
            None => 0,
            Some(after) => parents
                .iter()
                .position(|p| *p == after)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    Error::invalid_argument(format!("{after:?} is not a dependency of {node:?}"))
                })?,
        };
        self.check_cycle(node, parent)?;

        let attributes = self.effective_attribute_ids(parent);
        let before = self.snapshot(self.descendants_inclusive(&[node]), attributes);
        self.node_mut(node)?.parents.insert(index, parent);
        self.node_mut(parent)?.dependents.push(node);
        tracing::debug!(target: targets::CHAIN, ?node, ?parent, index, "added dependency");

        self.queue_changes(before);
        self.flush();
        Ok(())
    }

    /// Remove `parent` from the dependency list of `node`.
    ///
    /// Rules that were visible only through `parent` are reported as
    /// [`ChangeKind::Hidden`]; rules it used to shadow come back as
    /// [`ChangeKind::Visible`].
    pub fn remove_dependency(&mut self, node: NodeId, parent: NodeId) -> Result<()> {
        let index = self.dependency_index(node, parent)?;

        let attributes = self.effective_attribute_ids(parent);
        let before = self.snapshot(self.descendants_inclusive(&[node]), attributes);
        self.node_mut(node)?.parents.remove(index);
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.dependents.retain(|d| *d != node);
        }
        tracing::debug!(target: targets::CHAIN, ?node, ?parent, "removed dependency");

        self.queue_changes(before);
        self.flush();
        Ok(())
    }

    /// Re-point the dependency on `old` to `new`, keeping its position.
    ///
    /// Only attributes that either side defines are examined, and only
    /// rules whose visibility or value actually changes are reported.
    pub fn replace_dependency(&mut self, node: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        let index = self.dependency_index(node, old)?;
        if old == new {
            return Ok(());
        }
        self.check_edge(node, new)?;
        if self.node(node)?.parents.contains(&new) {
            return Err(Error::invalid_argument(format!(
                "{new:?} is already a dependency of {node:?}"
            )));
        }
        self.check_cycle(node, new)?;

        let mut attributes = self.effective_attribute_ids(old);
        for attribute in self.effective_attribute_ids(new) {
            if !attributes.contains(&attribute) {
                attributes.push(attribute);
            }
        }
        let before = self
            .snapshot(self.descendants_inclusive(&[node]), attributes)
            .comparing_values();
        self.node_mut(node)?.parents[index] = new;
        if let Some(old) = self.nodes.get_mut(old) {
            old.dependents.retain(|d| *d != node);
        }
        self.node_mut(new)?.dependents.push(node);
        tracing::debug!(target: targets::CHAIN, ?node, ?old, ?new, "replaced dependency");

        self.queue_changes(before);
        self.flush();
        Ok(())
    }

    /// Rules for `attribute` visible from `node`, in walk order.
    pub(crate) fn visible_rules(&self, node: NodeId, attribute: AttributeId) -> Vec<VisibleRule> {
        let mut seen: Vec<RuleCondition> = Vec::new();
        let mut visible = Vec::new();
        for owner in self.walk(node) {
            let locals = self.local_rules(owner, attribute);
            for rule in &locals {
                if !seen.iter().any(|s| shadows(s, &rule.condition)) {
                    visible.push(VisibleRule {
                        condition: rule.condition.clone(),
                        owner,
                        cell: Arc::clone(&rule.cell),
                    });
                }
            }
            seen.extend(locals.into_iter().map(|r| r.condition));
        }
        visible
    }

    /// Nodes on the chain of `start`, depth first, each once.
    pub(crate) fn walk(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(data) = self.nodes.get(id) else {
                if self.config.liveness_checks {
                    tracing::error!(target: targets::CHAIN, node = ?id, "dangling dependency");
                    panic!("cascade chain of {start:?} reaches destroyed node {id:?}");
                }
                continue;
            };
            order.push(id);
            stack.extend(data.parents.iter().rev().copied());
        }
        order
    }

    /// `roots` and every node that transitively depends on one of them.
    pub(crate) fn descendants_inclusive(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: std::collections::VecDeque<NodeId> = roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(data) = self.nodes.get(id) {
                queue.extend(data.dependents.iter().copied());
            }
        }
        out
    }

    /// Capture what a change to `owner`'s rules under `condition` can affect.
    ///
    /// For a sheet, only projections whose filter accepts `condition` are
    /// followed.
    pub(crate) fn local_snapshot(
        &self,
        owner: NodeId,
        attribute: AttributeId,
        condition: &RuleCondition,
    ) -> Snapshot {
        self.snapshot(self.local_targets(owner, condition), vec![attribute])
    }

    fn local_targets(&self, owner: NodeId, condition: &RuleCondition) -> Vec<NodeId> {
        let Some(data) = self.nodes.get(owner) else {
            return Vec::new();
        };
        if data.kind != NodeKind::StyleSheet {
            return self.descendants_inclusive(&[owner]);
        }
        let accepting: Vec<NodeId> = data
            .dependents
            .iter()
            .copied()
            .filter(|p| {
                self.nodes
                    .get(*p)
                    .and_then(|d| d.filter.as_ref())
                    .is_some_and(|f| f.accepts(condition))
            })
            .collect();
        let mut targets = vec![owner];
        targets.extend(self.descendants_inclusive(&accepting));
        targets
    }

    pub(crate) fn snapshot(&self, targets: Vec<NodeId>, attributes: Vec<AttributeId>) -> Snapshot {
        let visible = targets
            .iter()
            .flat_map(|t| attributes.iter().map(|a| self.visible_rules(*t, *a)))
            .collect();
        Snapshot {
            targets,
            attributes,
            visible,
            compare_values: false,
        }
    }

    /// Compare `before` with the current visible rules and queue the events.
    pub(crate) fn queue_changes(&mut self, before: Snapshot) {
        let Snapshot {
            targets,
            attributes,
            visible,
            compare_values,
        } = before;
        let mut previous = visible.into_iter();
        let mut events = Vec::new();
        for node in &targets {
            for attribute in &attributes {
                let before = previous.next().unwrap_or_default();
                let after = self.visible_rules(*node, *attribute);
                diff(*node, *attribute, &before, &after, compare_values, &mut events);
            }
        }
        self.queue_invalidation(&targets, &attributes);
        for event in events {
            self.queue_event(event);
        }
    }

    /// Report an in-place value change of `owner`'s rule under `condition`
    /// to every node that sees that rule.
    pub(crate) fn queue_value_changed(
        &mut self,
        owner: NodeId,
        attribute: AttributeId,
        condition: &RuleCondition,
    ) {
        let Some(cell) = self.nodes.get(owner).and_then(|data| {
            data.rules
                .get(attribute)
                .iter()
                .find(|r| &r.condition == condition)
                .map(|r| Arc::clone(&r.cell))
        }) else {
            return;
        };

        let targets = self.local_targets(owner, condition);
        let mut events = Vec::new();
        for node in targets.iter().copied() {
            if let Some(rule) = self
                .visible_rules(node, attribute)
                .into_iter()
                .find(|v| v.cell.same_cell(&*cell))
            {
                events.push(CascadeEvent {
                    node,
                    kind: ChangeKind::Changed,
                    attribute,
                    condition: rule.condition,
                    owner: rule.owner,
                });
            }
        }
        self.queue_invalidation(&targets, &[attribute]);
        for event in events {
            self.queue_event(event);
        }
    }

    /// Tell memoizing readers of every target that `attributes` may resolve
    /// differently, shadowed or not.
    fn queue_invalidation(&mut self, targets: &[NodeId], attributes: &[AttributeId]) {
        for node in targets {
            let Some(data) = self.nodes.get(*node) else {
                continue;
            };
            if data.invalidated.connection_count() == 0 {
                continue;
            }
            let signal = Arc::clone(&data.invalidated);
            let attributes = attributes.to_vec();
            self.pending.push(Box::new(move || {
                for attribute in attributes {
                    signal.emit(attribute);
                }
            }));
        }
    }

    fn queue_event(&mut self, event: CascadeEvent) {
        let Some(data) = self.nodes.get(event.node) else {
            return;
        };
        let signal = Arc::clone(&data.events);
        tracing::trace!(target: targets::CHAIN, %event, node = ?event.node, "queued change event");
        self.pending.push(Box::new(move || signal.emit(event)));
    }

    /// Union of local attributes over the chain of `node`.
    pub(crate) fn effective_attribute_ids(&self, node: NodeId) -> Vec<AttributeId> {
        let mut attributes = Vec::new();
        for owner in self.walk(node) {
            for attribute in self.local_attribute_ids(owner) {
                if !attributes.contains(&attribute) {
                    attributes.push(attribute);
                }
            }
        }
        attributes
    }

    fn dependency_index(&self, node: NodeId, parent: NodeId) -> Result<usize> {
        self.node(node)?
            .parents
            .iter()
            .position(|p| *p == parent)
            .ok_or_else(|| {
                Error::invalid_argument(format!("{parent:?} is not a dependency of {node:?}"))
            })
    }

    fn check_edge(&self, node: NodeId, parent: NodeId) -> Result<()> {
        let child_kind = self.node(node)?.kind;
        let parent_kind = self.node(parent)?.kind;
        if node == parent {
            tracing::warn!(target: targets::CHAIN, ?node, "refusing self dependency");
            return Err(Error::CycleDetected { node, parent });
        }
        if child_kind != NodeKind::Plain {
            return Err(Error::invalid_argument(
                "only plain cascade nodes can have dependencies",
            ));
        }
        if parent_kind == NodeKind::StyleSheet {
            return Err(Error::invalid_argument(
                "style sheets are reached through projections, not direct dependencies",
            ));
        }
        Ok(())
    }

    fn check_cycle(&self, node: NodeId, parent: NodeId) -> Result<()> {
        if self.walk(parent).contains(&node) {
            tracing::warn!(target: targets::CHAIN, ?node, ?parent, "refusing dependency cycle");
            return Err(Error::CycleDetected { node, parent });
        }
        Ok(())
    }
}

fn diff(
    node: NodeId,
    attribute: AttributeId,
    before: &[VisibleRule],
    after: &[VisibleRule],
    compare_values: bool,
    events: &mut Vec<CascadeEvent>,
) {
    let event = |kind, rule: &VisibleRule| CascadeEvent {
        node,
        kind,
        attribute,
        condition: rule.condition.clone(),
        owner: rule.owner,
    };
    for old in before {
        match after.iter().find(|new| new.condition == old.condition) {
            None => events.push(event(ChangeKind::Hidden, old)),
            Some(new) if new.cell.same_cell(&*old.cell) => {}
            Some(new) if compare_values && new.cell.value_eq(&*old.cell) => {}
            Some(new) => events.push(event(ChangeKind::Changed, new)),
        }
    }
    for new in after {
        if !before.iter().any(|old| old.condition == new.condition) {
            events.push(event(ChangeKind::Visible, new));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use horizon_cascade_core::ConnectionGuard;
    use parking_lot::Mutex;

    use super::*;
    use crate::attribute::{Attribute, AttributeRegistry};
    use crate::condition::Condition;
    use crate::state::{StateSet, states};

    struct Fixture {
        graph: CascadeGraph,
        width: Attribute<u32>,
    }

    fn fixture() -> Fixture {
        let mut registry = AttributeRegistry::new();
        let width = registry.register("layout", "width", 0_u32).unwrap();
        Fixture {
            graph: CascadeGraph::new(),
            width,
        }
    }

    fn record(
        graph: &CascadeGraph,
        node: NodeId,
    ) -> (Arc<Mutex<Vec<CascadeEvent>>>, ConnectionGuard<CascadeEvent>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let guard = graph
            .subscribe(node, move |e| sink.lock().push(e.clone()))
            .unwrap();
        (events, guard)
    }

    #[test]
    fn walk_is_depth_first_and_visits_once() {
        let Fixture { mut graph, .. } = fixture();
        let n = graph.create_node("n");
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let c = graph.create_node("c");
        graph.add_dependency(a, c, None).unwrap();
        graph.add_dependency(b, c, None).unwrap();
        graph.add_dependency(n, b, None).unwrap();
        graph.add_dependency(n, a, None).unwrap();

        assert_eq!(graph.dependencies(n).unwrap(), &[a, b]);
        assert_eq!(graph.walk(n), vec![n, a, c, b]);
    }

    #[test]
    fn after_positions_and_unknown_after() {
        let Fixture { mut graph, .. } = fixture();
        let n = graph.create_node("n");
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let c = graph.create_node("c");
        graph.add_dependency(n, a, None).unwrap();
        graph.add_dependency(n, b, Some(a)).unwrap();
        graph.add_dependency(n, c, Some(a)).unwrap();
        assert_eq!(graph.dependencies(n).unwrap(), &[a, c, b]);

        let d = graph.create_node("d");
        let unrelated = graph.create_node("unrelated");
        let err = graph.add_dependency(n, d, Some(unrelated)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(graph.dependencies(n).unwrap(), &[a, c, b]);
        assert!(graph.dependents(d).unwrap().is_empty());
    }

    #[test]
    fn cycles_are_refused() {
        let Fixture { mut graph, .. } = fixture();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let c = graph.create_node("c");
        graph.add_dependency(a, b, None).unwrap();
        graph.add_dependency(b, c, None).unwrap();

        assert_eq!(
            graph.add_dependency(c, a, None),
            Err(Error::CycleDetected { node: c, parent: a })
        );
        assert_eq!(
            graph.add_dependency(a, a, None),
            Err(Error::CycleDetected { node: a, parent: a })
        );
        let d = graph.create_node("d");
        graph.add_dependency(c, d, None).unwrap();
        assert!(matches!(
            graph.replace_dependency(c, d, a),
            Err(Error::CycleDetected { .. })
        ));
        assert_eq!(graph.dependencies(c).unwrap(), &[d]);
    }

    #[test]
    fn shadowed_parent_change_is_silent() {
        let Fixture { mut graph, width } = fixture();
        let n = graph.create_node("n");
        let p1 = graph.create_node("p1");
        let p2 = graph.create_node("p2");
        graph.add_dependency(n, p1, None).unwrap();
        graph.add_dependency(p1, p2, None).unwrap();
        graph.set(p1, &width, RuleCondition::Always, 10).unwrap();
        graph.set(p2, &width, RuleCondition::Always, 20).unwrap();

        let (events, _guard) = record(&graph, n);
        graph.set(p2, &width, RuleCondition::Always, 21).unwrap();
        assert!(events.lock().is_empty());

        graph.set(p1, &width, RuleCondition::Always, 11).unwrap();
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Changed);
        assert_eq!(events[0].owner, p1);
    }

    #[test]
    fn narrower_rule_below_broader_one_is_shadowed() {
        let Fixture { mut graph, width } = fixture();
        let n = graph.create_node("n");
        let p = graph.create_node("p");
        graph.add_dependency(n, p, None).unwrap();
        graph.set(n, &width, Condition::state(states::PRESSED), 1).unwrap();

        let (events, _guard) = record(&graph, n);
        let narrow = Condition::state(states::PRESSED).and(Condition::state(states::FOCUSED));
        graph.set(p, &width, narrow, 2).unwrap();
        assert!(events.lock().is_empty());

        graph.set(p, &width, Condition::state(states::HOVERED), 3).unwrap();
        assert_eq!(events.lock().len(), 1);
        assert_eq!(events.lock()[0].kind, ChangeKind::Visible);
    }

    #[test]
    fn add_then_remove_is_symmetric() {
        let Fixture { mut graph, width } = fixture();
        let n = graph.create_node("n");
        let p = graph.create_node("p");
        graph.set(n, &width, Condition::state(states::PRESSED), 1).unwrap();
        graph.set(p, &width, RuleCondition::Always, 2).unwrap();
        graph.set(p, &width, Condition::state(states::PRESSED), 3).unwrap();
        graph.set(p, &width, Condition::state(states::HOVERED), 4).unwrap();

        let before: Vec<u32> = graph.get_effective(n, &width).unwrap().iter().map(|r| r.get()).collect();
        let (events, _guard) = record(&graph, n);

        graph.add_dependency(n, p, None).unwrap();
        {
            let added = events.lock();
            // The pressed rule of p is shadowed by n's own.
            assert_eq!(added.len(), 2);
            assert!(added.iter().all(|e| e.kind == ChangeKind::Visible && e.owner == p));
        }
        graph.remove_dependency(n, p).unwrap();

        let events = events.lock();
        let visible = events.iter().filter(|e| e.kind == ChangeKind::Visible).count();
        let hidden = events.iter().filter(|e| e.kind == ChangeKind::Hidden).count();
        assert_eq!(visible, hidden);
        let after: Vec<u32> = graph.get_effective(n, &width).unwrap().iter().map(|r| r.get()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn remove_unknown_dependency_fails() {
        let Fixture { mut graph, .. } = fixture();
        let n = graph.create_node("n");
        let p = graph.create_node("p");
        assert!(matches!(
            graph.remove_dependency(n, p),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn replace_reports_only_real_differences() {
        let Fixture { mut graph, width } = fixture();
        let n = graph.create_node("n");
        let old = graph.create_node("old");
        let new = graph.create_node("new");
        graph.set(old, &width, RuleCondition::Always, 5).unwrap();
        graph.set(old, &width, Condition::state(states::PRESSED), 6).unwrap();
        graph.set(new, &width, RuleCondition::Always, 5).unwrap();
        graph.set(new, &width, Condition::state(states::FOCUSED), 7).unwrap();
        graph.add_dependency(n, old, None).unwrap();

        let (events, _guard) = record(&graph, n);
        graph.replace_dependency(n, old, new).unwrap();

        let events = events.lock();
        assert_eq!(events.len(), 2);
        let hidden = events.iter().find(|e| e.kind == ChangeKind::Hidden).unwrap();
        assert_eq!(hidden.owner, old);
        assert_eq!(hidden.condition, RuleCondition::from(Condition::state(states::PRESSED)));
        let visible = events.iter().find(|e| e.kind == ChangeKind::Visible).unwrap();
        assert_eq!(visible.owner, new);
        assert_eq!(graph.dependents(old).unwrap(), &[] as &[NodeId]);
        assert_eq!(graph.resolve_in(n, &width, &StateSet::new()), 5);
    }

    #[test]
    fn events_reach_transitive_dependents() {
        let Fixture { mut graph, width } = fixture();
        let leaf = graph.create_node("leaf");
        let mid = graph.create_node("mid");
        let root = graph.create_node("root");
        graph.add_dependency(leaf, mid, None).unwrap();
        graph.add_dependency(mid, root, None).unwrap();

        let (leaf_events, _g1) = record(&graph, leaf);
        let (root_events, _g2) = record(&graph, root);
        graph.set(root, &width, RuleCondition::Always, 1).unwrap();
        assert_eq!(leaf_events.lock().len(), 1);
        assert_eq!(leaf_events.lock()[0].node, leaf);
        assert_eq!(root_events.lock().len(), 1);
    }
}
