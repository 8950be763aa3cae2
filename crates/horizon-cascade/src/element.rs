//! Binding of one widget to the cascade.

use horizon_cascade_core::ConnectionGuard;
use horizon_cascade_core::logging::targets;

use crate::attribute::{Attribute, AttributeId, AttributeValue};
use crate::condition::RuleCondition;
use crate::element_type::{ElementType, TypeRegistry};
use crate::graph::{NodeId, SharedCascadeGraph};
use crate::group::GroupTree;
use crate::resolve::StatefulView;
use crate::state::StateName;
use crate::{Error, Result};

/// The style of one widget.
///
/// Owns the widget's personal cascade node, whose dependencies are, in
/// order: the group tree nodes of every group the widget joined, then the
/// inherited node of its parent widget. Reads go through a
/// [`StatefulView`] bound to the widget's states.
#[derive(Debug)]
pub struct ElementStyle {
    graph: SharedCascadeGraph,
    node: NodeId,
    element_type: ElementType,
    groups: Vec<NodeId>,
    inherited: Option<NodeId>,
    view: StatefulView,
}

impl ElementStyle {
    /// Create the personal node for a widget of type `element_type`.
    pub fn new(
        graph: &SharedCascadeGraph,
        label: impl Into<String>,
        element_type: ElementType,
    ) -> Result<Self> {
        let label = label.into();
        let node = graph.mutate(|g| g.create_node(label));
        let view = StatefulView::new(graph, node)?;
        Ok(Self {
            graph: graph.clone(),
            node,
            element_type,
            groups: Vec::new(),
            inherited: None,
            view,
        })
    }

    /// The personal cascade node. Child widgets inherit from it.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Runtime type of the widget.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The view used for reads.
    pub fn view(&self) -> &StatefulView {
        &self.view
    }

    /// The inherited dependency, if any.
    pub fn inherited(&self) -> Option<NodeId> {
        self.inherited
    }

    /// Effective value of `attribute` for the widget's current states.
    pub fn resolve<T: AttributeValue>(&self, attribute: &Attribute<T>) -> T {
        self.view.resolve(attribute)
    }

    /// Set a personal rule.
    pub fn set<T: AttributeValue>(
        &self,
        attribute: &Attribute<T>,
        condition: impl Into<RuleCondition>,
        value: T,
    ) -> Result<()> {
        let condition = condition.into();
        self.graph.mutate(|g| g.set(self.node, attribute, condition, value))
    }

    /// Remove a personal rule.
    pub fn clear<T: AttributeValue>(
        &self,
        attribute: &Attribute<T>,
        condition: impl Into<RuleCondition>,
    ) -> Result<bool> {
        let condition = condition.into();
        self.graph.mutate(|g| g.clear(self.node, attribute, condition))
    }

    /// Activate a state.
    pub fn add_state(&self, state: impl Into<StateName>) {
        self.view.add_state(state);
    }

    /// Deactivate a state.
    pub fn remove_state(&self, state: &str) {
        self.view.remove_state(state);
    }

    /// Listen for attributes whose value may have changed.
    pub fn subscribe<F>(&self, listener: F) -> ConnectionGuard<AttributeId>
    where
        F: Fn(&AttributeId) + Send + Sync + 'static,
    {
        self.view.subscribe(listener)
    }

    /// Join the group `tree` stands for. Groups joined earlier take
    /// precedence.
    pub fn join_group(&mut self, tree: &mut GroupTree, types: &TypeRegistry) -> Result<()> {
        let after = self.groups.last().copied();
        let cascade = self.graph.mutate(|g| -> Result<NodeId> {
            let id = tree.add_member(g, types, self.element_type, self.node)?;
            let cascade = tree
                .cascade_node(id)
                .ok_or_else(|| Error::invalid_argument("group tree node vanished"))?;
            if self.groups.contains(&cascade) {
                return Err(Error::invalid_argument("element already joined this group"));
            }
            g.add_dependency(self.node, cascade, after)?;
            Ok(cascade)
        })?;
        self.groups.push(cascade);
        tracing::debug!(target: targets::GROUP, node = ?self.node, group = ?tree.group(), "element joined group");
        Ok(())
    }

    /// Leave the group `tree` stands for.
    pub fn leave_group(&mut self, tree: &mut GroupTree, types: &TypeRegistry) -> Result<()> {
        let cascade = tree
            .find_exact(types, self.element_type)
            .filter(|_| tree.is_member(types, self.element_type, self.node))
            .and_then(|id| tree.cascade_node(id))
            .ok_or_else(|| Error::invalid_argument("element is not a member of this group"))?;
        self.graph.mutate(|g| g.remove_dependency(self.node, cascade))?;
        tree.remove_member(types, self.element_type, self.node);
        self.groups.retain(|g| *g != cascade);
        tracing::debug!(target: targets::GROUP, node = ?self.node, group = ?tree.group(), "element left group");
        Ok(())
    }

    /// Re-point the inherited dependency, typically to the new parent
    /// widget's [`node`](Self::node). `None` detaches it.
    pub fn set_inherited(&mut self, parent: Option<NodeId>) -> Result<()> {
        let after = self.groups.last().copied();
        match (self.inherited, parent) {
            (Some(old), Some(new)) if old == new => return Ok(()),
            (Some(old), Some(new)) => {
                self.graph.mutate(|g| g.replace_dependency(self.node, old, new))?;
            }
            (None, Some(new)) => {
                self.graph.mutate(|g| g.add_dependency(self.node, new, after))?;
            }
            (Some(old), None) => {
                self.graph.mutate(|g| g.remove_dependency(self.node, old))?;
            }
            (None, None) => return Ok(()),
        }
        self.inherited = parent;
        Ok(())
    }

    /// Detach the inherited edge and destroy the personal node.
    ///
    /// Leave every group first. Fails while a child widget still inherits
    /// from this one.
    pub fn destroy(mut self) -> Result<()> {
        if !self.groups.is_empty() {
            return Err(Error::invalid_argument("element is still a member of a group"));
        }
        self.set_inherited(None)?;
        let node = self.node;
        self.graph.mutate(|g| g.remove_node(node))
    }
}
