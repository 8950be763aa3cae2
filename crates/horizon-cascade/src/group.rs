//! Group trees: per-type refinements of a named group.
//!
//! A widget in group `"toolbar"` should see the sheet rules for
//! `.toolbar<Widget>`, `.toolbar<Button>` and `.toolbar<Checkbox>` when it is
//! a checkbox, the most specific first. A [`GroupTree`] keeps one cascade
//! node per element type the group has seen, arranged along the type
//! hierarchy: every node depends on the projections of the attached sheets
//! for its own type (and for intermediate types no tree node stands for), and
//! then on its tree parent's node.
//!
//! Children of a tree node always have strict subtypes of its type, and
//! never overlap. Inserting a type between a node and some of its children
//! re-parents those children; their dependency edge is re-pointed in place.

use horizon_cascade_core::logging::targets;
use slotmap::{SlotMap, new_key_type};

use crate::element_type::{ElementType, TypeRegistry};
use crate::graph::{CascadeGraph, NodeId};
use crate::{Error, Result};

new_key_type! {
    /// Handle to a node of a [`GroupTree`].
    pub struct GroupNodeId;
}

#[derive(Debug)]
struct SheetProjection {
    sheet: NodeId,
    element_type: ElementType,
    node: NodeId,
}

#[derive(Debug)]
struct GroupTreeNode {
    element_type: ElementType,
    parent: Option<GroupNodeId>,
    children: Vec<GroupNodeId>,
    cascade: NodeId,
    /// In dependency order: deepest type first, later sheets first within
    /// a type.
    projections: Vec<SheetProjection>,
    members: Vec<NodeId>,
}

/// The per-type refinements of one group (or of the ungrouped elements).
#[derive(Debug)]
pub struct GroupTree {
    group: Option<String>,
    nodes: SlotMap<GroupNodeId, GroupTreeNode>,
    root: GroupNodeId,
    sheets: Vec<NodeId>,
}

impl GroupTree {
    /// A tree for `group` rooted at the universal element type.
    pub fn new(graph: &mut CascadeGraph, types: &TypeRegistry, group: Option<&str>) -> Self {
        Self::with_root_type(graph, types, group, types.universal())
    }

    /// A tree for `group` that only accepts subtypes of `root_type`.
    pub fn with_root_type(
        graph: &mut CascadeGraph,
        types: &TypeRegistry,
        group: Option<&str>,
        root_type: ElementType,
    ) -> Self {
        let cascade = graph.create_node(label(group, types, root_type));
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(GroupTreeNode {
            element_type: root_type,
            parent: None,
            children: Vec::new(),
            cascade,
            projections: Vec::new(),
            members: Vec::new(),
        });
        Self {
            group: group.map(str::to_owned),
            nodes,
            root,
            sheets: Vec::new(),
        }
    }

    /// The group name, `None` for the ungrouped tree.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The root node.
    pub fn root(&self) -> GroupNodeId {
        self.root
    }

    /// Number of tree nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Element type of a tree node.
    pub fn element_type(&self, id: GroupNodeId) -> Option<ElementType> {
        self.nodes.get(id).map(|n| n.element_type)
    }

    /// Cascade node of a tree node.
    pub fn cascade_node(&self, id: GroupNodeId) -> Option<NodeId> {
        self.nodes.get(id).map(|n| n.cascade)
    }

    /// Tree parent, `None` for the root.
    pub fn parent(&self, id: GroupNodeId) -> Option<GroupNodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of a tree node.
    pub fn children(&self, id: GroupNodeId) -> &[GroupNodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Sheets attached to this tree, in attach order.
    pub fn sheets(&self) -> &[NodeId] {
        &self.sheets
    }

    /// Find or create the node for exactly `ty`.
    ///
    /// Fails with [`Error::TypeMismatch`] if `ty` is not a subtype of the
    /// root type.
    pub fn insert_exact_type(
        &mut self,
        graph: &mut CascadeGraph,
        types: &TypeRegistry,
        ty: ElementType,
    ) -> Result<GroupNodeId> {
        let root_type = self.nodes[self.root].element_type;
        if !types.is_subtype_of(ty, root_type) {
            return Err(Error::type_mismatch(types.name(root_type), types.name(ty)));
        }

        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            if node.element_type == ty {
                return Ok(current);
            }
            if let Some(next) = self.child_containing(types, current, ty) {
                current = next;
                continue;
            }
            let adopted: Vec<GroupNodeId> = node
                .children
                .iter()
                .copied()
                .filter(|c| types.is_strict_subtype_of(self.nodes[*c].element_type, ty))
                .collect();
            return self.create_node(graph, types, current, ty, adopted);
        }
    }

    /// The deepest node whose type is `ty` or a supertype of it. Never
    /// mutates the tree.
    pub fn find_nearest(&self, types: &TypeRegistry, ty: ElementType) -> GroupNodeId {
        let mut current = self.root;
        while let Some(next) = self.child_containing(types, current, ty) {
            current = next;
        }
        current
    }

    /// The node for exactly `ty`, if the tree has one.
    pub fn find_exact(&self, types: &TypeRegistry, ty: ElementType) -> Option<GroupNodeId> {
        let nearest = self.find_nearest(types, ty);
        (self.nodes[nearest].element_type == ty).then_some(nearest)
    }

    /// Record `member` as an element of exact type `ty`, creating the type's
    /// node if needed.
    pub fn add_member(
        &mut self,
        graph: &mut CascadeGraph,
        types: &TypeRegistry,
        ty: ElementType,
        member: NodeId,
    ) -> Result<GroupNodeId> {
        let id = self.insert_exact_type(graph, types, ty)?;
        let members = &mut self.nodes[id].members;
        if !members.contains(&member) {
            members.push(member);
            tracing::debug!(target: targets::GROUP, group = ?self.group, ?member, "added group member");
        }
        Ok(id)
    }

    /// Forget `member` under exact type `ty`. Returns `false` if it was not
    /// recorded there.
    pub fn remove_member(&mut self, types: &TypeRegistry, ty: ElementType, member: NodeId) -> bool {
        let Some(id) = self.find_exact(types, ty) else {
            return false;
        };
        let members = &mut self.nodes[id].members;
        let before = members.len();
        members.retain(|m| *m != member);
        before != members.len()
    }

    /// Returns `true` if `member` is recorded under exact type `ty`.
    pub fn is_member(&self, types: &TypeRegistry, ty: ElementType, member: NodeId) -> bool {
        self.find_exact(types, ty)
            .is_some_and(|id| self.nodes[id].members.contains(&member))
    }

    /// Members recorded on `id` itself.
    pub fn members(&self, id: GroupNodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.members.as_slice())
    }

    /// Members of `id` and of every refinement below it.
    pub fn members_recursive(&self, id: GroupNodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.extend(node.members.iter().copied());
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Feed the rules of `sheet` into every node of the tree, including
    /// nodes created later. Sheets attached later take precedence over
    /// earlier ones for equal conditions.
    pub fn attach_sheet(
        &mut self,
        graph: &mut CascadeGraph,
        types: &TypeRegistry,
        sheet: NodeId,
    ) -> Result<()> {
        if self.sheets.contains(&sheet) {
            return Err(Error::invalid_argument(format!(
                "{sheet:?} is already attached to this group tree"
            )));
        }
        let ids: Vec<GroupNodeId> = self.nodes.keys().collect();
        for id in ids {
            for level in self.type_range(types, id) {
                self.add_projection(graph, id, sheet, level)?;
            }
        }
        self.sheets.push(sheet);
        tracing::debug!(target: targets::GROUP, group = ?self.group, ?sheet, "attached sheet");
        Ok(())
    }

    /// Undo [`attach_sheet`](Self::attach_sheet), destroying the projections.
    pub fn detach_sheet(&mut self, graph: &mut CascadeGraph, sheet: NodeId) -> Result<()> {
        let Some(position) = self.sheets.iter().position(|s| *s == sheet) else {
            return Err(Error::invalid_argument(format!(
                "{sheet:?} is not attached to this group tree"
            )));
        };
        for node in self.nodes.values_mut() {
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut node.projections)
                .into_iter()
                .partition(|p| p.sheet == sheet);
            node.projections = kept;
            for projection in removed {
                release_projection(graph, node.cascade, projection)?;
            }
        }
        self.sheets.remove(position);
        tracing::debug!(target: targets::GROUP, group = ?self.group, ?sheet, "detached sheet");
        Ok(())
    }

    /// Remove every cascade node the tree created.
    ///
    /// Fails while a node outside the tree still depends on one of them. In
    /// that case nothing is removed and the tree is handed back.
    pub fn destroy(self, graph: &mut CascadeGraph) -> std::result::Result<(), (Self, Error)> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().copied());
        }
        if let Err(err) = self.check_removable(graph) {
            tracing::warn!(target: targets::GROUP, group = ?self.group, %err, "group tree still in use");
            return Err((self, err));
        }

        // Children first: they depend on their parents.
        for id in order.into_iter().rev() {
            let node = &self.nodes[id];
            let owned = std::iter::once(node.cascade).chain(node.projections.iter().map(|p| p.node));
            for owned_node in owned {
                if let Err(err) = graph.remove_node(owned_node) {
                    tracing::error!(target: targets::GROUP, node = ?owned_node, %err, "failed to remove group tree node");
                }
            }
        }
        tracing::debug!(target: targets::GROUP, group = ?self.group, "destroyed group tree");
        Ok(())
    }

    /// Every cascade node of the tree is live and only depended on from
    /// inside the tree.
    fn check_removable(&self, graph: &CascadeGraph) -> Result<()> {
        let owned: Vec<NodeId> = self
            .nodes
            .values()
            .flat_map(|n| std::iter::once(n.cascade).chain(n.projections.iter().map(|p| p.node)))
            .collect();
        for node in &owned {
            let outside = graph
                .dependents(*node)?
                .iter()
                .filter(|d| !owned.contains(*d))
                .count();
            if outside > 0 {
                return Err(Error::invalid_argument(format!(
                    "group tree node {node:?} still has {outside} dependents outside the tree"
                )));
            }
        }
        Ok(())
    }

    fn child_containing(
        &self,
        types: &TypeRegistry,
        id: GroupNodeId,
        ty: ElementType,
    ) -> Option<GroupNodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|c| types.is_subtype_of(ty, self.nodes[*c].element_type))
    }

    /// Types whose sheet rules node `id` contributes: its own type and every
    /// supertype strictly below its parent's type.
    fn type_range(&self, types: &TypeRegistry, id: GroupNodeId) -> Vec<ElementType> {
        let node = &self.nodes[id];
        let floor = node.parent.map(|p| self.nodes[p].element_type);
        let mut range = vec![node.element_type];
        let mut current = node.element_type;
        while let Some(parent) = types.parent(current) {
            if Some(parent) == floor {
                break;
            }
            range.push(parent);
            current = parent;
        }
        if floor.is_none() {
            range.truncate(1);
        }
        range
    }

    fn add_projection(
        &mut self,
        graph: &mut CascadeGraph,
        id: GroupNodeId,
        sheet: NodeId,
        ty: ElementType,
    ) -> Result<()> {
        let projection = graph.create_projection(sheet, self.group.as_deref(), Some(ty))?;
        let node = &mut self.nodes[id];
        let index = node
            .projections
            .iter()
            .position(|p| p.element_type.depth() <= ty.depth())
            .unwrap_or(node.projections.len());
        let after = index.checked_sub(1).map(|i| node.projections[i].node);
        if let Err(err) = graph.add_dependency(node.cascade, projection, after) {
            graph.remove_node(projection)?;
            return Err(err);
        }
        node.projections.insert(
            index,
            SheetProjection {
                sheet,
                element_type: ty,
                node: projection,
            },
        );
        Ok(())
    }

    fn create_node(
        &mut self,
        graph: &mut CascadeGraph,
        types: &TypeRegistry,
        parent: GroupNodeId,
        ty: ElementType,
        adopted: Vec<GroupNodeId>,
    ) -> Result<GroupNodeId> {
        let parent_cascade = self.nodes[parent].cascade;
        let cascade = graph.create_node(label(self.group.as_deref(), types, ty));
        graph.add_dependency(cascade, parent_cascade, None)?;

        let id = self.nodes.insert(GroupTreeNode {
            element_type: ty,
            parent: Some(parent),
            children: adopted.clone(),
            cascade,
            projections: Vec::new(),
            members: Vec::new(),
        });
        self.nodes[parent].children.retain(|c| !adopted.contains(c));
        self.nodes[parent].children.push(id);

        for sheet in self.sheets.clone() {
            for level in self.type_range(types, id) {
                self.add_projection(graph, id, sheet, level)?;
            }
        }

        for child in adopted {
            let node = &mut self.nodes[child];
            node.parent = Some(id);
            graph.replace_dependency(node.cascade, parent_cascade, cascade)?;
            // The new node now supplies the rules for `ty` and above.
            let (redundant, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut node.projections)
                .into_iter()
                .partition(|p| p.element_type.depth() <= ty.depth());
            node.projections = kept;
            for projection in redundant {
                release_projection(graph, node.cascade, projection)?;
            }
        }

        tracing::debug!(
            target: targets::GROUP,
            group = ?self.group,
            element_type = types.name(ty),
            children = self.nodes[id].children.len(),
            "inserted group tree node"
        );
        Ok(id)
    }
}

fn release_projection(
    graph: &mut CascadeGraph,
    cascade: NodeId,
    projection: SheetProjection,
) -> Result<()> {
    graph.remove_dependency(cascade, projection.node)?;
    graph.remove_node(projection.node)
}

fn label(group: Option<&str>, types: &TypeRegistry, ty: ElementType) -> String {
    format!(".{}<{}>", group.unwrap_or("*"), types.name(ty))
}
