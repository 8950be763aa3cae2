//! Text dumps of cascade chains and group trees.
//!
//! Useful when a widget resolves to an unexpected value: the chain dump
//! shows every node that contributes, in precedence order, together with
//! its local rules.
//!
//! ```
//! use horizon_cascade::attribute::AttributeRegistry;
//! use horizon_cascade::condition::RuleCondition;
//! use horizon_cascade::debug::{CascadeTreeDebug, TreeFormatOptions};
//! use horizon_cascade::graph::CascadeGraph;
//!
//! let mut registry = AttributeRegistry::new();
//! let size = registry.register("text", "size", 12_u32).unwrap();
//!
//! let mut graph = CascadeGraph::new();
//! let window = graph.create_node("window");
//! let label = graph.create_node("label");
//! graph.add_dependency(label, window, None).unwrap();
//! graph.set(window, &size, RuleCondition::Always, 14).unwrap();
//!
//! let dump = CascadeTreeDebug::with_options(TreeFormatOptions::detailed())
//!     .with_registry(&registry)
//!     .format_chain(&graph, label)
//!     .unwrap();
//! assert!(dump.contains("window"));
//! assert!(dump.contains("text.size"));
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::Result;
use crate::attribute::{AttributeId, AttributeRegistry};
use crate::condition::sort_by_specificity;
use crate::element_type::TypeRegistry;
use crate::graph::{CascadeGraph, NodeId, NodeKind};
use crate::group::{GroupNodeId, GroupTree};

/// Style for drawing tree branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters: `|`, `+--`, `\--`.
    Ascii,
    /// Unicode box-drawing characters: `│`, `├──`, `└──`.
    #[default]
    Unicode,
    /// Indentation only.
    Compact,
}

/// What to include in a dump.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch drawing style.
    pub style: TreeStyle,
    /// Show arena ids next to labels.
    pub show_ids: bool,
    /// Show node kinds (`sheet`, `projection`).
    pub show_kinds: bool,
    /// List each node's local rules.
    pub show_rules: bool,
    /// Stop descending below this depth.
    pub max_depth: Option<usize>,
    /// Spaces per indentation level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_kinds: true,
            show_rules: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything.
    pub fn detailed() -> Self {
        Self {
            show_ids: true,
            show_rules: true,
            ..Self::default()
        }
    }

    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            style: TreeStyle::Compact,
            show_kinds: false,
            ..Self::default()
        }
    }
}

/// Formats cascade chains and group trees as indented text.
#[derive(Debug, Clone, Default)]
pub struct CascadeTreeDebug<'a> {
    options: TreeFormatOptions,
    registry: Option<&'a AttributeRegistry>,
}

impl<'a> CascadeTreeDebug<'a> {
    /// A formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A formatter with the given options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self {
            options,
            registry: None,
        }
    }

    /// Print attribute names from `registry` instead of bare ids.
    pub fn with_registry(mut self, registry: &'a AttributeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The options in use.
    pub fn options(&self) -> &TreeFormatOptions {
        &self.options
    }

    /// Dump `node` and its dependencies, highest precedence first.
    ///
    /// A node reached a second time through another path is printed once
    /// more, marked `(seen)`, without its subtree.
    pub fn format_chain(&self, graph: &CascadeGraph, node: NodeId) -> Result<String> {
        graph.node(node)?;
        Ok(ChainDump {
            debug: self,
            graph,
            root: node,
        }
        .to_string())
    }

    /// Dump the shape of a group tree: element types, their cascade nodes
    /// and member counts.
    pub fn format_group_tree(&self, tree: &GroupTree, types: &TypeRegistry) -> String {
        GroupDump {
            debug: self,
            tree,
            types,
        }
        .to_string()
    }

    fn attribute_name(&self, attribute: AttributeId) -> String {
        self.registry
            .and_then(|r| r.info(attribute))
            .map(|info| format!("{}.{}", info.domain, info.name))
            .unwrap_or_else(|| format!("attr#{}", attribute.index()))
    }

    fn prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }
        let (pipe, branch, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "\\--"),
            TreeStyle::Unicode => ("│", "├──", "└──"),
            TreeStyle::Compact => ("", "- ", "- "),
        };
        let mut prefix = String::new();
        for _ in 1..depth {
            prefix.push_str(pipe);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { branch });
        prefix.push(' ');
        prefix
    }

    fn rule_indent(&self, depth: usize) -> String {
        " ".repeat((depth + 1) * (self.options.indent_size + 1))
    }
}

struct ChainDump<'d, 'g> {
    debug: &'d CascadeTreeDebug<'d>,
    graph: &'g CascadeGraph,
    root: NodeId,
}

impl ChainDump<'_, '_> {
    fn node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: NodeId,
        depth: usize,
        is_last: bool,
        seen: &mut HashSet<NodeId>,
    ) -> fmt::Result {
        let options = &self.debug.options;
        let Ok(data) = self.graph.node(node) else {
            return writeln!(f, "{}<dangling {node:?}>", self.debug.prefix(depth, is_last));
        };

        write!(f, "{}{}", self.debug.prefix(depth, is_last), data.label)?;
        if options.show_ids {
            write!(f, " {node:?}")?;
        }
        if options.show_kinds {
            match data.kind {
                NodeKind::Plain => {}
                NodeKind::StyleSheet => f.write_str(" (sheet)")?,
                NodeKind::Projection => f.write_str(" (projection)")?,
            }
        }
        if !seen.insert(node) {
            return writeln!(f, " (seen)");
        }
        writeln!(f)?;

        if options.show_rules {
            let indent = self.debug.rule_indent(depth);
            let mut attributes = self.graph.local_attribute_ids(node);
            attributes.sort();
            for attribute in attributes {
                let mut rules = self.graph.local_rules(node, attribute);
                sort_by_specificity(&mut rules, |r| &r.condition);
                for rule in rules {
                    writeln!(
                        f,
                        "{indent}{} [{}] = {}",
                        self.debug.attribute_name(attribute),
                        rule.condition,
                        rule.cell.debug_value()
                    )?;
                }
            }
        }

        if options.max_depth.is_some_and(|max| depth >= max) {
            return Ok(());
        }
        let parents = &data.parents;
        for (i, parent) in parents.iter().enumerate() {
            self.node(f, *parent, depth + 1, i + 1 == parents.len(), seen)?;
        }
        Ok(())
    }
}

impl fmt::Display for ChainDump<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node(f, self.root, 0, true, &mut HashSet::new())
    }
}

struct GroupDump<'d, 't> {
    debug: &'d CascadeTreeDebug<'d>,
    tree: &'t GroupTree,
    types: &'t TypeRegistry,
}

impl GroupDump<'_, '_> {
    fn node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: GroupNodeId,
        depth: usize,
        is_last: bool,
    ) -> fmt::Result {
        let type_name = self
            .tree
            .element_type(id)
            .map_or("?", |ty| self.types.name(ty));
        write!(f, "{}{type_name}", self.debug.prefix(depth, is_last))?;
        if self.debug.options.show_ids {
            if let Some(cascade) = self.tree.cascade_node(id) {
                write!(f, " {cascade:?}")?;
            }
        }
        let members = self.tree.members(id).len();
        if members > 0 {
            write!(f, " ({members} members)")?;
        }
        writeln!(f)?;

        if self.debug.options.max_depth.is_some_and(|max| depth >= max) {
            return Ok(());
        }
        let children = self.tree.children(id);
        for (i, child) in children.iter().enumerate() {
            self.node(f, *child, depth + 1, i + 1 == children.len())?;
        }
        Ok(())
    }
}

impl fmt::Display for GroupDump<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "group {}", self.tree.group().unwrap_or("*"))?;
        self.node(f, self.tree.root(), 0, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, SheetCondition};

    #[test]
    fn chain_lists_parents_in_order() {
        let mut registry = AttributeRegistry::new();
        let size = registry.register("text", "size", 12_u32).unwrap();
        let mut graph = CascadeGraph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let root = graph.create_node("root");
        let child = graph.create_node("child");
        graph.add_dependency(a, root, None).unwrap();
        graph.add_dependency(b, root, None).unwrap();
        graph.add_dependency(child, a, None).unwrap();
        graph.add_dependency(child, b, Some(a)).unwrap();
        graph
            .set(child, &size, Condition::state("pressed"), 20)
            .unwrap();

        let dump = CascadeTreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            show_rules: true,
            ..TreeFormatOptions::default()
        })
        .with_registry(&registry)
        .format_chain(&graph, child)
        .unwrap();

        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "child");
        assert!(lines[1].contains("text.size [pressed] = 20"));
        assert_eq!(lines[2], "+-- a");
        assert!(lines[3].ends_with("\\-- root"));
        assert_eq!(lines[4], "\\-- b");
        assert!(lines[5].ends_with("root (seen)"));
    }

    #[test]
    fn max_depth_and_unknown_node() {
        let mut graph = CascadeGraph::new();
        let root = graph.create_node("root");
        let child = graph.create_node("child");
        graph.add_dependency(child, root, None).unwrap();

        let shallow = CascadeTreeDebug::with_options(TreeFormatOptions {
            max_depth: Some(0),
            ..TreeFormatOptions::minimal()
        });
        assert_eq!(shallow.format_chain(&graph, child).unwrap(), "child\n");

        graph.remove_node(child).unwrap();
        assert!(shallow.format_chain(&graph, child).is_err());
    }

    #[test]
    fn sheets_and_projections_are_marked() {
        let mut types = TypeRegistry::new("Widget");
        let button = types.register("Button", types.universal()).unwrap();
        let mut registry = AttributeRegistry::new();
        let color = registry.register("paint", "color", 0_u32).unwrap();

        let mut graph = CascadeGraph::new();
        let sheet = graph.create_sheet("theme");
        graph
            .set(sheet, &color, SheetCondition::new().for_type(button), 7)
            .unwrap();
        let mut tree = GroupTree::new(&mut graph, &types, None);
        tree.attach_sheet(&mut graph, &types, sheet).unwrap();
        let member = graph.create_node("ok");
        tree.add_member(&mut graph, &types, button, member).unwrap();

        let group = CascadeTreeDebug::new().format_group_tree(&tree, &types);
        assert!(group.starts_with("group *\nWidget\n"));
        assert!(group.contains("└── Button (1 members)"));

        let button_node = tree
            .find_exact(&types, button)
            .and_then(|id| tree.cascade_node(id))
            .unwrap();
        let chain = CascadeTreeDebug::with_options(TreeFormatOptions::detailed())
            .format_chain(&graph, button_node)
            .unwrap();
        assert!(chain.contains("(projection)"));
        assert!(chain.contains(&format!("attr#{} [", color.id().index())));
        assert!(!chain.contains("(sheet)"));
    }
}
