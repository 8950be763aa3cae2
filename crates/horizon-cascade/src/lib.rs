//! Reactive style cascade for Horizon widgets.
//!
//! This crate resolves the effective value of a style attribute for a
//! widget from rules spread over many places, and tells interested parties
//! when that value may have changed:
//!
//! - **Attributes**: typed, registered style keys with defaults and validators
//! - **Conditions**: state expressions ranked by specificity, plus style-sheet
//!   conditions scoped to a group and an element type
//! - **Cascade graph**: nodes holding local rules, chained by ordered
//!   dependency edges, with precise visibility-change events
//! - **Group trees**: per-group type hierarchies that expose style sheets to
//!   the widgets in the group
//! - **Stateful views**: memoized resolution for a widget's live states
//!
//! # Example
//!
//! ```
//! use horizon_cascade::prelude::*;
//!
//! let mut types = TypeRegistry::new("Widget");
//! let button = types.register("Button", types.universal()).unwrap();
//!
//! let mut registry = AttributeRegistry::new();
//! let color = registry.register("paint", "color", 0x000000_u32).unwrap();
//!
//! let graph = SharedCascadeGraph::new();
//! let sheet = graph.mutate(|g| g.create_sheet("theme"));
//! graph
//!     .mutate(|g| {
//!         g.set(
//!             sheet,
//!             &color,
//!             SheetCondition::new().for_type(button).when(Condition::state(states::PRESSED)),
//!             0xff0000,
//!         )
//!     })
//!     .unwrap();
//!
//! let mut tree = graph.mutate(|g| GroupTree::new(g, &types, None));
//! graph.mutate(|g| tree.attach_sheet(g, &types, sheet)).unwrap();
//!
//! let mut ok = ElementStyle::new(&graph, "ok", button).unwrap();
//! ok.join_group(&mut tree, &types).unwrap();
//!
//! assert_eq!(ok.resolve(&color), 0x000000);
//! ok.add_state(states::PRESSED);
//! assert_eq!(ok.resolve(&color), 0xff0000);
//! ```

pub mod attribute;
pub mod condition;
pub mod config;
pub mod debug;
pub mod element;
pub mod element_type;
mod error;
pub mod graph;
pub mod group;
pub mod projection;
pub mod resolve;
mod rules;
pub mod state;

pub use error::{Error, Result};
pub use rules::Rule;

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::attribute::{Attribute, AttributeId, AttributeRegistry, AttributeValue};
    pub use crate::condition::{Condition, RuleCondition, SheetCondition};
    pub use crate::config::CascadeConfig;
    pub use crate::element::ElementStyle;
    pub use crate::element_type::{ElementType, TypeRegistry};
    pub use crate::graph::{
        CascadeEvent, CascadeGraph, ChangeKind, NodeId, NodeKind, SharedCascadeGraph,
    };
    pub use crate::group::{GroupNodeId, GroupTree};
    pub use crate::resolve::StatefulView;
    pub use crate::state::{StateName, StateSet, states};
    pub use crate::{Error, Result, Rule};
}
