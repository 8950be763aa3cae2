//! Resolution of attribute values for a live element state.
//!
//! [`CascadeGraph::resolve_in`](crate::graph::CascadeGraph::resolve_in)
//! answers one-off queries. A [`StatefulView`] binds a node to the element's
//! current states, memoizes answers and reports when they may have changed;
//! it is what layout, text and rendering code reads from.

mod memo;
mod view;

pub use view::StatefulView;
