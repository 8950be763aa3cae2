//! Rules and per-node rule storage.

mod local;
mod rule;

pub(crate) use local::{CellNotification, LocalRules, SetOutcome};
pub(crate) use rule::{CellWatch, ErasedCell, StoredRule};
pub use rule::Rule;
