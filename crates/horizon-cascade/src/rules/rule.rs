//! Single rule definition.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use horizon_cascade_core::ValueCell;

use crate::attribute::AttributeValue;
use crate::condition::RuleCondition;
use crate::graph::NodeId;

/// Keeps a [`ErasedCell::watch`] subscription alive.
pub(crate) type CellWatch = Box<dyn Any + Send + Sync>;

/// Type-erased view of a rule's value cell.
pub(crate) trait ErasedCell: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Same cell, not merely equal contents.
    fn same_cell(&self, other: &dyn ErasedCell) -> bool;

    /// Equal contents. Cells of different value types are never equal.
    fn value_eq(&self, other: &dyn ErasedCell) -> bool;

    /// Run `slot` after every write to the cell, until the returned handle
    /// is dropped.

    fn watch(&self, slot: Box<dyn Fn() + Send + Sync>) -> CellWatch;

    fn debug_value(&self) -> String;
}

impl<T: AttributeValue> ErasedCell for ValueCell<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_cell(&self, other: &dyn ErasedCell) -> bool {
        other
            .as_any()
            .downcast_ref::<ValueCell<T>>()
            .is_some_and(|o| self.ptr_eq(o))
    }

    fn value_eq(&self, other: &dyn ErasedCell) -> bool {
        other
            .as_any()
            .downcast_ref::<ValueCell<T>>()
            .is_some_and(|o| self.ptr_eq(o) || self.with(|a| o.with(|b| a == b)))
    }

    fn watch(&self, slot: Box<dyn Fn() + Send + Sync>) -> CellWatch {
        Box::new(self.subscribe(move |_| slot()))
    }

    fn debug_value(&self) -> String {
        self.with(|v| format!("{v:?}"))
    }
}

/// A rule as stored in a cascade node.
#[derive(Clone)]
pub(crate) struct StoredRule {
    pub(crate) condition: RuleCondition,
    pub(crate) cell: Arc<dyn ErasedCell>,
}

impl StoredRule {
    pub(crate) fn new<T: AttributeValue>(condition: RuleCondition, cell: ValueCell<T>) -> Self {
        Self {
            condition,
            cell: Arc::new(cell),
        }
    }

    pub(crate) fn typed_cell<T: AttributeValue>(&self) -> Option<&ValueCell<T>> {
        self.cell.as_any().downcast_ref::<ValueCell<T>>()
    }
}

impl fmt::Debug for StoredRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredRule")
            .field("condition", &self.condition)
            .field("value", &self.cell.debug_value())
            .finish()
    }
}

/// A (condition, value) pair, together with the node that holds it.
///
/// The value is the rule's live cell: reading it later observes any value
/// written to the rule in the meantime.
#[derive(Clone)]
pub struct Rule<T> {
    /// The condition gating this rule.
    pub condition: RuleCondition,
    /// The rule's value cell.
    pub value: ValueCell<T>,
    /// The cascade node that holds the rule locally.
    pub owner: NodeId,
}

impl<T: AttributeValue> Rule<T> {
    pub(crate) fn from_stored(stored: &StoredRule, owner: NodeId) -> Option<Self> {
        stored.typed_cell::<T>().map(|cell| Self {
            condition: stored.condition.clone(),
            value: cell.clone(),
            owner,
        })
    }

    /// Current value of the rule.
    pub fn get(&self) -> T {
        self.value.get()
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("condition", &self.condition)
            .field("value", &self.value)
            .field("owner", &self.owner)
            .finish()
    }
}
