//! Local rule storage of a cascade node.

use std::collections::HashMap;

use horizon_cascade_core::ValueCell;

use super::StoredRule;
use crate::attribute::{AttributeId, AttributeValue};
use crate::condition::{RuleCondition, sort_by_specificity};

/// What a `set` did to the local rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOutcome {
    /// A new rule was inserted.
    Inserted,
    /// An existing rule with an equal condition now has a different value.
    Replaced,
    /// An existing rule already had this exact value or cell.
    Unchanged,
}

#[derive(Debug, Default)]
struct AttributeRules {
    /// Insertion order.
    rules: Vec<StoredRule>,
    /// Indices into `rules`, most specific first. Rebuilt on every mutation.
    sorted: Vec<usize>,
}

impl AttributeRules {
    fn position(&self, condition: &RuleCondition) -> Option<usize> {
        self.rules.iter().position(|r| &r.condition == condition)
    }

    fn resort(&mut self) {
        let mut order: Vec<(usize, &RuleCondition)> =
            self.rules.iter().map(|r| &r.condition).enumerate().collect();
        sort_by_specificity(&mut order, |entry| entry.1);
        let sorted = order.into_iter().map(|(i, _)| i).collect();
        self.sorted = sorted;
    }
}

/// Rules held directly by one node, grouped by attribute.
#[derive(Debug, Default)]
pub(crate) struct LocalRules {
    by_attribute: HashMap<AttributeId, AttributeRules>,
}

/// Deferred notification for a cell whose value was replaced in place.
pub(crate) type CellNotification = Box<dyn FnOnce() + Send + Sync>;

impl LocalRules {
    /// Store `value` under `condition`.
    ///
    /// An existing rule with an equal condition keeps its cell and receives
    /// the new value; the cell's own subscribers are notified through the
    /// returned callback, which the caller runs once the mutation is
    /// complete.
    pub(crate) fn set_value<T: AttributeValue>(
        &mut self,
        attribute: AttributeId,
        condition: RuleCondition,
        value: T,
    ) -> (SetOutcome, Option<CellNotification>) {
        let entry = self.by_attribute.entry(attribute).or_default();
        if let Some(index) = entry.position(&condition) {
            let existing = &entry.rules[index];
            if let Some(cell) = existing.typed_cell::<T>() {
                if cell.with(|current| *current == value) {
                    return (SetOutcome::Unchanged, None);
                }
                cell.set_silent(value.clone());
                let cell = cell.clone();
                let notify: CellNotification = Box::new(move || cell.changed().emit(value));
                return (SetOutcome::Replaced, Some(notify));
            }
            // Same condition, different value type: only possible through a
            // foreign attribute id. Replace the cell outright.
            entry.rules[index] = StoredRule::new(condition, ValueCell::new(value));
            return (SetOutcome::Replaced, None);
        }

        entry.rules.push(StoredRule::new(condition, ValueCell::new(value)));
        entry.resort();
        (SetOutcome::Inserted, None)
    }

    /// Store an externally owned cell under `condition`.
    pub(crate) fn set_cell<T: AttributeValue>(
        &mut self,
        attribute: AttributeId,
        condition: RuleCondition,
        cell: ValueCell<T>,
    ) -> SetOutcome {
        let entry = self.by_attribute.entry(attribute).or_default();
        let incoming = StoredRule::new(condition, cell);
        if let Some(index) = entry.position(&incoming.condition) {
            let existing = &entry.rules[index];
            if existing.cell.same_cell(&*incoming.cell) {
                return SetOutcome::Unchanged;
            }
            // A different cell is a different rule, whatever it holds now.
            entry.rules[index] = incoming;
            return SetOutcome::Replaced;
        }

        entry.rules.push(incoming);
        entry.resort();
        SetOutcome::Inserted
    }

    /// Remove the rule stored under exactly `condition`.
    pub(crate) fn clear(
        &mut self,
        attribute: AttributeId,
        condition: &RuleCondition,
    ) -> Option<StoredRule> {
        let entry = self.by_attribute.get_mut(&attribute)?;
        let index = entry.position(condition)?;
        let removed = entry.rules.remove(index);
        if entry.rules.is_empty() {
            self.by_attribute.remove(&attribute);
        } else {
            entry.resort();
        }
        Some(removed)
    }

    /// Rules for `attribute` in insertion order.
    pub(crate) fn get(&self, attribute: AttributeId) -> &[StoredRule] {
        self.by_attribute
            .get(&attribute)
            .map_or(&[], |entry| entry.rules.as_slice())
    }

    /// Rules for `attribute`, most specific first.
    pub(crate) fn sorted(&self, attribute: AttributeId) -> impl Iterator<Item = &StoredRule> {
        self.by_attribute
            .get(&attribute)
            .into_iter()
            .flat_map(|entry| entry.sorted.iter().map(|i| &entry.rules[*i]))
    }

    /// Returns `true` if any rule is stored for `attribute`.
    pub(crate) fn contains(&self, attribute: AttributeId) -> bool {
        self.by_attribute.contains_key(&attribute)
    }

    /// Attributes with at least one rule.
    pub(crate) fn attributes(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.by_attribute.keys().copied()
    }

    /// Every stored rule, by attribute.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (AttributeId, &StoredRule)> {
        self.by_attribute
            .iter()
            .flat_map(|(attr, entry)| entry.rules.iter().map(move |r| (*attr, r)))
    }
}
