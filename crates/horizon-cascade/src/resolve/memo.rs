//! Memoized resolutions of a stateful view.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::attribute::AttributeId;
use crate::graph::Resolution;
use crate::rules::{CellWatch, ErasedCell};
use crate::state::StateName;

/// One memoized resolution.
#[derive(Clone, Default)]
pub(crate) struct MemoEntry {
    /// Winning cell, `None` when the default applies.
    pub(crate) winner: Option<Arc<dyn ErasedCell>>,
    /// States whose toggling can change the outcome.
    pub(crate) depends_on: BTreeSet<StateName>,
}

impl MemoEntry {
    /// Returns `true` if both entries picked the same cell (or both fell
    /// back to the default).
    pub(crate) fn same_winner(&self, other: &Self) -> bool {
        match (&self.winner, &other.winner) {
            (Some(a), Some(b)) => a.same_cell(&**b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl From<Resolution> for MemoEntry {
    fn from(resolution: Resolution) -> Self {
        Self {
            winner: resolution.winner,
            depends_on: resolution.depends_on,
        }
    }
}

/// An attribute resolved through the view.
#[derive(Default)]
struct Tracked {
    /// The memoized resolution, if it survived eviction.
    entry: Option<MemoEntry>,
    /// Subscription to the winning cell, kept across eviction.
    watch: Option<CellWatch>,
}

/// Resolutions for the current state set, keyed by attribute.
///
/// Every attribute resolved through the view stays tracked so that later
/// changes are still reported. Only the memoized entries count against the
/// capacity; an evicted attribute keeps its cell watch and is reported
/// conservatively until it is resolved again.
pub(crate) struct ResolutionMemo {
    tracked: HashMap<AttributeId, Tracked>,
    memoized: usize,
    max_size: usize,
}

impl ResolutionMemo {
    pub(crate) fn with_capacity(max_size: usize) -> Self {
        Self {
            tracked: HashMap::with_capacity(max_size),
            memoized: 0,
            max_size,
        }
    }

    pub(crate) fn get(&self, attribute: AttributeId) -> Option<&MemoEntry> {
        self.tracked.get(&attribute)?.entry.as_ref()
    }

    pub(crate) fn is_tracked(&self, attribute: AttributeId) -> bool {
        self.tracked.contains_key(&attribute)
    }

    /// Track `attribute`, replacing its cell watch, and memoize `entry` if
    /// there is one and memoization is enabled.
    pub(crate) fn store(
        &mut self,
        attribute: AttributeId,
        entry: Option<MemoEntry>,
        watch: Option<CellWatch>,
    ) {
        let entry = entry.filter(|_| self.max_size > 0);
        let replaces = self.get(attribute).is_some();
        if entry.is_some() && !replaces && self.memoized >= self.max_size {
            // Simple eviction: clear half when full
            self.evict_half();
        }

        let tracked = self.tracked.entry(attribute).or_default();
        match (tracked.entry.is_some(), entry.is_some()) {
            (false, true) => self.memoized += 1,
            (true, false) => self.memoized -= 1,
            _ => {}
        }
        tracked.entry = entry;
        tracked.watch = watch;
    }

    /// Remove the memoized entry of `attribute`, leaving it tracked.
    pub(crate) fn take(&mut self, attribute: AttributeId) -> Option<MemoEntry> {
        let entry = self.tracked.get_mut(&attribute)?.entry.take();
        if entry.is_some() {
            self.memoized -= 1;
        }
        entry
    }

    /// Drop every memoized entry that depends on one of `toggled`.
    ///
    /// Returns those attributes with their old entry, together with every
    /// tracked attribute that has no memoized entry (and so cannot tell).
    pub(crate) fn invalidate_states(
        &mut self,
        toggled: &BTreeSet<StateName>,
    ) -> Vec<(AttributeId, Option<MemoEntry>)> {
        let stale: Vec<AttributeId> = self
            .tracked
            .iter()
            .filter(|(_, tracked)| {
                tracked
                    .entry
                    .as_ref()
                    .is_none_or(|entry| !entry.depends_on.is_disjoint(toggled))
            })
            .map(|(attribute, _)| *attribute)
            .collect();
        stale
            .into_iter()
            .map(|attribute| (attribute, self.take(attribute)))
            .collect()
    }

    /// Drop every memoized entry. Attributes stay tracked.
    pub(crate) fn invalidate_all(&mut self) {
        for tracked in self.tracked.values_mut() {
            tracked.entry = None;
        }
        self.memoized = 0;
    }

    /// Number of memoized entries.
    pub(crate) fn len(&self) -> usize {
        self.memoized
    }

    fn evict_half(&mut self) {
        let target = self.memoized.div_ceil(2);
        let keys: Vec<_> = self
            .tracked
            .iter()
            .filter(|(_, tracked)| tracked.entry.is_some())
            .map(|(attribute, _)| *attribute)
            .take(target)
            .collect();
        for key in keys {
            self.take(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeRegistry;

    fn entry(states: &[&str]) -> MemoEntry {
        MemoEntry {
            winner: None,
            depends_on: states.iter().map(|s| StateName::from(*s)).collect(),
        }
    }

    fn ids(count: usize) -> Vec<AttributeId> {
        let mut registry = AttributeRegistry::new();
        (0..count)
            .map(|i| registry.register("test", format!("a{i}"), 0_u8).unwrap().id())
            .collect()
    }

    #[test]
    fn evicts_half_when_full() {
        let ids = ids(5);
        let mut memo = ResolutionMemo::with_capacity(4);
        for id in &ids[..4] {
            memo.store(*id, Some(entry(&[])), None);
        }
        assert_eq!(memo.len(), 4);
        memo.store(ids[4], Some(entry(&[])), None);
        assert_eq!(memo.len(), 3);
        assert!(memo.get(ids[4]).is_some());
        assert!(ids.iter().all(|id| memo.is_tracked(*id)));
    }

    #[test]
    fn state_invalidation_is_selective() {
        let ids = ids(3);
        let mut memo = ResolutionMemo::with_capacity(8);
        memo.store(ids[0], Some(entry(&["pressed"])), None);
        memo.store(ids[1], Some(entry(&["hovered", "focused"])), None);
        memo.store(ids[2], Some(entry(&[])), None);

        let toggled = [StateName::from("focused")].into_iter().collect();
        let stale = memo.invalidate_states(&toggled);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, ids[1]);
        assert!(stale[0].1.is_some());
        assert!(memo.get(ids[0]).is_some());
        assert!(memo.get(ids[1]).is_none());
        assert!(memo.is_tracked(ids[1]));
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn evicted_attributes_are_reported_on_any_toggle() {
        let ids = ids(3);
        let mut memo = ResolutionMemo::with_capacity(2);
        memo.store(ids[0], Some(entry(&["pressed"])), None);
        memo.store(ids[1], Some(entry(&["pressed"])), None);
        memo.store(ids[2], Some(entry(&["pressed"])), None);
        assert_eq!(memo.len(), 2);

        let toggled = [StateName::from("hovered")].into_iter().collect();
        let stale = memo.invalidate_states(&toggled);
        assert_eq!(stale.len(), 1);
        assert!(stale[0].1.is_none());
        assert!(memo.get(stale[0].0).is_none());
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn zero_capacity_disables_memo() {
        let ids = ids(1);
        let mut memo = ResolutionMemo::with_capacity(0);
        memo.store(ids[0], Some(entry(&[])), None);
        assert!(memo.get(ids[0]).is_none());
        assert!(memo.is_tracked(ids[0]));
        assert_eq!(memo.len(), 0);

        let toggled = [StateName::from("pressed")].into_iter().collect();
        assert_eq!(memo.invalidate_states(&toggled).len(), 1);
    }
}
