//! Named element states.
//!
//! Conditions are evaluated against the set of states an element is
//! currently in. States are plain names so that widgets can introduce their
//! own (`"expanded"`, `"dragging"`); the common ones are listed in [`states`].

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Well-known state names.
pub mod states {
    /// The pointer is over the element.
    pub const HOVERED: &str = "hovered";
    /// The element is being pressed.
    pub const PRESSED: &str = "pressed";
    /// The element has keyboard focus.
    pub const FOCUSED: &str = "focused";
    /// The element is selected.
    pub const SELECTED: &str = "selected";
    /// The element is checked.
    pub const CHECKED: &str = "checked";
    /// The element does not accept input.
    pub const DISABLED: &str = "disabled";
}

/// The name of a boolean element state.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateName(Arc<str>);

impl StateName {
    /// Create a state name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The set of states an element is currently in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StateSet(BTreeSet<StateName>);

impl StateSet {
    /// The empty state set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `state` is active.
    pub fn contains(&self, state: &str) -> bool {
        self.0.contains(state)
    }

    /// Activate `state`. Returns `true` if it was not active before.
    pub fn insert(&mut self, state: impl Into<StateName>) -> bool {
        self.0.insert(state.into())
    }

    /// Deactivate `state`. Returns `true` if it was active before.
    pub fn remove(&mut self, state: &str) -> bool {
        self.0.remove(state)
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, state: impl Into<StateName>) -> Self {
        self.insert(state);
        self
    }

    /// Iterate over the active states in name order.
    pub fn iter(&self) -> impl Iterator<Item = &StateName> {
        self.0.iter()
    }

    /// States active in exactly one of `self` and `other`.
    pub fn toggled_against<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = &'a StateName> {
        self.0.symmetric_difference(&other.0)
    }

    /// Number of active states.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no state is active.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<StateName>> FromIterator<S> for StateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<StateName>> Extend<S> for StateSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut set = StateSet::new();
        assert!(set.insert(states::PRESSED));
        assert!(!set.insert(states::PRESSED));
        assert!(set.contains("pressed"));
        assert!(set.remove("pressed"));
        assert!(set.is_empty());
    }

    #[test]
    fn toggled_states() {
        let before: StateSet = [states::HOVERED, states::FOCUSED].into_iter().collect();
        let after = StateSet::new().with(states::FOCUSED).with(states::PRESSED);

        let toggled: Vec<_> = before.toggled_against(&after).map(StateName::as_str).collect();
        assert_eq!(toggled, vec!["hovered", "pressed"]);
    }
}
