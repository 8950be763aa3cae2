//! Style-sheet conditions and the closed rule-condition type.

use std::collections::BTreeSet;
use std::fmt;

use super::Condition;
use crate::element_type::ElementType;
use crate::state::{StateName, StateSet};

/// A style-sheet rule condition: a state condition narrowed to a group and
/// an element type.
///
/// `group == None` means the rule applies to ungrouped elements;
/// `element_type == None` means the universal widget type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SheetCondition {
    state: Option<Condition>,
    group: Option<String>,
    element_type: Option<ElementType>,
}

impl SheetCondition {
    /// Unconditional, ungrouped, universal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate the rule on a state condition.
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.state = Some(condition);
        self
    }

    /// Restrict the rule to members of `group`.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Bind the rule to `ty`. Binding to the universal type is the same as
    /// not binding at all.
    #[must_use]
    pub fn for_type(mut self, ty: ElementType) -> Self {
        self.element_type = (!ty.is_universal()).then_some(ty);
        self
    }

    /// The state part, if any.
    pub fn state(&self) -> Option<&Condition> {
        self.state.as_ref()
    }

    /// The group name, if any.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The element type bound, `None` for the universal type.
    pub fn element_type(&self) -> Option<ElementType> {
        self.element_type
    }

    /// Returns `true` when group and type equal the given pair exactly.
    pub fn targets(&self, group: Option<&str>, element_type: Option<ElementType>) -> bool {
        self.group.as_deref() == group && self.element_type == element_type
    }
}

impl fmt::Display for SheetCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, ".{group}")?,
            None => write!(f, "*")?,
        }
        if let Some(ty) = self.element_type {
            write!(f, "<{}>", ty.depth())?;
        }
        if let Some(state) = &self.state {
            write!(f, ":{state}")?;
        }
        Ok(())
    }
}

/// The condition attached to a stored rule.
///
/// Plain cascade nodes hold [`Always`](Self::Always) and
/// [`State`](Self::State) conditions; style-sheet nodes hold
/// [`Sheet`](Self::Sheet) conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleCondition {
    /// Applies in every state. Least specific.
    Always,
    /// Applies while the state condition holds.
    State(Condition),
    /// A style-sheet condition.
    Sheet(SheetCondition),
}

impl RuleCondition {
    /// The state part of the condition.
    pub fn state(&self) -> Option<&Condition> {
        match self {
            Self::Always => None,
            Self::State(c) => Some(c),
            Self::Sheet(s) => s.state(),
        }
    }

    /// Priority of the state part, `0` without one.
    pub fn priority(&self) -> i32 {
        self.state().map_or(0, Condition::priority)
    }

    /// Group dimension; plain conditions are ungrouped.
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Sheet(s) => s.group(),
            _ => None,
        }
    }

    /// Element type dimension; plain conditions are universal.
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            Self::Sheet(s) => s.element_type(),
            _ => None,
        }
    }

    /// Depth of the element type bound below the universal type.
    pub fn type_depth(&self) -> u16 {
        self.element_type().map_or(0, ElementType::depth)
    }

    /// Returns `true` when the state part is absent or holds in `states`.
    ///
    /// Group and type are not checked here; that is the job of projections.
    pub fn is_satisfied_by(&self, states: &StateSet) -> bool {
        self.state().is_none_or(|c| c.is_satisfied_by(states))
    }

    /// `true` if, whenever `self` holds, `other` provably holds too.
    ///
    /// Conditions over different groups or types never imply each other.
    pub fn implies_when_true(&self, other: &Self) -> bool {
        if self.group() != other.group() || self.element_type() != other.element_type() {
            return false;
        }
        match (self.state(), other.state()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a.implies_when_true(b),
        }
    }

    /// Every state name the state part mentions.
    pub fn states(&self) -> BTreeSet<StateName> {
        self.state().map(Condition::states).unwrap_or_default()
    }

    /// Turn a condition given for a style-sheet node into sheet form.
    pub(crate) fn into_sheet(self) -> SheetCondition {
        match self {
            Self::Always => SheetCondition::new(),
            Self::State(c) => SheetCondition::new().when(c),
            Self::Sheet(s) => s,
        }
    }

    /// Drop the group and type dimensions of a sheet condition.
    pub(crate) fn project(sheet: &SheetCondition) -> Self {
        match sheet.state() {
            Some(c) => Self::State(c.clone()),
            None => Self::Always,
        }
    }
}

impl From<Condition> for RuleCondition {
    fn from(condition: Condition) -> Self {
        Self::State(condition)
    }
}

impl From<Option<Condition>> for RuleCondition {
    fn from(condition: Option<Condition>) -> Self {
        condition.map_or(Self::Always, Self::State)
    }
}

impl From<SheetCondition> for RuleCondition {
    fn from(condition: SheetCondition) -> Self {
        Self::Sheet(condition)
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "*"),
            Self::State(c) => write!(f, "{c}"),
            Self::Sheet(s) => write!(f, "{s}"),
        }
    }
}
