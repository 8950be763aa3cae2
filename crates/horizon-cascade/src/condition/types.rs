//! State condition expressions.

use std::collections::BTreeSet;
use std::fmt;

use crate::state::{StateName, StateSet};

/// A boolean expression over named element states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// True while the named state is active.
    State(StateName),
    /// True when both operands are true.
    And(Box<Expr>, Box<Expr>),
    /// True when either operand is true.
    Or(Box<Expr>, Box<Expr>),
    /// True when the operand is false.
    Not(Box<Expr>),
}

impl Expr {
    /// Evaluate against the active states.
    pub fn evaluate(&self, states: &StateSet) -> bool {
        match self {
            Self::State(name) => states.contains(name.as_str()),
            Self::And(a, b) => a.evaluate(states) && b.evaluate(states),
            Self::Or(a, b) => a.evaluate(states) || b.evaluate(states),
            Self::Not(a) => !a.evaluate(states),
        }
    }

    /// Conservative implication: `true` only if `self` being true provably
    /// makes `other` true. A `false` answer means "not proven", not "no".
    pub fn implies(&self, other: &Self) -> bool {
        if self == other {
            return true;
        }
        if let Self::And(x, y) = other {
            return self.implies(x) && self.implies(y);
        }
        if let Self::Or(x, y) = self {
            return x.implies(other) && y.implies(other);
        }
        if let Self::And(x, y) = self {
            if x.implies(other) || y.implies(other) {
                return true;
            }
        }
        if let Self::Or(x, y) = other {
            if self.implies(x) || self.implies(y) {
                return true;
            }
        }
        match (self, other) {
            (Self::Not(x), Self::Not(y)) => y.implies(x),
            _ => false,
        }
    }

    /// Priority when none is given explicitly: conjunctions add up, a
    /// disjunction counts as its weakest branch.
    fn derived_priority(&self) -> i32 {
        match self {
            Self::State(_) => 1,
            Self::And(a, b) => a.derived_priority().saturating_add(b.derived_priority()),
            Self::Or(a, b) => a.derived_priority().min(b.derived_priority()),
            Self::Not(a) => a.derived_priority(),
        }
    }

    fn collect_states(&self, out: &mut BTreeSet<StateName>) {
        match self {
            Self::State(name) => {
                out.insert(name.clone());
            }
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_states(out);
                b.collect_states(out);
            }
            Self::Not(a) => a.collect_states(out),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(name) => write!(f, "{name}"),
            Self::And(a, b) => write!(f, "({a} & {b})"),
            Self::Or(a, b) => write!(f, "({a} | {b})"),
            Self::Not(a) => write!(f, "!{a}"),
        }
    }
}

/// An immutable state condition with a priority.
///
/// Two conditions are equal when their expressions are structurally equal
/// and their priorities match.
///
/// # Example
///
/// ```
/// use horizon_cascade::condition::Condition;
/// use horizon_cascade::state::{StateSet, states};
///
/// let pressed = Condition::state(states::PRESSED);
/// let pressed_focused = pressed.clone().and(Condition::state(states::FOCUSED));
///
/// assert!(pressed_focused.implies_when_true(&pressed));
/// assert!(!pressed.implies_when_true(&pressed_focused));
/// assert_eq!(pressed_focused.priority(), 2);
///
/// let states = StateSet::new().with(states::PRESSED);
/// assert!(pressed.is_satisfied_by(&states));
/// assert!(!pressed_focused.is_satisfied_by(&states));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    expr: Expr,
    priority: i32,
}

impl Condition {
    /// A condition over an arbitrary expression, with derived priority.
    pub fn new(expr: Expr) -> Self {
        let priority = expr.derived_priority();
        Self { expr, priority }
    }

    /// True while `name` is active.
    pub fn state(name: impl Into<StateName>) -> Self {
        Self::new(Expr::State(name.into()))
    }

    /// Conjunction. The result's priority is derived again.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(Expr::And(Box::new(self.expr), Box::new(other.expr)))
    }

    /// Disjunction. The result's priority is derived again.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::new(Expr::Or(Box::new(self.expr), Box::new(other.expr)))
    }

    /// Negation. The result's priority is derived again.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::new(Expr::Not(Box::new(self.expr)))
    }

    /// Replace the priority with an explicit one.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The condition's priority. Higher wins.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The underlying expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against the active states.
    pub fn is_satisfied_by(&self, states: &StateSet) -> bool {
        self.expr.evaluate(states)
    }

    /// `true` if, whenever `self` holds, `other` provably holds too.
    ///
    /// One-directional and conservative; never assume it is symmetric.
    pub fn implies_when_true(&self, other: &Self) -> bool {
        self.expr.implies(&other.expr)
    }

    /// Every state name the condition mentions.
    pub fn states(&self) -> BTreeSet<StateName> {
        let mut out = BTreeSet::new();
        self.expr.collect_states(&mut out);
        out
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.priority != self.expr.derived_priority() {
            write!(f, " @{}", self.priority)?;
        }
        Ok(())
    }
}
