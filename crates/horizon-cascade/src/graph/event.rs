//! Change events emitted by cascade nodes.

use std::fmt;

use super::NodeId;
use crate::attribute::AttributeId;
use crate::condition::RuleCondition;

/// How a rule's visibility changed for the receiving node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The rule became part of the node's effective view.
    Visible,
    /// The rule left the node's effective view.
    Hidden,
    /// The rule stayed visible but its value changed.
    Changed,
}

/// A visible change to one rule, as seen from one cascade node.
///
/// Events are attributed to the rule's owner and condition as the receiving
/// node sees them: a style-sheet rule reaching a node through a projection is
/// reported with the projection as owner and the projected state condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeEvent {
    /// The node whose effective view changed.
    pub node: NodeId,
    /// What happened.
    pub kind: ChangeKind,
    /// The attribute whose rules changed.
    pub attribute: AttributeId,
    /// Condition of the affected rule.
    pub condition: RuleCondition,
    /// Node holding the affected rule.
    pub owner: NodeId,
}

impl fmt::Display for CascadeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} attr#{} [{}] owned by {:?}",
            self.kind,
            self.attribute.index(),
            self.condition,
            self.owner
        )
    }
}
