//! Filtered projections of style sheets.
//!
//! A style sheet keys its rules by state, group and element type. A
//! projection narrows one sheet to a single `(group, element type)` pair and
//! presents the matching rules as plain state-conditioned rules, so that the
//! sheet can sit in an ordinary dependency chain.
//!
//! Matching is exact: a projection for `Button` does not see rules bound to
//! `Widget` or to `ToggleButton`. Walking up the type hierarchy is the
//! [group tree's](crate::group) job.

use horizon_cascade_core::logging::targets;

use crate::attribute::{Attribute, AttributeId, AttributeValue};
use crate::condition::RuleCondition;
use crate::element_type::ElementType;
use crate::graph::{CascadeGraph, NodeData, NodeId, NodeKind};
use crate::rules::{Rule, StoredRule};
use crate::{Error, Result};

/// The fixed dimensions of a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProjectionFilter {
    pub(crate) sheet: NodeId,
    pub(crate) group: Option<String>,
    pub(crate) element_type: Option<ElementType>,
}

impl ProjectionFilter {
    /// Returns `true` if a sheet rule under `condition` belongs to this
    /// projection.
    pub(crate) fn accepts(&self, condition: &RuleCondition) -> bool {
        match condition {
            RuleCondition::Sheet(sheet) => {
                sheet.targets(self.group.as_deref(), self.element_type)
            }
            // Sheet nodes normalize every condition they store.
            _ => self.group.is_none() && self.element_type.is_none(),
        }
    }
}

impl CascadeGraph {
    /// Create a projection of `sheet` for `group` and `element_type`.
    ///
    /// The universal element type is the same as no type bound. The
    /// projection is read-only; remove it with
    /// [`remove_node`](CascadeGraph::remove_node) once nothing depends on it.
    pub fn create_projection(
        &mut self,
        sheet: NodeId,
        group: Option<&str>,
        element_type: Option<ElementType>,
    ) -> Result<NodeId> {
        let data = self.node(sheet)?;
        if data.kind != NodeKind::StyleSheet {
            return Err(Error::invalid_argument(format!(
                "'{}' is not a style sheet",
                data.label
            )));
        }

        let filter = ProjectionFilter {
            sheet,
            group: group.map(str::to_owned),
            element_type: element_type.filter(|ty| !ty.is_universal()),
        };
        let label = format!(
            "{}[{}/{}]",
            data.label,
            group.unwrap_or("*"),
            filter.element_type.map_or(0, ElementType::depth)
        );
        let projection = self.insert_node(NodeData::new(label, NodeKind::Projection, Some(filter)));
        self.node_mut(sheet)?.dependents.push(projection);
        tracing::debug!(target: targets::CHAIN, ?sheet, ?projection, ?group, "created projection");
        Ok(projection)
    }

    /// The sheet rules a projection exposes for `attribute`, with their
    /// conditions reduced to the state part.
    ///
    /// Fails with [`Error::InvalidArgument`] if `projection` is not a
    /// projection.
    pub fn get_local_expressions<T: AttributeValue>(
        &self,
        projection: NodeId,
        attribute: &Attribute<T>,
    ) -> Result<Vec<Rule<T>>> {
        let data = self.node(projection)?;
        let Some(filter) = &data.filter else {
            return Err(Error::invalid_argument(format!(
                "'{}' is not a projection",
                data.label
            )));
        };
        Ok(self
            .project_rules(filter, attribute.id())
            .iter()
            .filter_map(|rule| Rule::from_stored(rule, projection))
            .collect())
    }

    pub(crate) fn project_rules(
        &self,
        filter: &ProjectionFilter,
        attribute: AttributeId,
    ) -> Vec<StoredRule> {
        let Ok(sheet) = self.node(filter.sheet) else {
            return Vec::new();
        };
        sheet
            .rules
            .get(attribute)
            .iter()
            .filter(|rule| filter.accepts(&rule.condition))
            .map(|rule| StoredRule {
                condition: match &rule.condition {
                    RuleCondition::Sheet(sheet) => RuleCondition::project(sheet),
                    other => other.clone(),
                },
                cell: rule.cell.clone(),
            })
            .collect()
    }

    pub(crate) fn projected_attributes(&self, filter: &ProjectionFilter) -> Vec<AttributeId> {
        let Ok(sheet) = self.node(filter.sheet) else {
            return Vec::new();
        };
        let mut attributes: Vec<AttributeId> = sheet
            .rules
            .iter()
            .filter(|(_, rule)| filter.accepts(&rule.condition))
            .map(|(attribute, _)| attribute)
            .collect();
        attributes.sort_unstable();
        attributes.dedup();
        attributes
    }
}
