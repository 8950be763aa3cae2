//! Rule conditions and specificity.

mod sheet;
mod specificity;
mod types;

pub use sheet::{RuleCondition, SheetCondition};
pub use specificity::{compare, shadows, sort_by_specificity};
pub use types::{Condition, Expr};
