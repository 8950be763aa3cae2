//! Specificity ordering between rule conditions.

use std::cmp::Ordering;

use super::RuleCondition;

/// Compare two conditions by specificity.
///
/// [`Ordering::Less`] means `a` is *more* specific and sorts first. Criteria,
/// in order:
///
/// 1. a condition with a state part beats one without;
/// 2. higher priority beats lower;
/// 3. between different conditions, one that implies the other beats it;
/// 4. a deeper element type beats a shallower one, a named group beats no
///    group, and group names break the remaining tie lexicographically.
///
/// Criterion 3 is only a partial order, so this comparator is not guaranteed
/// to be transitive. Use [`sort_by_specificity`], never `slice::sort_by`.
pub fn compare(a: &RuleCondition, b: &RuleCondition) -> Ordering {
    match (a.state(), b.state()) {
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (Some(x), Some(y)) => {
            let by_priority = y.priority().cmp(&x.priority());
            if by_priority != Ordering::Equal {
                return by_priority;
            }
            if x != y {
                match (x.implies_when_true(y), y.implies_when_true(x)) {
                    (true, false) => return Ordering::Less,
                    (false, true) => return Ordering::Greater,
                    _ => {}
                }
            }
        }
        (None, None) => {}
    }

    b.type_depth()
        .cmp(&a.type_depth())
        .then_with(|| match (a.group(), b.group()) {
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(y),
            (None, None) => Ordering::Equal,
        })
}

/// Stable sort, most specific first.
///
/// An insertion sort: it only moves an element past a neighbour it strictly
/// outranks, so it stays deterministic with a non-transitive comparator and
/// keeps equal conditions in their original (chain) order.
pub fn sort_by_specificity<T>(items: &mut [T], condition: impl Fn(&T) -> &RuleCondition) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(condition(&items[j]), condition(&items[j - 1])) == Ordering::Less {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Returns `true` if a rule under `shadowing`, seen earlier in a chain,
/// hides a rule under `hidden`: whenever `hidden` holds, `shadowing` holds
/// too.
pub fn shadows(shadowing: &RuleCondition, hidden: &RuleCondition) -> bool {
    hidden.implies_when_true(shadowing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, SheetCondition};
    use crate::element_type::TypeRegistry;

    fn state(name: &str) -> RuleCondition {
        RuleCondition::State(Condition::state(name))
    }

    #[test]
    fn conditioned_beats_always() {
        assert_eq!(compare(&state("a"), &RuleCondition::Always), Ordering::Less);
        assert_eq!(compare(&RuleCondition::Always, &state("a")), Ordering::Greater);
        assert_eq!(compare(&RuleCondition::Always, &RuleCondition::Always), Ordering::Equal);
    }

    #[test]
    fn priority_then_implication() {
        let high = RuleCondition::State(Condition::state("a").with_priority(5));
        assert_eq!(compare(&high, &state("b")), Ordering::Less);

        let narrow = RuleCondition::State(
            Condition::state("a").and(Condition::state("b")).with_priority(1),
        );
        assert_eq!(compare(&narrow, &state("a")), Ordering::Less);
        assert_eq!(compare(&state("a"), &narrow), Ordering::Greater);
        assert_eq!(compare(&state("a"), &state("b")), Ordering::Equal);
    }

    #[test]
    fn sheet_dimensions_break_ties() {
        let mut types = TypeRegistry::new("Widget");
        let button = types.register("Button", types.universal()).unwrap();
        let toggle = types.register("ToggleButton", button).unwrap();

        let by_button = RuleCondition::Sheet(SheetCondition::new().for_type(button));
        let by_toggle = RuleCondition::Sheet(SheetCondition::new().for_type(toggle));
        assert_eq!(compare(&by_toggle, &by_button), Ordering::Less);

        let grouped = RuleCondition::Sheet(SheetCondition::new().in_group("b"));
        let other_group = RuleCondition::Sheet(SheetCondition::new().in_group("a"));
        assert_eq!(compare(&grouped, &RuleCondition::Always), Ordering::Less);
        assert_eq!(compare(&other_group, &grouped), Ordering::Less);

        // State part still dominates sheet dimensions.
        let stateful = RuleCondition::Sheet(SheetCondition::new().when(Condition::state("a")));
        assert_eq!(compare(&stateful, &by_toggle), Ordering::Less);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let mut rules = vec![
            (RuleCondition::Always, 0),
            (state("a"), 1),
            (RuleCondition::Always, 2),
            (state("b"), 3),
        ];
        sort_by_specificity(&mut rules, |(c, _)| c);
        let order: Vec<_> = rules.iter().map(|(_, i)| *i).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn shadowing() {
        assert!(shadows(&RuleCondition::Always, &state("a")));
        assert!(shadows(&RuleCondition::Always, &RuleCondition::Always));
        assert!(!shadows(&state("a"), &RuleCondition::Always));
        assert!(shadows(&state("a"), &state("a")));

        let narrow = RuleCondition::State(Condition::state("a").and(Condition::state("b")));
        assert!(shadows(&state("a"), &narrow));
        assert!(!shadows(&narrow, &state("a")));
    }
}
