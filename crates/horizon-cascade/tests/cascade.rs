//! Resolution and change-event properties of the cascade graph.

mod common;

use common::{EventLog, init_tracing};
use horizon_cascade::prelude::*;

fn colors() -> (AttributeRegistry, Attribute<String>) {
    let mut registry = AttributeRegistry::new();
    let color = registry
        .register("paint", "color", "white".to_string())
        .unwrap();
    (registry, color)
}

fn all_state_sets() -> Vec<StateSet> {
    let names = [states::PRESSED, states::HOVERED, states::FOCUSED];
    (0..1_u8 << names.len())
        .map(|mask| {
            names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .fold(StateSet::new(), |set, (_, name)| set.with(*name))
        })
        .collect()
}

#[test]
fn button_scenario() {
    init_tracing();
    let (_registry, color) = colors();
    let mut graph = CascadeGraph::new();
    let group = graph.create_node("ButtonGroup");
    let button = graph.create_node("Button");
    graph.add_dependency(button, group, None).unwrap();
    graph
        .set(group, &color, RuleCondition::Always, "gray".to_string())
        .unwrap();
    graph
        .set(button, &color, Condition::state(states::PRESSED), "blue".to_string())
        .unwrap();

    let idle = StateSet::new();
    let pressed = StateSet::new().with(states::PRESSED);
    assert_eq!(graph.resolve_in(button, &color, &idle), "gray");
    assert_eq!(graph.resolve_in(button, &color, &pressed), "blue");

    let log = EventLog::attach(&graph, button);
    assert!(graph.clear(button, &color, Condition::state(states::PRESSED)).unwrap());
    assert_eq!(graph.resolve_in(button, &color, &pressed), "gray");

    let events = log.take();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, ChangeKind::Hidden);
    assert_eq!(event.attribute, color.id());
    assert_eq!(event.condition, RuleCondition::from(Condition::state(states::PRESSED)));
    assert_eq!(event.owner, button);
    assert_eq!(event.node, button);
}

#[test]
fn default_fallback_in_every_state() {
    let (mut registry, color) = colors();
    let width = registry.register("layout", "width", 0.5_f32).unwrap();
    let mut graph = CascadeGraph::new();
    let root = graph.create_node("root");
    let leaf = graph.create_node("leaf");
    graph.add_dependency(leaf, root, None).unwrap();
    graph
        .set(root, &width, Condition::state(states::HOVERED), 2.0)
        .unwrap();

    for states in all_state_sets() {
        assert_eq!(graph.resolve_in(leaf, &color, &states), "white");
        assert!(!graph.is_set(leaf, &color, &states));
    }
}

#[test]
fn narrower_rule_wins_whatever_the_insertion_order() {
    let (_registry, color) = colors();
    let narrow = Condition::state(states::PRESSED).and(Condition::state(states::HOVERED));
    let broad = Condition::state(states::PRESSED);
    assert!(narrow.implies_when_true(&broad));

    for narrow_first in [true, false] {
        let mut graph = CascadeGraph::new();
        let node = graph.create_node("node");
        let mut writes = vec![
            (narrow.clone(), "narrow".to_string()),
            (broad.clone(), "broad".to_string()),
        ];
        if !narrow_first {
            writes.reverse();
        }
        for (condition, value) in writes {
            graph.set(node, &color, condition, value).unwrap();
        }

        for states in all_state_sets() {
            if narrow.is_satisfied_by(&states) && broad.is_satisfied_by(&states) {
                assert_eq!(graph.resolve_in(node, &color, &states), "narrow");
            }
        }
        let sorted = graph.get_local_sorted(node, &color).unwrap();
        assert_eq!(sorted[0].value.get(), "narrow");
    }
}

#[test]
fn shadowed_grandparent_change_is_silent() {
    let (_registry, color) = colors();
    let mut graph = CascadeGraph::new();
    let p2 = graph.create_node("P2");
    let p1 = graph.create_node("P1");
    let n = graph.create_node("N");
    graph.add_dependency(p1, p2, None).unwrap();
    graph.add_dependency(n, p1, None).unwrap();
    graph.set(p2, &color, RuleCondition::Always, "red".to_string()).unwrap();
    graph.set(p1, &color, RuleCondition::Always, "green".to_string()).unwrap();

    let log = EventLog::attach(&graph, n);
    graph.set(p2, &color, RuleCondition::Always, "blue".to_string()).unwrap();
    assert_eq!(log.len(), 0);

    graph.set(p1, &color, RuleCondition::Always, "black".to_string()).unwrap();
    let events = log.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::Changed);
    assert_eq!(events[0].owner, p1);
    assert_eq!(graph.resolve_in(n, &color, &StateSet::new()), "black");
}

#[test]
fn re_set_with_same_value_adds_once() {
    let (_registry, color) = colors();
    let mut graph = CascadeGraph::new();
    let node = graph.create_node("node");
    let log = EventLog::attach(&graph, node);

    for _ in 0..2 {
        graph
            .set(node, &color, Condition::state(states::FOCUSED), "teal".to_string())
            .unwrap();
    }
    assert_eq!(log.count(ChangeKind::Visible), 1);
    assert_eq!(log.len(), 1);
    assert_eq!(graph.get_local(node, &color).unwrap().len(), 1);
}

#[test]
fn add_then_remove_dependency_is_neutral() {
    let (mut registry, color) = colors();
    let size = registry.register("text", "size", 10_u32).unwrap();
    let mut graph = CascadeGraph::new();
    let base = graph.create_node("base");
    let extra = graph.create_node("extra");
    let node = graph.create_node("node");
    graph.add_dependency(node, base, None).unwrap();
    graph.set(base, &color, RuleCondition::Always, "gray".to_string()).unwrap();
    graph.set(extra, &color, Condition::state(states::HOVERED), "cyan".to_string()).unwrap();
    graph.set(extra, &size, RuleCondition::Always, 14).unwrap();
    graph.set(node, &size, Condition::state(states::PRESSED), 18).unwrap();

    let effective = |graph: &CascadeGraph| {
        let colors: Vec<_> = graph
            .get_effective(node, &color)
            .unwrap()
            .into_iter()
            .map(|r| (r.owner, r.condition, r.value.get()))
            .collect();
        let sizes: Vec<_> = graph
            .get_effective(node, &size)
            .unwrap()
            .into_iter()
            .map(|r| (r.owner, r.condition, r.value.get()))
            .collect();
        (colors, sizes)
    };
    let before = effective(&graph);

    let log = EventLog::attach(&graph, node);
    graph.add_dependency(node, extra, None).unwrap();
    graph.remove_dependency(node, extra).unwrap();
    assert_eq!(effective(&graph), before);

    let events = log.take();
    assert!(!events.is_empty());
    for attribute in [color.id(), size.id()] {
        let shown = events
            .iter()
            .filter(|e| e.attribute == attribute && e.kind == ChangeKind::Visible)
            .count();
        let hidden = events
            .iter()
            .filter(|e| e.attribute == attribute && e.kind == ChangeKind::Hidden)
            .count();
        assert_eq!(shown, hidden);
    }
    assert!(events.iter().all(|e| e.kind != ChangeKind::Changed));
}

#[test]
fn invalid_value_leaves_node_untouched() {
    let mut registry = AttributeRegistry::new();
    let opacity = registry
        .define("paint", "opacity", 1.0_f32)
        .validator(|v: &f32| (0.0..=1.0).contains(v))
        .register()
        .unwrap();

    let mut graph = CascadeGraph::new();
    let node = graph.create_node("node");
    graph.set(node, &opacity, RuleCondition::Always, 0.5).unwrap();
    let log = EventLog::attach(&graph, node);

    let err = graph
        .set(node, &opacity, RuleCondition::Always, 3.0)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
    assert_eq!(log.len(), 0);
    assert_eq!(graph.resolve_in(node, &opacity, &StateSet::new()), 0.5);
}

#[test]
fn shared_graph_listener_may_mutate() {
    init_tracing();
    let (_registry, color) = colors();
    let shared = SharedCascadeGraph::new();
    let source = shared.mutate(|g| g.create_node("source"));
    let mirror = shared.mutate(|g| g.create_node("mirror"));

    let _guard = {
        let handle = shared.clone();
        let color = color.clone();
        shared
            .read()
            .subscribe(source, move |event| {
                if event.kind == ChangeKind::Visible {
                    let value = handle
                        .read()
                        .resolve_in(source, &color, &StateSet::new());
                    handle
                        .mutate(|g| g.set(mirror, &color, RuleCondition::Always, value))
                        .unwrap();
                }
            })
            .unwrap()
    };

    shared
        .mutate(|g| g.set(source, &color, RuleCondition::Always, "plum".to_string()))
        .unwrap();
    assert_eq!(
        shared.read().resolve_in(mirror, &color, &StateSet::new()),
        "plum"
    );
}
