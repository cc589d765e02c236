use bt_core::{Blackboard, SymbolTable};
use bt_runtime::trace;
use bt_runtime::{
    ActionGraph, ActionNode, AllenRelation, BehaviorTree, FlowNode, GraphError, Node, NodeStatus,
    OrderType, Plan, StaticPlan, SuccessCriteria,
};

fn action(symbols: &SymbolTable, name: &str, outcome: bool) -> Node {
    let sym = symbols.intern(name);
    Node::action(name, ActionNode::from_fn(sym, sym, move |_, _| Ok(outcome)))
}

fn tree_with(symbols: std::sync::Arc<SymbolTable>, flow: FlowNode) -> BehaviorTree {
    let mut bb = Blackboard::new(symbols);
    trace::install(&mut bb);
    BehaviorTree::new("root", bb, flow)
}

#[test]
fn chained_meets_actions_complete_one_per_tick() {
    let symbols = SymbolTable::shared();
    let names = ["a0", "a1", "a2", "a3"];
    let mut flow = FlowNode::new(SuccessCriteria::All);
    let ids = flow
        .load_plan(Plan::sequential(
            names.iter().map(|n| action(&symbols, n, true)).collect(),
        ))
        .unwrap();
    let mut tree = tree_with(symbols, flow);

    for k in 1..names.len() {
        assert_eq!(tree.tick(0.1), NodeStatus::InProgress, "tick {k}");
        let completed = ids
            .iter()
            .filter(|id| tree.flow().graph().bookkeeping(**id).unwrap().completed)
            .count();
        assert_eq!(completed, k);
    }
    assert_eq!(tree.tick(0.1), NodeStatus::Succeeded);
    assert_eq!(tree.tick_count(), names.len() as u64);

    let log = trace::take(tree.blackboard_mut());
    let completions = log
        .events
        .iter()
        .filter(|e| e.tag == "graph.complete")
        .map(|e| (e.tick, e.subject.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(completions, vec![(1, "a0"), (2, "a1"), (3, "a2"), (4, "a3")]);
}

#[test]
fn any_succeeds_with_one_failure() {
    let symbols = SymbolTable::shared();
    let mut flow = FlowNode::new(SuccessCriteria::Any);
    flow.add_child(action(&symbols, "fails", false)).unwrap();
    flow.add_child(action(&symbols, "works", true)).unwrap();
    let mut tree = tree_with(symbols, flow);

    assert_eq!(tree.tick(0.1), NodeStatus::Succeeded);
    let results = tree.flow().results();
    assert_eq!((results.succeeded, results.failed, results.total), (1, 1, 2));
}

#[test]
fn all_fails_with_one_failure() {
    let symbols = SymbolTable::shared();
    let mut flow = FlowNode::new(SuccessCriteria::All);
    flow.add_child(action(&symbols, "fails", false)).unwrap();
    flow.add_child(action(&symbols, "works", true)).unwrap();
    let mut tree = tree_with(symbols, flow);

    assert_eq!(tree.tick(0.1), NodeStatus::Failed);
}

fn run_with(criteria: SuccessCriteria, outcomes: &[bool]) -> NodeStatus {
    let symbols = SymbolTable::shared();
    let mut flow = FlowNode::new(criteria);
    for (i, outcome) in outcomes.iter().enumerate() {
        flow.add_child(action(&symbols, &format!("n{i}"), *outcome))
            .unwrap();
    }
    tree_with(symbols, flow).run(0.1, 10)
}

#[test]
fn count_and_percentage_thresholds() {
    let outcomes = [true, true, true, false];

    assert_eq!(run_with(SuccessCriteria::Count(3), &outcomes), NodeStatus::Succeeded);
    assert_eq!(run_with(SuccessCriteria::Count(4), &outcomes), NodeStatus::Failed);
    assert_eq!(run_with(SuccessCriteria::Percentage(0.75), &outcomes), NodeStatus::Succeeded);
    assert_eq!(run_with(SuccessCriteria::Percentage(0.8), &outcomes), NodeStatus::Failed);
}

#[test]
fn empty_flow_fails() {
    for criteria in [
        SuccessCriteria::All,
        SuccessCriteria::Any,
        SuccessCriteria::Count(0),
        SuccessCriteria::Percentage(0.0),
    ] {
        assert_eq!(run_with(criteria, &[]), NodeStatus::Failed, "{criteria:?}");
    }
}

#[test]
fn meets_gates_successor_until_source_completes() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    let b = graph.add_node(action(&symbols, "B", true)).unwrap();
    graph.add_order_relation(a, b).unwrap();
    graph
        .add_temporal_constraint(a, b, AllenRelation::Meets)
        .unwrap();

    assert_eq!(graph.executable_nodes(0.1), vec![a]);
    assert_eq!(graph.executable_nodes(0.1), Vec::new());

    graph.mark_completed(a).unwrap();
    assert_eq!(graph.executable_nodes(0.1), vec![b]);

    let book_a = graph.bookkeeping(a).unwrap();
    let book_b = graph.bookkeeping(b).unwrap();
    assert!(book_a.completed && !book_a.executing);
    assert!(book_b.executing);
    assert!(book_b.start_time.unwrap() > book_a.start_time.unwrap());
}

#[test]
fn zero_delta_time_does_not_gate_meets() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    let b = graph.add_node(action(&symbols, "B", true)).unwrap();
    graph.add_order_relation(a, b).unwrap();
    graph
        .add_temporal_constraint(a, b, AllenRelation::Meets)
        .unwrap();

    assert_eq!(graph.executable_nodes(0.0), vec![a]);
    assert_eq!(graph.bookkeeping(a).unwrap().start_time, Some(0.0));
    graph.mark_completed(a).unwrap();
    assert_eq!(graph.executable_nodes(0.0), vec![b]);
}

#[test]
fn precedes_requires_completed_source() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    let b = graph.add_node(action(&symbols, "B", true)).unwrap();
    let c = graph.add_node(action(&symbols, "C", true)).unwrap();
    graph.add_order_relation(a, c).unwrap();
    graph
        .add_temporal_constraint(b, c, AllenRelation::Precedes)
        .unwrap();

    assert_eq!(graph.executable_nodes(0.1), vec![a, b]);
    graph.mark_completed(a).unwrap();
    assert!(graph.executable_nodes(0.1).is_empty());
    graph.mark_completed(b).unwrap();
    assert_eq!(graph.executable_nodes(0.1), vec![c]);
}

#[derive(Debug, Clone, Copy)]
enum SourceState {
    Idle,
    Running,
    Done,
}

/// Builds `P -> T` (order) plus `S -> T` (`relation`), drives `S` into `source`, completes
/// `P` and reports whether `T` is released on the next tick.
fn target_released(relation: AllenRelation, source: SourceState, dt: f32) -> bool {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let p = graph.add_node(action(&symbols, "P", true)).unwrap();
    let s = graph.add_node(action(&symbols, "S", true)).unwrap();
    let t = graph.add_node(action(&symbols, "T", true)).unwrap();
    graph.add_order_relation(p, t).unwrap();
    graph.add_temporal_constraint(s, t, relation).unwrap();
    if let SourceState::Idle = source {
        // Q never completes, so S never starts.
        let q = graph.add_node(action(&symbols, "Q", true)).unwrap();
        graph.add_order_relation(q, s).unwrap();
    }

    let started = graph.executable_nodes(dt);
    assert_eq!(started.contains(&s), !matches!(source, SourceState::Idle));
    assert!(!started.contains(&t));
    if let SourceState::Done = source {
        graph.mark_completed(s).unwrap();
    }
    graph.mark_completed(p).unwrap();

    graph.executable_nodes(dt).contains(&t)
}

#[test]
fn temporal_relations_gate_a_node_with_predecessors() {
    use AllenRelation::*;
    use SourceState::*;

    // The waiting target has no timestamps yet, so equality relations hold only against a
    // source that has no matching timestamp either.
    let cases = [
        (Precedes, Done, 0.1, true),
        (Precedes, Running, 0.1, false),
        (Meets, Done, 0.1, true),
        (Meets, Running, 0.1, false),
        (Starts, Idle, 0.1, true),
        (Starts, Running, 0.1, false),
        (Starts, Done, 0.1, false),
        (Finishes, Idle, 0.1, true),
        (Finishes, Running, 0.1, true),
        (Finishes, Done, 0.1, false),
        (Equals, Idle, 0.1, true),
        (Equals, Running, 0.1, false),
        (Equals, Done, 0.1, false),
        (Contains, Idle, 0.1, true),
        (Contains, Done, 0.0, true),
        (Contains, Running, 0.1, false),
        (Contains, Done, 0.1, false),
        // A waiting target is not executing, so its window cannot overlap anything yet.
        (Overlaps, Idle, 0.1, false),
        (Overlaps, Running, 0.1, false),
        (Overlaps, Done, 0.1, false),
    ];

    for (relation, source, dt, expected) in cases {
        assert_eq!(
            target_released(relation, source, dt),
            expected,
            "{relation:?} with source {source:?} at dt={dt}"
        );
    }
}

#[test]
fn temporal_constraints_alone_do_not_gate_roots() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    let b = graph.add_node(action(&symbols, "B", true)).unwrap();
    graph
        .add_temporal_constraint(a, b, AllenRelation::Overlaps)
        .unwrap();

    assert_eq!(graph.executable_nodes(0.1), vec![a, b]);
}

#[test]
fn dangling_and_self_edges_are_rejected() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let mut other = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    let stranger = other.add_node(action(&symbols, "X", true)).unwrap();

    assert_eq!(
        graph.add_order_relation(a, stranger),
        Err(GraphError::UnknownNode(stranger))
    );
    assert_eq!(
        graph.add_temporal_constraint(stranger, a, AllenRelation::Meets),
        Err(GraphError::UnknownNode(stranger))
    );
    assert_eq!(graph.add_order_relation(a, a), Err(GraphError::SelfEdge(a)));
    assert!(graph.successors(a).is_empty());
    assert!(graph.predecessors(a).is_empty());
    assert_eq!(graph.temporal_constraint(a, a), None);
}

#[test]
fn only_actions_can_join_a_graph() {
    let mut flow = FlowNode::default();

    let err = flow
        .add_child(Node::flow("nested", FlowNode::default()))
        .unwrap_err();

    assert_eq!(err, GraphError::NotAnAction("nested".to_string()));
    assert!(flow.graph().is_empty());
}

#[test]
fn execution_order_is_topological() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    let b = graph.add_node(action(&symbols, "B", true)).unwrap();
    let c = graph.add_node(action(&symbols, "C", true)).unwrap();
    graph.add_order_relation(a, c).unwrap();
    graph.add_order_relation(c, b).unwrap();

    assert_eq!(graph.execution_order(), vec![a, c, b]);
    assert!(!graph.has_cycle());

    graph.add_order_relation(b, a).unwrap();
    assert!(graph.has_cycle());
    assert_eq!(graph.execution_order().len(), 3);
}

#[test]
fn reset_clears_bookkeeping_and_clock() {
    let symbols = SymbolTable::shared();
    let mut graph = ActionGraph::new();
    let a = graph.add_node(action(&symbols, "A", true)).unwrap();
    graph.executable_nodes(0.5);
    graph.mark_completed(a).unwrap();

    graph.reset();

    assert_eq!(graph.elapsed(), 0.0);
    assert_eq!(graph.bookkeeping(a), Some(Default::default()));
    assert_eq!(graph.executable_nodes(0.1), vec![a]);
}

#[test]
fn plan_order_types_become_edges() {
    let symbols = SymbolTable::shared();
    let mut flow = FlowNode::default();
    let ids = flow
        .load_plan(Plan::new(
            vec![
                action(&symbols, "A", true),
                action(&symbols, "B", true),
                action(&symbols, "C", true),
                action(&symbols, "D", true),
            ],
            vec![OrderType::Total, OrderType::StrictParallel, OrderType::Parallel],
        ))
        .unwrap();
    let graph = flow.graph();
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

    assert_eq!(graph.predecessors(b), vec![a]);
    assert_eq!(graph.temporal_constraint(a, b), Some(AllenRelation::Meets));
    assert!(graph.predecessors(c).is_empty());
    assert_eq!(graph.temporal_constraint(b, c), Some(AllenRelation::Starts));
    assert!(graph.predecessors(d).is_empty());
    assert_eq!(graph.temporal_constraint(c, d), None);
}

#[test]
fn static_plan_is_handed_out_once() {
    let symbols = SymbolTable::shared();
    let bb = Blackboard::new(symbols.clone());
    let mut provider = StaticPlan::new(Plan::sequential(vec![
        action(&symbols, "A", true),
        action(&symbols, "B", true),
    ]));
    let mut flow = FlowNode::default();

    assert_eq!(flow.request_plan(&mut provider, &bb), Ok(true));
    assert_eq!(flow.request_plan(&mut provider, &bb), Ok(false));
    assert_eq!(flow.graph().len(), 2);
}

#[test]
fn criteria_table() {
    assert!(SuccessCriteria::All.is_met(3, 3));
    assert!(!SuccessCriteria::All.is_met(2, 3));
    assert!(SuccessCriteria::Any.is_met(1, 3));
    assert!(!SuccessCriteria::Any.is_met(0, 3));
    assert!(SuccessCriteria::Count(2).is_met(2, 3));
    assert!(SuccessCriteria::Percentage(0.5).is_met(2, 4));
    assert!(!SuccessCriteria::Percentage(0.5).is_met(1, 4));
    assert!(!SuccessCriteria::Any.is_met(0, 0));
}
