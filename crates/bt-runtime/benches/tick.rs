use bt_core::{Blackboard, SymbolTable};
use bt_runtime::{ActionNode, BehaviorTree, FlowNode, Node, Plan, SuccessCriteria};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn actions(symbols: &SymbolTable, count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| {
            let name = format!("act{i}");
            let sym = symbols.intern(&name);
            Node::action(name, ActionNode::from_fn(sym, sym, |_, _| Ok(true)))
        })
        .collect()
}

fn bench_parallel_flow(c: &mut Criterion) {
    let symbols = SymbolTable::shared();
    let mut flow = FlowNode::new(SuccessCriteria::All);
    for node in actions(&symbols, 32) {
        let _ = flow.add_child(node);
    }
    let mut tree = BehaviorTree::new("bench", Blackboard::new(symbols), flow);

    c.bench_function("bt-runtime/tick(parallel actions=32)", |b| {
        b.iter(|| {
            tree.reset();
            black_box(tree.tick(0.1));
        })
    });
}

fn bench_sequential_flow(c: &mut Criterion) {
    let symbols = SymbolTable::shared();
    let mut flow = FlowNode::new(SuccessCriteria::All);
    let _ = flow.load_plan(Plan::sequential(actions(&symbols, 32)));
    let mut tree = BehaviorTree::new("bench", Blackboard::new(symbols), flow);

    c.bench_function("bt-runtime/run(sequential actions=32)", |b| {
        b.iter(|| {
            tree.reset();
            black_box(tree.run(0.1, 64));
        })
    });
}

criterion_group!(benches, bench_parallel_flow, bench_sequential_flow);
criterion_main!(benches);
