use bt_core::Blackboard;

use crate::criteria::SuccessCriteria;
use crate::error::GraphError;
use crate::graph::{ActionGraph, AllenRelation, NodeId};
use crate::node::{Node, NodeBehavior};
use crate::plan::{OrderType, Plan, PlanProvider};
use crate::status::{NodeStatus, TickContext};
use crate::trace::{self, TraceEvent};

/// Runs the actions of its [`ActionGraph`] as the graph allows and aggregates their outcomes.
///
/// Each tick the node ticks every in-flight and newly executable action once, reporting
/// finished ones back to the graph. Once every action has finished the node succeeds or fails
/// according to its [`SuccessCriteria`].
#[derive(Debug, Default)]
pub struct FlowNode {
    graph: ActionGraph,
    criteria: SuccessCriteria,
}

/// Child outcome counts at the time of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowResults {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

impl FlowNode {
    pub fn new(criteria: SuccessCriteria) -> Self {
        Self {
            graph: ActionGraph::new(),
            criteria,
        }
    }

    pub fn criteria(&self) -> SuccessCriteria {
        self.criteria
    }

    pub fn set_criteria(&mut self, criteria: SuccessCriteria) {
        self.criteria = criteria;
    }

    pub fn graph(&self) -> &ActionGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ActionGraph {
        &mut self.graph
    }

    pub fn add_child(&mut self, node: Node) -> Result<NodeId, GraphError> {
        self.graph.add_node(node)
    }

    pub fn add_order_relation(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.graph.add_order_relation(from, to)
    }

    pub fn add_temporal_constraint(
        &mut self,
        from: NodeId,
        to: NodeId,
        relation: AllenRelation,
    ) -> Result<(), GraphError> {
        self.graph.add_temporal_constraint(from, to, relation)
    }

    /// Adds every plan step, linking consecutive steps per their order type:
    /// `Total` becomes an order relation plus `Meets`, `StrictParallel` becomes `Starts`.
    pub fn load_plan(&mut self, plan: Plan) -> Result<Vec<NodeId>, GraphError> {
        let Plan { actions, orders } = plan;
        let mut ids = Vec::with_capacity(actions.len());
        for action in actions {
            ids.push(self.graph.add_node(action)?);
        }

        for (i, pair) in ids.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            match orders.get(i).copied().unwrap_or_default() {
                OrderType::Total => {
                    self.graph.add_order_relation(from, to)?;
                    self.graph
                        .add_temporal_constraint(from, to, AllenRelation::Meets)?;
                }
                OrderType::StrictParallel => {
                    self.graph
                        .add_temporal_constraint(from, to, AllenRelation::Starts)?;
                }
                OrderType::Parallel | OrderType::Partial | OrderType::None => {}
            }
        }
        Ok(ids)
    }

    /// Asks `provider` for a plan and loads it. Returns `false` when none was offered.
    pub fn request_plan(
        &mut self,
        provider: &mut dyn PlanProvider,
        blackboard: &Blackboard,
    ) -> Result<bool, GraphError> {
        match provider.create_plan(blackboard) {
            Some(plan) => {
                tracing::info!(steps = plan.len(), "Loading plan");
                self.load_plan(plan)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn results(&self) -> FlowResults {
        let mut results = FlowResults {
            total: self.graph.len(),
            ..FlowResults::default()
        };
        for node in self.graph.nodes() {
            match node.status() {
                NodeStatus::Succeeded => results.succeeded += 1,
                NodeStatus::Failed => results.failed += 1,
                _ => {}
            }
        }
        results
    }
}

impl NodeBehavior for FlowNode {
    fn run_node_logic(
        &mut self,
        name: &str,
        status: &mut NodeStatus,
        ctx: &TickContext,
        blackboard: &mut Blackboard,
    ) -> bool {
        *status = NodeStatus::InProgress;

        let mut due = self.graph.in_flight();
        due.extend(self.graph.executable_nodes(ctx.dt_seconds));

        for id in due {
            let Some(node) = self.graph.node_mut(id) else {
                continue;
            };
            let child = node.name().to_string();
            trace::emit(blackboard, TraceEvent::new(ctx.tick, "graph.tick", child.as_str()));
            if node.tick(ctx, blackboard).is_finished() {
                // `id` came from this graph.
                let _ = self.graph.mark_completed(id);
                tracing::debug!(flow = name, node = %child, tick = ctx.tick, "Node completed");
                trace::emit(blackboard, TraceEvent::new(ctx.tick, "graph.complete", child));
            }
        }
        true
    }

    fn run_children(
        &mut self,
        name: &str,
        status: &mut NodeStatus,
        _ctx: &TickContext,
        _blackboard: &mut Blackboard,
    ) -> bool {
        if !self.graph.all_finished() {
            *status = NodeStatus::InProgress;
            return true;
        }

        let (succeeded, total) = self.graph.outcome();
        let outcome = if self.criteria.is_met(succeeded, total) {
            NodeStatus::Succeeded
        } else {
            NodeStatus::Failed
        };
        tracing::debug!(flow = name, succeeded, total, status = ?outcome, "Flow finished");
        *status = outcome;
        false
    }

    fn has_children(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.graph.reset();
        for node in self.graph.nodes_mut() {
            node.reset();
        }
    }
}
