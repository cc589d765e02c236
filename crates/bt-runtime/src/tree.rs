use bt_core::Blackboard;

use crate::decorator::Decorator;
use crate::error::GraphError;
use crate::flow::FlowNode;
use crate::graph::NodeId;
use crate::node::Node;
use crate::service::{Service, ServiceMode};
use crate::status::{NodeStatus, TickContext};

/// Top-level driver: owns the blackboard and a root flow node.
pub struct BehaviorTree {
    blackboard: Blackboard,
    root: Node,
    ticks: u64,
    last_status: NodeStatus,
}

impl BehaviorTree {
    pub fn new(name: impl Into<String>, blackboard: Blackboard, root: FlowNode) -> Self {
        Self {
            blackboard,
            root: Node::flow(name, root),
            ticks: 0,
            last_status: NodeStatus::Uninitialized,
        }
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    /// Advances the whole tree by one frame. Tick numbers start at 1.
    pub fn tick(&mut self, dt_seconds: f32) -> NodeStatus {
        self.ticks += 1;
        let ctx = TickContext::new(self.ticks, dt_seconds);
        let status = self.root.tick(&ctx, &mut self.blackboard);
        if status != self.last_status {
            tracing::debug!(tree = self.root.name(), tick = self.ticks, ?status, "Tree status changed");
        }
        self.last_status = status;
        status
    }

    /// Ticks until the root finishes or `max_ticks` ticks have run.
    pub fn run(&mut self, dt_seconds: f32, max_ticks: u64) -> NodeStatus {
        for _ in 0..max_ticks {
            if self.tick(dt_seconds).is_finished() {
                break;
            }
        }
        self.last_status
    }

    /// Rewinds the tree so the next tick starts over. Blackboard contents are kept.
    pub fn reset(&mut self) {
        self.root.reset();
        self.last_status = NodeStatus::ReadyToTick;
    }

    pub fn has_finished(&self) -> bool {
        self.root.has_finished()
    }

    pub fn last_status(&self) -> NodeStatus {
        self.last_status
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Gates the whole tree. The root is reset whenever the decorator lets it run again.
    pub fn add_root_decorator(&mut self, decorator: Box<dyn Decorator>, inverted: bool) {
        self.root.add_decorator(decorator, inverted);
    }

    pub fn add_root_service(&mut self, service: Box<dyn Service>, mode: ServiceMode) {
        self.root.add_service(service, mode);
    }

    pub fn flow(&self) -> &FlowNode {
        match self.root.as_flow() {
            Some(flow) => flow,
            None => unreachable!("tree root is always a flow node"),
        }
    }

    pub fn flow_mut(&mut self) -> &mut FlowNode {
        match self.root.as_flow_mut() {
            Some(flow) => flow,
            None => unreachable!("tree root is always a flow node"),
        }
    }

    pub fn add_child_to_root(&mut self, node: Node) -> Result<NodeId, GraphError> {
        self.flow_mut().add_child(node)
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn into_blackboard(self) -> Blackboard {
        self.blackboard
    }
}
