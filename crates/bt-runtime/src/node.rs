//! The tick state machine shared by every node kind.
//!
//! Each tick runs, in order: always-on services, decorators, the re-entry reset, general
//! services, the enter hook, node logic and finally the children hook. Any phase may end the
//! tick early; the node's status at that point is the tick result.

use std::fmt;

use bt_core::Blackboard;

use crate::action::ActionNode;
use crate::decorator::{Decorator, DecoratorSlot};
use crate::flow::FlowNode;
use crate::service::{Service, ServiceMode};
use crate::status::{NodeStatus, TickContext};
use crate::trace::{self, TraceEvent};

/// Kind-specific hooks driven by [`Node::tick`].
pub(crate) trait NodeBehavior {
    fn on_enter(&mut self, _name: &str, _ctx: &TickContext, _blackboard: &mut Blackboard) {}

    fn on_exit(&mut self, _name: &str, _ctx: &TickContext, _blackboard: &mut Blackboard) {}

    /// Returns `false` to end the tick with whatever status was set.
    fn run_node_logic(
        &mut self,
        name: &str,
        status: &mut NodeStatus,
        ctx: &TickContext,
        blackboard: &mut Blackboard,
    ) -> bool;

    /// Returns `false` to end the tick with whatever status was set.
    fn run_children(
        &mut self,
        name: &str,
        status: &mut NodeStatus,
        ctx: &TickContext,
        blackboard: &mut Blackboard,
    ) -> bool;

    fn has_children(&self) -> bool;

    fn reset(&mut self);
}

pub enum NodeKind {
    Flow(FlowNode),
    Action(ActionNode),
}

impl NodeKind {
    fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        match self {
            NodeKind::Flow(flow) => flow,
            NodeKind::Action(action) => action,
        }
    }
}

/// State every node carries regardless of kind.
struct NodeCore {
    name: String,
    status: NodeStatus,
    decorators: Vec<DecoratorSlot>,
    always_on: Vec<Box<dyn Service>>,
    services: Vec<Box<dyn Service>>,
    /// Whether decorators permitted the previous tick.
    permitted: bool,
    /// Set once the enter hook ran; cleared when the exit hook fires.
    can_send_exit: bool,
}

pub struct Node {
    core: NodeCore,
    kind: NodeKind,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NodeKind::Flow(_) => "flow",
            NodeKind::Action(_) => "action",
        };
        f.debug_struct("Node")
            .field("name", &self.core.name)
            .field("kind", &kind)
            .field("status", &self.core.status)
            .finish_non_exhaustive()
    }
}

impl Node {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            core: NodeCore {
                name: name.into(),
                status: NodeStatus::Uninitialized,
                decorators: Vec::new(),
                always_on: Vec::new(),
                services: Vec::new(),
                permitted: false,
                can_send_exit: false,
            },
            kind,
        }
    }

    pub fn flow(name: impl Into<String>, flow: FlowNode) -> Self {
        Self::with_kind(name, NodeKind::Flow(flow))
    }

    pub fn action(name: impl Into<String>, action: ActionNode) -> Self {
        Self::with_kind(name, NodeKind::Action(action))
    }

    pub fn with_decorator(mut self, decorator: impl Decorator + 'static, inverted: bool) -> Self {
        self.add_decorator(Box::new(decorator), inverted);
        self
    }

    pub fn with_service(mut self, service: impl Service + 'static, mode: ServiceMode) -> Self {
        self.add_service(Box::new(service), mode);
        self
    }

    pub fn add_decorator(&mut self, decorator: Box<dyn Decorator>, inverted: bool) {
        self.core
            .decorators
            .push(DecoratorSlot::new(decorator, inverted));
    }

    pub fn add_service(&mut self, service: Box<dyn Service>, mode: ServiceMode) {
        match mode {
            ServiceMode::AlwaysOn => self.core.always_on.push(service),
            ServiceMode::General => self.core.services.push(service),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn status(&self) -> NodeStatus {
        self.core.status
    }

    pub fn has_finished(&self) -> bool {
        self.core.status.is_finished()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, NodeKind::Action(_))
    }

    pub fn as_flow(&self) -> Option<&FlowNode> {
        match &self.kind {
            NodeKind::Flow(flow) => Some(flow),
            NodeKind::Action(_) => None,
        }
    }

    pub fn as_flow_mut(&mut self) -> Option<&mut FlowNode> {
        match &mut self.kind {
            NodeKind::Flow(flow) => Some(flow),
            NodeKind::Action(_) => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionNode> {
        match &self.kind {
            NodeKind::Action(action) => Some(action),
            NodeKind::Flow(_) => None,
        }
    }

    /// Rewinds the node (and everything it owns) to `ReadyToTick`.
    pub fn reset(&mut self) {
        self.core.status = NodeStatus::ReadyToTick;
        self.core.can_send_exit = false;
        self.kind.behavior_mut().reset();
    }

    pub fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> NodeStatus {
        if self.core.status == NodeStatus::Uninitialized {
            self.reset_traced(ctx, blackboard);
        }

        self.run_phases(ctx, blackboard);

        if self.core.can_send_exit && self.core.status.is_finished() {
            self.send_exit(ctx, blackboard);
        }
        self.core.status
    }

    fn run_phases(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        for service in self.core.always_on.iter_mut() {
            if !service.tick(ctx, blackboard) {
                self.core.status = NodeStatus::Failed;
                return;
            }
        }

        let permitted = self
            .core
            .decorators
            .iter_mut()
            .all(|decorator| decorator.permits(ctx, blackboard));
        if !permitted {
            self.core.status = NodeStatus::Failed;
            if self.core.permitted && self.core.can_send_exit {
                self.send_exit(ctx, blackboard);
            }
            self.core.permitted = false;
            tracing::debug!(node = %self.core.name, tick = ctx.tick, "Node denied by decorator");
            trace::emit(
                blackboard,
                TraceEvent::new(ctx.tick, "node.denied", self.core.name.clone()),
            );
            return;
        }

        if !self.core.permitted {
            // A node still at ReadyToTick that never entered has nothing to rewind.
            if self.core.status != NodeStatus::ReadyToTick || self.core.can_send_exit {
                self.reset_traced(ctx, blackboard);
            }
            self.core.permitted = true;
        }

        if self.core.status.is_finished() {
            return;
        }

        for service in self.core.services.iter_mut() {
            if !service.tick(ctx, blackboard) {
                self.core.status = NodeStatus::Failed;
                return;
            }
        }

        let name = self.core.name.as_str();
        let behavior = self.kind.behavior_mut();

        if self.core.status == NodeStatus::ReadyToTick {
            behavior.on_enter(name, ctx, blackboard);
            self.core.can_send_exit = true;
            trace::emit(blackboard, TraceEvent::new(ctx.tick, "node.enter", name));
            if self.core.status.is_finished() {
                return;
            }
        }

        if !behavior.run_node_logic(name, &mut self.core.status, ctx, blackboard) {
            return;
        }

        if behavior.has_children() {
            behavior.run_children(name, &mut self.core.status, ctx, blackboard);
        }
    }

    fn reset_traced(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.reset();
        tracing::trace!(node = %self.core.name, tick = ctx.tick, "Node reset");
        trace::emit(
            blackboard,
            TraceEvent::new(ctx.tick, "node.reset", self.core.name.clone()),
        );
    }

    fn send_exit(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.core.can_send_exit = false;
        self.kind
            .behavior_mut()
            .on_exit(&self.core.name, ctx, blackboard);
        trace::emit(
            blackboard,
            TraceEvent::new(ctx.tick, "node.exit", self.core.name.clone()),
        );
    }
}
