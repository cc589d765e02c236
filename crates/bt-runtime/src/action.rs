use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bt_core::{ActionLogic, Bindings, Blackboard, State, StateKind, Symbol};

use crate::node::NodeBehavior;
use crate::status::{NodeStatus, TickContext};

/// Leaf node running one instantiated action.
pub struct ActionNode {
    action_type: Symbol,
    instance: Symbol,
    bindings: Bindings,
    preconditions: State,
    effects: State,
    logic: ActionLogic,
}

impl ActionNode {
    pub fn new(
        action_type: Symbol,
        instance: Symbol,
        bindings: Bindings,
        preconditions: State,
        effects: State,
        logic: ActionLogic,
    ) -> Self {
        Self {
            action_type,
            instance,
            bindings,
            preconditions,
            effects,
            logic,
        }
    }

    /// An action with no bindings, preconditions or effects.
    pub fn from_fn<F>(action_type: Symbol, instance: Symbol, logic: F) -> Self
    where
        F: Fn(&Bindings, f32) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::new(
            action_type,
            instance,
            Bindings::new(),
            State::new(StateKind::Precondition, instance),
            State::new(StateKind::Effect, instance),
            Arc::new(logic),
        )
    }

    pub fn action_type(&self) -> Symbol {
        self.action_type
    }

    pub fn instance(&self) -> Symbol {
        self.instance
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn preconditions(&self) -> &State {
        &self.preconditions
    }

    pub fn effects(&self) -> &State {
        &self.effects
    }

    /// Whether every non-negated precondition is asserted on the blackboard and no negated
    /// one is.
    pub fn preconditions_hold(&self, blackboard: &Blackboard) -> bool {
        self.preconditions
            .iter()
            .all(|(_, p)| blackboard.has_similar_predicate(p) != p.is_negated())
    }
}

impl NodeBehavior for ActionNode {
    fn run_node_logic(
        &mut self,
        name: &str,
        status: &mut NodeStatus,
        ctx: &TickContext,
        _blackboard: &mut Blackboard,
    ) -> bool {
        *status = NodeStatus::InProgress;

        let logic = &self.logic;
        let bindings = &self.bindings;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| logic(bindings, ctx.dt_seconds)));

        *status = match outcome {
            Ok(Ok(true)) => NodeStatus::Succeeded,
            Ok(Ok(false)) => NodeStatus::Failed,
            Ok(Err(err)) => {
                tracing::warn!(action = name, error = %err, "Action logic returned an error");
                NodeStatus::Failed
            }
            Err(payload) => {
                tracing::warn!(
                    action = name,
                    panic = panic_message(payload.as_ref()),
                    "Action logic panicked"
                );
                NodeStatus::Failed
            }
        };
        *status == NodeStatus::Succeeded
    }

    fn run_children(
        &mut self,
        _name: &str,
        _status: &mut NodeStatus,
        _ctx: &TickContext,
        _blackboard: &mut Blackboard,
    ) -> bool {
        true
    }

    fn has_children(&self) -> bool {
        false
    }

    fn reset(&mut self) {}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
