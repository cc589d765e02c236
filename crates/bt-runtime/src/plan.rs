//! Ready-made action sequences handed to a flow node by an external planner.

use bt_core::Blackboard;

use crate::node::Node;

/// Relation between two consecutive plan steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OrderType {
    /// No constraint.
    #[default]
    None,
    /// The next step starts right after this one completes.
    Total,
    /// Both steps start together.
    StrictParallel,
    /// Steps may run at the same time.
    Parallel,
    /// Ordering left to the scheduler.
    Partial,
}

/// Actions plus the order type linking each step to the next.
///
/// `orders[i]` relates `actions[i]` to `actions[i + 1]`; missing entries mean
/// [`OrderType::None`].
#[derive(Default)]
pub struct Plan {
    pub actions: Vec<Node>,
    pub orders: Vec<OrderType>,
}

impl Plan {
    pub fn new(actions: Vec<Node>, orders: Vec<OrderType>) -> Self {
        Self { actions, orders }
    }

    /// Every step totally ordered after the previous one.
    pub fn sequential(actions: Vec<Node>) -> Self {
        let orders = vec![OrderType::Total; actions.len().saturating_sub(1)];
        Self { actions, orders }
    }

    /// Every consecutive pair linked by the same order type.
    pub fn uniform(actions: Vec<Node>, order: OrderType) -> Self {
        let orders = vec![order; actions.len().saturating_sub(1)];
        Self { actions, orders }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

pub trait PlanProvider {
    /// Returns `None` when no plan is available.
    fn create_plan(&mut self, blackboard: &Blackboard) -> Option<Plan>;
}

/// Hands out a fixed plan once.
#[derive(Default)]
pub struct StaticPlan {
    plan: Option<Plan>,
}

impl StaticPlan {
    pub fn new(plan: Plan) -> Self {
        Self { plan: Some(plan) }
    }
}

impl PlanProvider for StaticPlan {
    fn create_plan(&mut self, _blackboard: &Blackboard) -> Option<Plan> {
        self.plan.take()
    }
}
