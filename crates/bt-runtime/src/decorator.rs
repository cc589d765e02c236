//! Guards evaluated before a node's logic. A denied guard fails the node for that tick.

use bt_core::{Blackboard, Predicate, Symbol};

use crate::status::TickContext;

pub trait Decorator: Send {
    fn evaluate(&mut self, ctx: &TickContext, blackboard: &Blackboard) -> bool;
}

/// A decorator plus its inversion flag, as attached to a node.
pub(crate) struct DecoratorSlot {
    decorator: Box<dyn Decorator>,
    inverted: bool,
}

impl DecoratorSlot {
    pub(crate) fn new(decorator: Box<dyn Decorator>, inverted: bool) -> Self {
        Self {
            decorator,
            inverted,
        }
    }

    pub(crate) fn permits(&mut self, ctx: &TickContext, blackboard: &Blackboard) -> bool {
        self.decorator.evaluate(ctx, blackboard) ^ self.inverted
    }
}

/// Closure-backed decorator.
pub struct Condition<F>
where
    F: FnMut(&TickContext, &Blackboard) -> bool + Send,
{
    predicate: F,
}

impl<F> Condition<F>
where
    F: FnMut(&TickContext, &Blackboard) -> bool + Send,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> Decorator for Condition<F>
where
    F: FnMut(&TickContext, &Blackboard) -> bool + Send,
{
    fn evaluate(&mut self, ctx: &TickContext, blackboard: &Blackboard) -> bool {
        (self.predicate)(ctx, blackboard)
    }
}

/// Permits while a boolean blackboard entry is `true`. A missing entry denies.
#[derive(Debug, Clone, Copy)]
pub struct BlackboardFlag {
    key: Symbol,
}

impl BlackboardFlag {
    pub fn new(key: Symbol) -> Self {
        Self { key }
    }
}

impl Decorator for BlackboardFlag {
    fn evaluate(&mut self, _ctx: &TickContext, blackboard: &Blackboard) -> bool {
        blackboard.try_get::<bool>(self.key).unwrap_or(false)
    }
}

/// Permits while a predicate with the same signature is asserted on the blackboard.
#[derive(Debug, Clone)]
pub struct PredicateHolds {
    predicate: Predicate,
}

impl PredicateHolds {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

impl Decorator for PredicateHolds {
    fn evaluate(&mut self, _ctx: &TickContext, blackboard: &Blackboard) -> bool {
        blackboard.has_similar_predicate(&self.predicate)
    }
}
