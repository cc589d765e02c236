//! Side-effecting hooks run while a node is ticked. Returning `false` fails the node.

use bt_core::{Blackboard, Symbol};

use crate::status::TickContext;

pub trait Service: Send {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> bool;
}

/// When a service runs relative to the node's decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Before decorators, on every tick, even once the node has finished.
    AlwaysOn,
    /// After decorators, only while the node is still running.
    General,
}

pub struct ServiceFn<F>
where
    F: FnMut(&TickContext, &mut Blackboard) -> bool + Send,
{
    f: F,
}

impl<F> ServiceFn<F>
where
    F: FnMut(&TickContext, &mut Blackboard) -> bool + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Service for ServiceFn<F>
where
    F: FnMut(&TickContext, &mut Blackboard) -> bool + Send,
{
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> bool {
        (self.f)(ctx, blackboard)
    }
}

/// Publishes the current tick number as an integer entry.
#[derive(Debug, Clone, Copy)]
pub struct TickCounter {
    key: Symbol,
}

impl TickCounter {
    pub fn new(key: Symbol) -> Self {
        Self { key }
    }
}

impl Service for TickCounter {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> bool {
        blackboard.set(self.key, ctx.tick as i64);
        true
    }
}

/// Accumulates delta time into a double entry.
#[derive(Debug, Clone, Copy)]
pub struct ElapsedTime {
    key: Symbol,
}

impl ElapsedTime {
    pub fn new(key: Symbol) -> Self {
        Self { key }
    }
}

impl Service for ElapsedTime {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> bool {
        let elapsed = blackboard.try_get::<f64>(self.key).unwrap_or(0.0);
        blackboard.set(self.key, elapsed + f64::from(ctx.dt_seconds));
        true
    }
}
