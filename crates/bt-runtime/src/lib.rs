//! Behavior Tree runtime with a temporal action scheduler, built on `bt-core`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod criteria;
pub mod decorator;
pub mod error;
pub mod factory;
pub mod flow;
pub mod graph;
pub mod instance;
pub mod loader;
pub mod node;
pub mod plan;
pub mod service;
pub mod status;
pub mod trace;
pub mod tree;

pub use action::ActionNode;
pub use criteria::SuccessCriteria;
pub use decorator::{BlackboardFlag, Condition, Decorator, PredicateHolds};
pub use error::{GraphError, LoadError};
pub use factory::ActionFactory;
pub use flow::{FlowNode, FlowResults};
pub use graph::{ActionGraph, AllenRelation, Bookkeeping, NodeId, MEETS_EPSILON};
pub use instance::{parse_document, parse_line, InstanceLine, ParsedLine};
pub use loader::{Loaded, Loader};
pub use node::{Node, NodeKind};
pub use plan::{OrderType, Plan, PlanProvider, StaticPlan};
pub use service::{ElapsedTime, Service, ServiceFn, ServiceMode, TickCounter};
pub use status::{NodeStatus, TickContext};
pub use trace::{TraceEvent, TraceLog, TRACE_LOG};
pub use tree::BehaviorTree;
