//! Symbols, blackboard, predicates and type schemas for the behavior-tree engine.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod call;
pub mod entity;
pub mod error;
pub mod lock;
pub mod predicate;
pub mod schema;
pub mod sink;
pub mod state;
pub mod symbol;
pub mod value;

pub use blackboard::{ActionInstanceRecord, BbKey, Blackboard, BlackboardValue};
pub use call::CallExpr;
pub use entity::{Entity, EntityCategory, EntityRef};
pub use error::{CoreError, Result};
pub use lock::SharedBlackboard;
pub use predicate::{ParamValue, Predicate};
pub use schema::{
    ActionLogic, ActionSchema, Bindings, EntitySchema, ParamKind, ParamSpec, PredicateArg,
    PredicateSchema, PredicateTemplate, SchemaRegistry,
};
pub use sink::{MemorySink, PredicateRecord, PredicateSink, SinkError};
pub use state::{State, StateKind};
pub use symbol::{Symbol, SymbolTable, MISSING_NAME};
pub use value::{Value, ValueKind};
