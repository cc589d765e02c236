use bt_core::CoreError;
use thiserror::Error;

use crate::graph::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} is not part of this graph")]
    UnknownNode(NodeId),

    #[error("edge from node {0} to itself")]
    SelfEdge(NodeId),

    #[error("only action nodes can be scheduled, '{0}' is a flow node")]
    NotAnAction(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: {source}")]
    Apply {
        line: usize,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
