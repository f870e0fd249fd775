use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while compiling or running a state graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph `{0}` has no nodes")]
    Empty(String),

    #[error("node name must not be empty")]
    EmptyNodeName,

    #[error("`{0}` is a reserved node name")]
    ReservedName(String),

    #[error("node `{0}` is already registered")]
    DuplicateNode(String),

    #[error("edge references unknown node `{0}`")]
    UnknownNode(String),

    #[error("invalid edge {from} -> {to}")]
    InvalidEdge { from: String, to: String },

    #[error("graph needs exactly one entry edge from START, found {0}")]
    EntryPoint(usize),

    #[error("node `{0}` has more than one outgoing edge")]
    Branching(String),

    #[error("node `{0}` is a dead end: it has no outgoing edge")]
    DeadEnd(String),

    #[error("interrupt references unknown node `{0}`")]
    UnknownInterrupt(String),

    #[error("router after `{node}` returned undeclared target `{target}`")]
    InvalidRoute { node: String, target: String },

    #[error("recursion limit of {0} reached without hitting END")]
    RecursionLimit(usize),

    #[error("thread_id is required when a checkpointer is configured")]
    ThreadIdRequired,

    #[error("resuming requires a checkpointer")]
    NoCheckpointer,

    #[error("no checkpoint found for thread `{0}`")]
    NoCheckpoint(String),

    #[error("node `{node}` failed: {source}")]
    Node {
        node: String,
        #[source]
        source: BoxError,
    },

    #[error("checkpoint store failed: {0}")]
    Checkpoint(#[source] BoxError),

    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn node(node: impl Into<String>, source: anyhow::Error) -> Self {
        GraphError::Node {
            node: node.into(),
            source: source.into(),
        }
    }

    pub fn checkpoint(source: anyhow::Error) -> Self {
        GraphError::Checkpoint(source.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn node_error_keeps_source() {
        let err = GraphError::node("hotelsFinder", anyhow::anyhow!("network down"));
        assert_eq!(err.to_string(), "node `hotelsFinder` failed: network down");
        assert!(err.source().is_some());
    }

    #[test]
    fn display_recursion_limit() {
        assert_eq!(
            GraphError::RecursionLimit(25).to_string(),
            "recursion limit of 25 reached without hitting END"
        );
    }
}
