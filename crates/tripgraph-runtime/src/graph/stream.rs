use std::pin::Pin;

use futures::Stream;
use tripgraph_core::error::GraphError;
use tripgraph_core::interrupt::GraphInterrupt;
use tripgraph_core::state::GraphState;

/// What a streamed run emits after each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamMode {
    /// The full state after the input and after every node.
    #[default]
    Values,
    /// Only the update each node returned.
    Updates,
}

#[derive(Debug, Clone)]
pub enum StreamChunk<S: GraphState> {
    Values(S),
    Updates { node: String, update: S::Update },
    /// Always the last chunk of a paused run.
    Interrupted(GraphInterrupt),
}

impl<S: GraphState> StreamChunk<S> {
    pub fn values(&self) -> Option<&S> {
        match self {
            StreamChunk::Values(state) => Some(state),
            _ => None,
        }
    }

    pub fn interrupt(&self) -> Option<&GraphInterrupt> {
        match self {
            StreamChunk::Interrupted(interrupt) => Some(interrupt),
            _ => None,
        }
    }
}

pub type GraphStream<'a, S> =
    Pin<Box<dyn Stream<Item = Result<StreamChunk<S>, GraphError>> + Send + 'a>>;
