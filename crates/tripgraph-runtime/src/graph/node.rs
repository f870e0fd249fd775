use std::future::Future;

use async_trait::async_trait;
use tripgraph_core::config::RunConfig;
use tripgraph_core::state::GraphState;

/// One step of a graph: reads the current state, returns a partial update.
///
/// `config` is the run's configuration, so nodes can see the thread they
/// run on.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    async fn run(&self, state: S, config: &RunConfig) -> anyhow::Result<S::Update>;
}

/// Adapter turning an async closure over the state into a [`Node`].
pub struct FnNode<F> {
    func: F,
}

/// Wraps `func` so it can be passed to [`StateGraph::add_node`](super::StateGraph::add_node).
pub fn node_fn<S, F, Fut>(func: F) -> FnNode<F>
where
    S: GraphState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<S::Update>> + Send,
{
    FnNode { func }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<F>
where
    S: GraphState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<S::Update>> + Send,
{
    async fn run(&self, state: S, _config: &RunConfig) -> anyhow::Result<S::Update> {
        (self.func)(state).await
    }
}
