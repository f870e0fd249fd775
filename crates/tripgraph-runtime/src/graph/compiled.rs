use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_stream::try_stream;
use chrono::Utc;
use futures::StreamExt;
use serde_json::{Map, Value};
use tripgraph_core::config::RunConfig;
use tripgraph_core::error::GraphError;
use tripgraph_core::interrupt::{GraphInterrupt, InterruptKind};
use tripgraph_core::persistence::{
    Checkpoint, CheckpointMetadata, CheckpointSource, Checkpointer, ThreadId,
};
use tripgraph_core::state::GraphState;
use uuid::Uuid;

use super::builder::Router;
use super::node::Node;
use super::stream::{GraphStream, StreamChunk, StreamMode};
use super::{END, START};

pub(crate) enum Successor<S> {
    Direct(String),
    Branch {
        router: Router<S>,
        targets: HashSet<String>,
    },
}

/// Point-in-time view of a thread, decoded from a checkpoint.
#[derive(Debug, Clone)]
pub struct StateSnapshot<S> {
    pub values: S,
    /// Nodes that run when the thread is resumed. Empty once the run finished.
    pub next: Vec<String>,
    pub checkpoint_id: String,
    pub parent_id: Option<String>,
    pub metadata: CheckpointMetadata,
}

impl<S: GraphState> StateSnapshot<S> {
    fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, GraphError> {
        Ok(Self {
            values: serde_json::from_value(checkpoint.values)?,
            next: checkpoint.next,
            checkpoint_id: checkpoint.id,
            parent_id: checkpoint.parent_id,
            metadata: checkpoint.metadata,
        })
    }
}

/// Validated, executable graph produced by [`StateGraph::compile`](super::StateGraph::compile).
pub struct CompiledGraph<S: GraphState> {
    pub(crate) name: String,
    pub(crate) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(crate) entry: String,
    pub(crate) edges: HashMap<String, Successor<S>>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer>>,
    pub(crate) interrupt_before: HashSet<String>,
    pub(crate) interrupt_after: HashSet<String>,
}

impl<S: GraphState> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut nodes: Vec<&String> = self.nodes.keys().collect();
        nodes.sort();
        f.debug_struct("CompiledGraph")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("nodes", &nodes)
            .field("checkpointer", &self.checkpointer.is_some())
            .finish_non_exhaustive()
    }
}

struct Saved<'a> {
    source: CheckpointSource,
    step: i64,
    writes: Map<String, Value>,
    next: &'a [String],
}

impl<S: GraphState> CompiledGraph<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer>> {
        self.checkpointer.as_ref()
    }

    /// Runs until `END` or an interrupt and returns the last state.
    pub async fn invoke(
        &self,
        input: Option<S::Update>,
        config: RunConfig,
    ) -> Result<S, GraphError> {
        let mut stream = self.stream(input, config.clone(), StreamMode::Values);
        let mut last = None;
        while let Some(chunk) = stream.next().await {
            if let StreamChunk::Values(state) = chunk? {
                last = Some(state);
            }
        }
        match last {
            Some(state) => Ok(state),
            None => Ok(self
                .get_state(&config)
                .await?
                .map(|snapshot| snapshot.values)
                .unwrap_or_default()),
        }
    }

    /// Streams a run.
    ///
    /// With `input`, the thread's saved state (if any) receives the update and
    /// the run starts at the entry node. Without `input`, the run resumes from
    /// the pending nodes of the latest (or configured) checkpoint.
    pub fn stream(
        &self,
        input: Option<S::Update>,
        config: RunConfig,
        mode: StreamMode,
    ) -> GraphStream<'_, S> {
        Box::pin(try_stream! {
            let thread_id = self.thread_for(&config)?;
            let resuming = input.is_none();

            let saved = match &thread_id {
                Some(thread_id) => self.load(thread_id, config.checkpoint_id.as_deref()).await?,
                None => None,
            };

            let mut state: S;
            let mut parent_id: Option<String>;
            let mut step: i64;
            let mut current: Option<String>;

            match input {
                Some(input) => {
                    match saved {
                        Some(checkpoint) => {
                            step = checkpoint.metadata.step + 1;
                            parent_id = Some(checkpoint.id);
                            state = serde_json::from_value(checkpoint.values)?;
                        }
                        None => {
                            step = -1;
                            parent_id = None;
                            state = S::default();
                        }
                    }
                    let writes = single_write(START, &input)?;
                    state.apply(input);
                    let next = vec![self.entry.clone()];
                    let saved_id = self
                        .save(
                            thread_id.as_ref(),
                            parent_id.clone(),
                            &state,
                            Saved { source: CheckpointSource::Input, step, writes, next: &next },
                        )
                        .await?;
                    if saved_id.is_some() {
                        parent_id = saved_id;
                    }
                    if mode == StreamMode::Values {
                        yield StreamChunk::Values(state.clone());
                    }
                    current = Some(self.entry.clone());
                }
                None => {
                    if self.checkpointer.is_none() {
                        Err::<(), _>(GraphError::NoCheckpointer)?;
                    }
                    let thread = thread_id.clone().unwrap_or_default();
                    let checkpoint = saved.ok_or_else(|| GraphError::NoCheckpoint(thread.clone()))?;
                    tracing::debug!(
                        graph = %self.name,
                        thread_id = %thread,
                        checkpoint_id = %checkpoint.id,
                        next = ?checkpoint.next,
                        "Resuming from checkpoint"
                    );
                    step = checkpoint.metadata.step;
                    current = checkpoint.next.first().cloned();
                    parent_id = Some(checkpoint.id);
                    state = serde_json::from_value(checkpoint.values)?;
                }
            }

            let mut skip_interrupt_before = resuming;
            let mut executed = 0usize;
            while let Some(node_name) = current.take() {
                if !skip_interrupt_before && self.interrupt_before.contains(&node_name) {
                    tracing::info!(graph = %self.name, node = %node_name, "Interrupted before node");
                    yield StreamChunk::Interrupted(GraphInterrupt {
                        kind: InterruptKind::Before,
                        node: node_name.clone(),
                        checkpoint_id: parent_id.clone(),
                        next: vec![node_name],
                    });
                    break;
                }
                skip_interrupt_before = false;

                if executed >= config.recursion_limit {
                    Err::<(), _>(GraphError::RecursionLimit(config.recursion_limit))?;
                }
                executed += 1;

                let node = self
                    .nodes
                    .get(&node_name)
                    .ok_or_else(|| GraphError::UnknownNode(node_name.clone()))?;
                tracing::debug!(graph = %self.name, node = %node_name, step, "Running node");
                let update = node
                    .run(state.clone(), &config)
                    .await
                    .map_err(|err| GraphError::node(node_name.clone(), err))?;

                let writes = single_write(&node_name, &update)?;
                let update_chunk = match mode {
                    StreamMode::Updates => Some(update.clone()),
                    StreamMode::Values => None,
                };
                state.apply(update);
                let next = self.successor(&node_name, &state)?;
                step += 1;
                let pending: Vec<String> = next.iter().cloned().collect();
                let saved_id = self
                    .save(
                        thread_id.as_ref(),
                        parent_id.clone(),
                        &state,
                        Saved { source: CheckpointSource::Loop, step, writes, next: &pending },
                    )
                    .await?;
                if saved_id.is_some() {
                    parent_id = saved_id;
                }

                if let Some(update) = update_chunk {
                    yield StreamChunk::Updates { node: node_name.clone(), update };
                } else {
                    yield StreamChunk::Values(state.clone());
                }

                if next.is_some() && self.interrupt_after.contains(&node_name) {
                    tracing::info!(graph = %self.name, node = %node_name, "Interrupted after node");
                    yield StreamChunk::Interrupted(GraphInterrupt {
                        kind: InterruptKind::After,
                        node: node_name,
                        checkpoint_id: parent_id.clone(),
                        next: pending,
                    });
                    break;
                }
                current = next;
            }
        })
    }

    /// Latest (or configured) snapshot of the thread.
    pub async fn get_state(
        &self,
        config: &RunConfig,
    ) -> Result<Option<StateSnapshot<S>>, GraphError> {
        let thread_id = self.require_thread(config)?;
        self.load(&thread_id, config.checkpoint_id.as_deref())
            .await?
            .map(StateSnapshot::from_checkpoint)
            .transpose()
    }

    /// Snapshots of the thread, newest first.
    pub async fn get_state_history(
        &self,
        config: &RunConfig,
        limit: Option<usize>,
    ) -> Result<Vec<StateSnapshot<S>>, GraphError> {
        let thread_id = self.require_thread(config)?;
        let checkpointer = self.checkpointer.as_ref().ok_or(GraphError::NoCheckpointer)?;
        checkpointer
            .list(&thread_id, limit)
            .await
            .map_err(GraphError::checkpoint)?
            .into_iter()
            .map(StateSnapshot::from_checkpoint)
            .collect()
    }

    /// Applies `update` to the thread's state as if `as_node` had produced it.
    ///
    /// With `as_node`, the pending nodes are recomputed from that node's edges.
    /// Without it, the pending nodes of the current checkpoint are kept (the
    /// entry node for an empty thread). Returns the new checkpoint id.
    pub async fn update_state(
        &self,
        config: &RunConfig,
        update: S::Update,
        as_node: Option<&str>,
    ) -> Result<String, GraphError> {
        let thread_id = self.require_thread(config)?;
        if let Some(node) = as_node {
            if !self.nodes.contains_key(node) {
                return Err(GraphError::UnknownNode(node.to_string()));
            }
        }

        let current = self.load(&thread_id, config.checkpoint_id.as_deref()).await?;
        let (mut state, parent_id, step, pending) = match current {
            Some(checkpoint) => (
                serde_json::from_value::<S>(checkpoint.values)?,
                Some(checkpoint.id),
                checkpoint.metadata.step + 1,
                checkpoint.next,
            ),
            None => (S::default(), None, -1, vec![self.entry.clone()]),
        };

        let writes = single_write(as_node.unwrap_or(START), &update)?;
        state.apply(update);
        let next = match as_node {
            Some(node) => self.successor(node, &state)?.into_iter().collect(),
            None => pending,
        };

        let id = self
            .save(
                Some(&thread_id),
                parent_id,
                &state,
                Saved {
                    source: CheckpointSource::Update,
                    step,
                    writes,
                    next: &next,
                },
            )
            .await?
            .ok_or(GraphError::NoCheckpointer)?;
        tracing::debug!(
            graph = %self.name,
            thread_id = %thread_id,
            checkpoint_id = %id,
            as_node = ?as_node,
            "State updated"
        );
        Ok(id)
    }

    /// Successor of `node` given the state after it ran; `None` means END.
    fn successor(&self, node: &str, state: &S) -> Result<Option<String>, GraphError> {
        let target = match self.edges.get(node) {
            Some(Successor::Direct(to)) => to.clone(),
            Some(Successor::Branch { router, targets }) => {
                let target = router(state);
                if !targets.contains(&target) {
                    return Err(GraphError::InvalidRoute {
                        node: node.to_string(),
                        target,
                    });
                }
                target
            }
            None => return Err(GraphError::DeadEnd(node.to_string())),
        };
        Ok((target != END).then_some(target))
    }

    fn thread_for(&self, config: &RunConfig) -> Result<Option<ThreadId>, GraphError> {
        match (&self.checkpointer, &config.thread_id) {
            (Some(_), None) => Err(GraphError::ThreadIdRequired),
            (Some(_), Some(thread_id)) => Ok(Some(thread_id.clone())),
            (None, _) => Ok(None),
        }
    }

    fn require_thread(&self, config: &RunConfig) -> Result<ThreadId, GraphError> {
        if self.checkpointer.is_none() {
            return Err(GraphError::NoCheckpointer);
        }
        config.thread_id.clone().ok_or(GraphError::ThreadIdRequired)
    }

    async fn load(
        &self,
        thread_id: &ThreadId,
        checkpoint_id: Option<&str>,
    ) -> Result<Option<Checkpoint>, GraphError> {
        match &self.checkpointer {
            Some(checkpointer) => checkpointer
                .get(thread_id, checkpoint_id)
                .await
                .map_err(GraphError::checkpoint),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        thread_id: Option<&ThreadId>,
        parent_id: Option<String>,
        state: &S,
        saved: Saved<'_>,
    ) -> Result<Option<String>, GraphError> {
        let (Some(checkpointer), Some(thread_id)) = (&self.checkpointer, thread_id) else {
            return Ok(None);
        };
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.clone(),
            parent_id,
            values: serde_json::to_value(state)?,
            next: saved.next.to_vec(),
            metadata: CheckpointMetadata {
                source: saved.source,
                step: saved.step,
                writes: saved.writes,
                created_at: Utc::now(),
            },
        };
        checkpointer
            .put(&checkpoint)
            .await
            .map_err(GraphError::checkpoint)?;
        tracing::debug!(
            graph = %self.name,
            thread_id = %thread_id,
            checkpoint_id = %checkpoint.id,
            step = saved.step,
            "Checkpoint saved"
        );
        Ok(Some(checkpoint.id))
    }
}

fn single_write<T: serde::Serialize>(key: &str, value: &T) -> Result<Map<String, Value>, GraphError> {
    let mut writes = Map::new();
    writes.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(writes)
}
