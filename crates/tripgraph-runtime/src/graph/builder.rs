use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tripgraph_core::error::GraphError;
use tripgraph_core::persistence::Checkpointer;
use tripgraph_core::state::GraphState;

use super::compiled::{CompiledGraph, Successor};
use super::node::Node;
use super::{END, START};

pub(crate) type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

struct Branch<S> {
    from: String,
    router: Router<S>,
    targets: Vec<String>,
}

/// Options applied when a graph is compiled.
#[derive(Clone, Default)]
pub struct CompileOptions {
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    /// Pause before these nodes run.
    pub interrupt_before: Vec<String>,
    /// Pause after these nodes have run and been checkpointed.
    pub interrupt_after: Vec<String>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_interrupt_before<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.interrupt_before = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_interrupt_after<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.interrupt_after = nodes.into_iter().map(Into::into).collect();
        self
    }
}

/// Graph under construction. Validation is deferred to [`StateGraph::compile`].
pub struct StateGraph<S: GraphState> {
    name: String,
    nodes: Vec<(String, Arc<dyn Node<S>>)>,
    edges: Vec<(String, String)>,
    branches: Vec<Branch<S>>,
}

impl<S: GraphState> StateGraph<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            branches: Vec::new(),
        }
    }

    pub fn add_node(mut self, name: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        self.nodes.push((name.into(), Arc::new(node)));
        self
    }

    /// Unconditional edge. Use [`START`] for the entry edge and [`END`] to finish.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// After `from` runs, `router` picks the successor among `targets`.
    pub fn add_conditional_edges<R, I, T>(
        mut self,
        from: impl Into<String>,
        router: R,
        targets: I,
    ) -> Self
    where
        R: Fn(&S) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.branches.push(Branch {
            from: from.into(),
            router: Arc::new(router),
            targets: targets.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn compile(self, options: CompileOptions) -> Result<CompiledGraph<S>, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty(self.name));
        }

        let mut nodes = HashMap::new();
        for (name, node) in self.nodes {
            if name.is_empty() {
                return Err(GraphError::EmptyNodeName);
            }
            if name == START || name == END {
                return Err(GraphError::ReservedName(name));
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(GraphError::DuplicateNode(name));
            }
        }

        let mut entries = Vec::new();
        let mut successors: HashMap<String, Vec<Successor<S>>> = HashMap::new();
        for (from, to) in self.edges {
            if from == END || to == START || (from == START && to == END) {
                return Err(GraphError::InvalidEdge { from, to });
            }
            if to != END && !nodes.contains_key(&to) {
                return Err(GraphError::UnknownNode(to));
            }
            if from == START {
                entries.push(to);
                continue;
            }
            if !nodes.contains_key(&from) {
                return Err(GraphError::UnknownNode(from));
            }
            successors.entry(from).or_default().push(Successor::Direct(to));
        }

        for branch in self.branches {
            if branch.from == START || branch.from == END {
                return Err(GraphError::InvalidEdge {
                    from: branch.from,
                    to: branch.targets.join("|"),
                });
            }
            if !nodes.contains_key(&branch.from) {
                return Err(GraphError::UnknownNode(branch.from));
            }
            for target in &branch.targets {
                if target == START {
                    return Err(GraphError::InvalidEdge {
                        from: branch.from.clone(),
                        to: target.clone(),
                    });
                }
                if target != END && !nodes.contains_key(target) {
                    return Err(GraphError::UnknownNode(target.clone()));
                }
            }
            if branch.targets.is_empty() {
                return Err(GraphError::DeadEnd(branch.from));
            }
            successors
                .entry(branch.from)
                .or_default()
                .push(Successor::Branch {
                    router: branch.router,
                    targets: branch.targets.into_iter().collect(),
                });
        }

        if entries.len() != 1 {
            return Err(GraphError::EntryPoint(entries.len()));
        }
        let entry = entries.remove(0);

        let mut edges = HashMap::new();
        let mut names: Vec<&String> = nodes.keys().collect();
        names.sort();
        for name in names {
            let mut outgoing = successors.remove(name).unwrap_or_default();
            match outgoing.len() {
                0 => return Err(GraphError::DeadEnd(name.clone())),
                1 => {}
                _ => return Err(GraphError::Branching(name.clone())),
            }
            if let Some(successor) = outgoing.pop() {
                edges.insert(name.clone(), successor);
            }
        }

        let interrupt_before = validate_interrupts(&nodes, options.interrupt_before)?;
        let interrupt_after = validate_interrupts(&nodes, options.interrupt_after)?;

        warn_unreachable(&self.name, &entry, &edges, &nodes);

        tracing::debug!(
            graph = %self.name,
            nodes = nodes.len(),
            checkpointer = options.checkpointer.is_some(),
            "Compiled state graph"
        );

        Ok(CompiledGraph {
            name: self.name,
            nodes,
            entry,
            edges,
            checkpointer: options.checkpointer,
            interrupt_before,
            interrupt_after,
        })
    }
}

fn validate_interrupts<N>(
    nodes: &HashMap<String, N>,
    names: Vec<String>,
) -> Result<HashSet<String>, GraphError> {
    names
        .into_iter()
        .map(|name| {
            if nodes.contains_key(&name) {
                Ok(name)
            } else {
                Err(GraphError::UnknownInterrupt(name))
            }
        })
        .collect()
}

fn warn_unreachable<S, N>(
    graph: &str,
    entry: &str,
    edges: &HashMap<String, Successor<S>>,
    nodes: &HashMap<String, N>,
) {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([entry.to_string()]);
    while let Some(name) = queue.pop_front() {
        if name == END || !seen.insert(name.clone()) {
            continue;
        }
        match edges.get(&name) {
            Some(Successor::Direct(to)) => queue.push_back(to.clone()),
            Some(Successor::Branch { targets, .. }) => queue.extend(targets.iter().cloned()),
            None => {}
        }
    }
    for name in nodes.keys().filter(|name| !seen.contains(*name)) {
        tracing::warn!(graph = %graph, node = %name, "Node is not reachable from START");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node_fn;
    use tripgraph_core::state::MessagesState;
    use tripgraph_core::AgentMessage;

    fn noop() -> impl Node<MessagesState> {
        node_fn(|_state: MessagesState| async { Ok(Vec::<AgentMessage>::new()) })
    }

    fn linear() -> StateGraph<MessagesState> {
        StateGraph::new("linear")
            .add_node("a", noop())
            .add_node("b", noop())
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END)
    }

    #[test]
    fn compiles_linear_graph() {
        let graph = linear().compile(CompileOptions::new()).unwrap();
        assert_eq!(graph.entry(), "a");
        assert_eq!(graph.name(), "linear");
    }

    #[test]
    fn rejects_empty_graph() {
        let err = StateGraph::<MessagesState>::new("empty")
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::Empty(name) if name == "empty"));
    }

    #[test]
    fn rejects_reserved_and_duplicate_names() {
        let err = StateGraph::new("g")
            .add_node(END, noop())
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::ReservedName(_)));

        let err = linear()
            .add_node("a", noop())
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode(name) if name == "a"));

        let err = StateGraph::new("g")
            .add_node("", noop())
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::EmptyNodeName));
    }

    #[test]
    fn rejects_unknown_and_invalid_edges() {
        let err = linear()
            .add_edge("b", "missing")
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(name) if name == "missing"));

        let err = linear()
            .add_edge(END, "a")
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidEdge { .. }));
    }

    #[test]
    fn rejects_entry_edge_straight_to_end() {
        let err = StateGraph::new("g")
            .add_node("a", noop())
            .add_edge(START, END)
            .add_edge("a", END)
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::InvalidEdge { from, to } if from == START && to == END
        ));
    }

    #[test]
    fn compiled_graph_debug_lists_nodes() {
        let graph = linear().compile(CompileOptions::new()).unwrap();
        let text = format!("{graph:?}");
        assert!(text.contains(r#"name: "linear""#));
        assert!(text.contains(r#"nodes: ["a", "b"]"#));
    }

    #[test]
    fn requires_single_entry() {
        let err = StateGraph::new("g")
            .add_node("a", noop())
            .add_edge("a", END)
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::EntryPoint(0)));

        let err = linear()
            .add_edge(START, "b")
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::EntryPoint(2)));
    }

    #[test]
    fn rejects_branching_and_dead_ends() {
        let err = linear()
            .add_edge("a", END)
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::Branching(name) if name == "a"));

        let err = StateGraph::new("g")
            .add_node("a", noop())
            .add_node("b", noop())
            .add_edge(START, "a")
            .add_edge("a", "b")
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::DeadEnd(name) if name == "b"));
    }

    #[test]
    fn validates_conditional_targets() {
        let err = StateGraph::new("g")
            .add_node("a", noop())
            .add_edge(START, "a")
            .add_conditional_edges("a", |_: &MessagesState| END.to_string(), ["nowhere", END])
            .compile(CompileOptions::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(name) if name == "nowhere"));

        StateGraph::new("g")
            .add_node("a", noop())
            .add_edge(START, "a")
            .add_conditional_edges("a", |_: &MessagesState| END.to_string(), ["a", END])
            .compile(CompileOptions::new())
            .unwrap();
    }

    #[test]
    fn rejects_unknown_interrupts() {
        let err = linear()
            .compile(CompileOptions::new().with_interrupt_after(["c"]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownInterrupt(name) if name == "c"));
    }

    #[test]
    fn unreachable_nodes_still_compile() {
        linear()
            .add_node("island", noop())
            .add_edge("island", END)
            .compile(CompileOptions::new())
            .unwrap();
    }
}
