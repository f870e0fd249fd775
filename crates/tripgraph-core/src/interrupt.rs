use serde::{Deserialize, Serialize};

/// Whether a run paused before or after the named node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterruptKind {
    Before,
    After,
}

/// Describes where a graph run paused. Resume by streaming the same thread
/// again without input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphInterrupt {
    pub kind: InterruptKind,
    pub node: String,
    /// Checkpoint holding the paused state.
    pub checkpoint_id: Option<String>,
    /// Nodes that will run on resume.
    pub next: Vec<String>,
}
