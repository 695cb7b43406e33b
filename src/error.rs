use thiserror::Error;

/// Failures surfaced by the layout entry points. Degenerate inputs (empty
/// graph, single node, disconnected topology) are not errors: the pipeline
/// yields a best-effort legal diagram for all of them.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The corridor router was asked to route edges but no objects exist to
    /// route among.
    #[error("edge router: no objects found for edge routing")]
    NoObjects,

    /// An edge references a node index outside the graph's node list.
    #[error("edge {edge} references unknown node index {node}")]
    UnknownNode { edge: usize, node: usize },

    /// Engine registry lookup failed.
    #[error("unknown layout engine {0:?}")]
    UnknownEngine(String),

    /// Malformed options blob passed to an engine.
    #[error("invalid engine options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}
