use thiserror::Error;

use crate::tree::NodeId;

/// Failures raised inside the engine.
///
/// None of these reach the host as an error: [`crate::Editor::dispatch`]
/// logs them and treats the command as handled without effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("node {0:?} is not part of the document")]
    NodeNotFound(NodeId),
    #[error("no boundary found: {0}")]
    BoundaryNotFound(&'static str),
    #[error("selection touches non-editable content")]
    NotEditable,
    #[error("malformed fragment: {0}")]
    MalformedFragment(String),
    #[error("duplicate extension id: {0}")]
    DuplicateExtension(String),
    #[error("invalid path {0:?}")]
    InvalidPath(Vec<usize>),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
