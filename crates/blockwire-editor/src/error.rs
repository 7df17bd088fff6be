//! Error types for the block store and mutation pipeline.

use blockwire_types::{BlockId, MutationKind};
use thiserror::Error;

/// Errors raised by the block store and tool registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No block with this id is in the store.
    #[error("block not found: {0:?}")]
    NotFound(BlockId),

    /// Index does not address a block.
    #[error("no block at index {index} (store holds {len})")]
    IndexNotFound { index: usize, len: usize },

    /// Tool name is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A block with this id already exists.
    #[error("block already exists: {0:?}")]
    DuplicateBlock(BlockId),

    /// The tool's factory refused the payload.
    #[error("tool {tool} rejected payload: {reason}")]
    ToolRejected { tool: String, reason: String },
}

/// Errors surfaced to the submitter of a mutation.
///
/// Every variant means the store was left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A referenced block id did not resolve against the current store.
    #[error("{kind} could not resolve {id:?}: block not in store")]
    Addressing { kind: MutationKind, id: BlockId },

    /// The store rejected the operation (unknown tool, duplicate id, ...).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The pipeline actor has stopped.
    #[error("pipeline shut down")]
    Shutdown,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
