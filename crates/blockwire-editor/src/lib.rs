//! Collaborative mutation layer for a block editor.
//!
//! Owns the ordered block store, applies structural mutations
//! (insert, replace, update, remove, swap) and reports each one outward
//! through a [`CollabBridge`] so a replication system can propagate it.
//! Mutations that arrive *from* the replication system are tagged
//! [`Origin::Remote`] and checked against an [`EchoGate`] first; a swallowed
//! mutation is applied but not reported back, which keeps two synced
//! editors from echoing a change between them forever.
//!
//! Use [`MutationPipeline`] directly when one task owns the editor, or
//! [`spawn_pipeline`] for a cloneable handle that queues mutations in
//! submission order.

pub mod actor;
pub mod block_store;
pub mod bridge;
pub mod config;
pub mod error;
pub mod gate;
pub mod mutation;
pub mod pipeline;
pub mod registry;

pub use actor::{PendingOutcome, PipelineHandle, spawn_pipeline};
pub use block_store::BlockStore;
pub use bridge::{CollabBridge, InsertData, Notification, ReplaceData, UpdateData};
pub use config::{ConfigError, EditorConfig, EditorSettings, LogLevel, ToolSettings, load_data};
pub use error::{PipelineError, StoreError};
pub use gate::{EchoGate, EchoLedger, FnGate, GateError, StaticGate, gate_fn};
pub use mutation::{Mutation, MutationOp, Notice, Outcome};
pub use pipeline::MutationPipeline;
pub use registry::{ConfiguredTool, DEFAULT_TOOL, ToolFactory, ToolPayload, ToolRegistry};

pub use blockwire_types::{Block, BlockId, MutationKind, Origin, OutputBlock, OutputData};
