//! Mutation pipeline: the only writer of the block store.
//!
//! Every structural change, local or remote, is a [`Mutation`] handed to
//! [`MutationPipeline::apply`]. Processing order:
//!
//! 1. remote origin: ask the echo gate (the one suspension point), except
//!    for a self-swap, which returns `Unchanged` straight away
//! 2. resolve addressing against the store *as it is now*
//! 3. apply to the store (the durability boundary)
//! 4. fire `on_change`, then exactly one bridge hook unless swallowed
//!
//! Addressing and store errors abort before step 3, so a mutation is either
//! applied whole or not at all. Hook failures happen after step 3 and never
//! undo it.
//!
//! `apply` takes `&mut self`, so one pipeline processes one mutation at a
//! time. For a shared, queueing front end see [`spawn_pipeline`](crate::spawn_pipeline).

use std::sync::Arc;

use blockwire_types::{Block, BlockId, MutationKind, Origin, OutputData};
use serde_json::Value;
use tracing::{debug, info};

use crate::block_store::BlockStore;
use crate::bridge::{CollabBridge, InsertData, Notification, ReplaceData, UpdateData};
use crate::config::EditorConfig;
use crate::error::PipelineError;
use crate::gate::{self, EchoGate};
use crate::mutation::{Mutation, MutationOp, Notice, Outcome};

/// Owns the block store and routes every change through the echo gate and
/// the collaboration bridge.
pub struct MutationPipeline {
    store: BlockStore,
    bridge: CollabBridge,
    gate: Option<Arc<dyn EchoGate>>,
    /// Mutations applied so far (swallowed included).
    applied: u64,
}

impl MutationPipeline {
    /// Seed the store from `config.data` and fire `on_ready`.
    pub fn new(config: EditorConfig) -> Result<Self, PipelineError> {
        let EditorConfig {
            initial_block,
            tools,
            data,
            bridge,
            gate,
        } = config;

        let store = BlockStore::seed(tools, &data, &initial_block)?;
        info!(blocks = store.len(), gate = gate.is_some(), "editor ready");

        let pipeline = Self {
            store,
            bridge,
            gate,
            applied: 0,
        };
        pipeline.bridge.ready();
        Ok(pipeline)
    }

    /// Read access to the store.
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn blocks(&self) -> &[Block] {
        self.store.blocks()
    }

    pub fn snapshot(&self) -> OutputData {
        self.store.snapshot()
    }

    /// Number of mutations that changed the store.
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Process one mutation.
    pub async fn apply(&mut self, mutation: Mutation) -> Result<Outcome, PipelineError> {
        let Mutation {
            mut op,
            origin,
            swallow,
        } = mutation;
        let kind = op.kind();
        let subject = op.assign_id();

        // A self-swap changes nothing; it must not spend a gate verdict.
        if let MutationOp::Swap { from, to } = &op {
            if from == to {
                self.resolve(kind, from)?;
                debug!(%kind, %origin, block = %subject, "no-op mutation");
                return Ok(Outcome::Unchanged);
            }
        }

        let swallowed = match origin {
            Origin::Local => false,
            Origin::Remote => match swallow {
                Some(verdict) => verdict,
                None => gate::consult(self.gate.as_deref(), subject, op.payload().cloned()).await,
            },
        };

        let Some(notification) = self.execute(op)? else {
            debug!(%kind, %origin, block = %subject, "no-op mutation");
            return Ok(Outcome::Unchanged);
        };
        self.applied += 1;
        self.bridge.changed();

        let notice = if swallowed {
            Notice::Swallowed
        } else {
            self.bridge.notify(&notification)
        };

        debug!(%kind, %origin, block = %subject, ?notice, blocks = self.store.len(), "mutation applied");
        Ok(Outcome::Applied {
            kind,
            id: subject,
            notice,
        })
    }

    /// Resolve addressing and apply to the store. Returns the notification
    /// describing the change, or `None` for a no-op.
    fn execute(&mut self, op: MutationOp) -> Result<Option<Notification>, PipelineError> {
        let kind = op.kind();
        match op {
            MutationOp::Insert {
                after,
                id,
                tool,
                data,
                settings,
                need_to_focus,
            } => {
                let index = match after {
                    None => 0,
                    Some(after_id) => self.resolve(kind, &after_id)? + 1,
                };
                let id = id.unwrap_or_else(BlockId::new);
                let block = self.store.compose_block_with_id(id, &tool, data, settings)?;
                let notification = Notification::Insert {
                    after,
                    block: InsertData {
                        id,
                        name: tool,
                        data: block.data.clone(),
                        settings: block.settings.clone(),
                        need_to_focus,
                    },
                };
                self.store.insert(block, index, need_to_focus)?;
                Ok(Some(notification))
            }

            MutationOp::Replace { target, tool, data } => {
                let index = self.resolve(kind, &target)?;
                let replacement = self.store.compose_block_with_id(target, &tool, data, Value::Null)?;
                let notification = Notification::Replace {
                    replacing: target,
                    block: ReplaceData {
                        tool_name: tool,
                        data: replacement.data.clone(),
                    },
                };
                self.store.replace_at(index, replacement)?;
                Ok(Some(notification))
            }

            MutationOp::Update { target, data } => {
                let index = self.resolve(kind, &target)?;
                self.store.update_at(index, data.clone())?;
                Ok(Some(Notification::Update {
                    mutation: UpdateData { uuid: target, data },
                }))
            }

            MutationOp::Remove { target } => {
                let index = self.resolve(kind, &target)?;
                self.store.remove_at(index)?;
                Ok(Some(Notification::Remove { uuid: target }))
            }

            MutationOp::Swap { from, to } => {
                let a = self.resolve(kind, &from)?;
                let b = self.resolve(kind, &to)?;
                if self.store.swap(a, b)? {
                    Ok(Some(Notification::Swap { from, to }))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn resolve(&self, kind: MutationKind, id: &BlockId) -> Result<usize, PipelineError> {
        self.store
            .get_by_uuid(id)
            .map_err(|_| PipelineError::Addressing { kind, id: *id })
    }
}

impl std::fmt::Debug for MutationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationPipeline")
            .field("blocks", &self.store.len())
            .field("applied", &self.applied)
            .field("bridge", &self.bridge)
            .field("gate", &self.gate.is_some())
            .finish()
    }
}
