//! Block store: the ordered block list.
//!
//! Vector order is document order. Reads are public; every write is
//! `pub(crate)` so the only way to change a store from outside this crate is
//! through [`MutationPipeline`](crate::MutationPipeline), which owns it.
//!
//! Ids are unique across the store at all times: `insert` refuses a block
//! whose id is already present, and nothing can change a block's id.

use blockwire_types::{Block, BlockId, OutputData};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::registry::ToolRegistry;

/// Ordered collection of blocks plus the registry used to compose them.
#[derive(Debug)]
pub struct BlockStore {
    /// Blocks in document order.
    blocks: Vec<Block>,

    tools: ToolRegistry,

    /// Block the last focusing insert asked for.
    focus: Option<BlockId>,

    /// Store version (bumped on any mutation).
    version: u64,
}

impl BlockStore {
    /// Create an empty store.
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            blocks: Vec::new(),
            tools,
            focus: None,
            version: 0,
        }
    }

    /// Create a store seeded from `data`.
    ///
    /// Every seed block goes through its tool's factory. Blocks without an id
    /// get a fresh one. Empty seed data yields one `initial_block` block.
    pub fn seed(tools: ToolRegistry, data: &OutputData, initial_block: &str) -> Result<Self> {
        let mut store = Self::new(tools);

        for seed in &data.blocks {
            let id = seed.id.unwrap_or_default();
            let block =
                store.compose_block_with_id(id, &seed.tool, seed.data.clone(), seed.settings.clone())?;
            let end = store.len();
            store.insert(block, end, false)?;
        }

        if store.is_empty() {
            let block = store.compose_block(initial_block, Value::Null, Value::Null)?;
            store.insert(block, 0, false)?;
        }

        Ok(store)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get the current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Ids in document order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(Block::id).collect()
    }

    /// Block that the most recent focusing insert targeted, if it still exists.
    pub fn focus_target(&self) -> Option<BlockId> {
        self.focus.filter(|id| self.contains(id))
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.iter().any(|b| b.id() == *id)
    }

    /// Current index of the block with this id.
    pub fn get_by_uuid(&self, id: &BlockId) -> Result<usize> {
        self.blocks
            .iter()
            .position(|b| b.id() == *id)
            .ok_or(StoreError::NotFound(*id))
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == *id)
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Snapshot as an ordered document.
    pub fn snapshot(&self) -> OutputData {
        OutputData::from_blocks(&self.blocks)
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Compose a block with a fresh id.
    pub fn compose_block(&self, tool: &str, data: Value, settings: Value) -> Result<Block> {
        self.compose_block_with_id(BlockId::new(), tool, data, settings)
    }

    /// Compose a block under a caller-assigned id (remote inserts keep the
    /// id their originator chose).
    pub fn compose_block_with_id(
        &self,
        id: BlockId,
        tool: &str,
        data: Value,
        settings: Value,
    ) -> Result<Block> {
        let payload = self.tools.compose(tool, data, settings)?;
        Ok(Block::new(id, tool, payload.data, payload.settings))
    }

    // =========================================================================
    // Mutation (pipeline only)
    // =========================================================================

    /// Insert at `index`, clamped to the end. Returns the index used.
    pub(crate) fn insert(&mut self, block: Block, index: usize, need_to_focus: bool) -> Result<usize> {
        if self.contains(&block.id()) {
            return Err(StoreError::DuplicateBlock(block.id()));
        }
        let index = index.min(self.blocks.len());
        if need_to_focus {
            self.focus = Some(block.id());
        }
        self.blocks.insert(index, block);
        self.version += 1;
        Ok(index)
    }

    /// Remove and return the block at `index`.
    pub(crate) fn remove_at(&mut self, index: usize) -> Result<Block> {
        self.check_index(index)?;
        let block = self.blocks.remove(index);
        if self.focus == Some(block.id()) {
            self.focus = None;
        }
        self.version += 1;
        Ok(block)
    }

    /// Exchange two positions. Returns `false` (and does nothing) when
    /// `a == b`.
    pub(crate) fn swap(&mut self, a: usize, b: usize) -> Result<bool> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Ok(false);
        }
        self.blocks.swap(a, b);
        self.version += 1;
        Ok(true)
    }

    /// Swap the tool and payload of the block at `index`, keeping its id.
    /// Returns the previous block.
    pub(crate) fn replace_at(&mut self, index: usize, replacement: Block) -> Result<Block> {
        self.check_index(index)?;
        let slot = &mut self.blocks[index];
        let previous = slot.clone();
        slot.tool = replacement.tool;
        slot.data = replacement.data;
        slot.settings = replacement.settings;
        self.version += 1;
        Ok(previous)
    }

    /// Overwrite the data payload of the block at `index`. Returns the
    /// previous data.
    pub(crate) fn update_at(&mut self, index: usize, data: Value) -> Result<Value> {
        self.check_index(index)?;
        let previous = std::mem::replace(&mut self.blocks[index].data, data);
        self.version += 1;
        Ok(previous)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.blocks.len() {
            Ok(())
        } else {
            Err(StoreError::IndexNotFound {
                index,
                len: self.blocks.len(),
            })
        }
    }
}
