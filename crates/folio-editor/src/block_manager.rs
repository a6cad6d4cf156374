//! Ordered block collection with key and index addressing.
//!
//! # Structure
//!
//! ```text
//! blocks:    Vec<Block>               # arena, document order
//! key_index: HashMap<BlockKey, usize> # secondary index into the arena
//! current:   Option<usize>            # None only when empty
//! ```
//!
//! Index is the addressing mode for UI interaction (sequential, swappable).
//! Key is the addressing mode for deferred work: an async tool callback may
//! land after indices have shifted, and resolves its block by key at that
//! point. Every structural mutation patches `key_index` in the same call, so
//! both modes always resolve to the same block.
//!
//! # Current block
//!
//! `current` tracks a position, not an identity. `swap` and `replace_by_key`
//! leave the number alone even when a different block now sits there.
//! Removal re-clamps it into range; insertion before it shifts it so it keeps
//! pointing at the same block.
//!
//! The change listener is a single slot: registering a new callback replaces
//! the old one. Mutations never call it directly. They queue the new current
//! block, and [`mutate`] delivers the queue after the lock is released, so a
//! listener may call back into anything that locks the manager. Code that
//! owns an unshared manager drains the queue with
//! [`BlockManager::take_pending_changes`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use folio_types::{BlockData, BlockKey, ToolConfig};

use crate::block::{Block, BlockInfo};
use crate::error::{BlockError, Result};
use crate::tools::ToolRegistry;

/// Callback invoked when the current block changes.
pub type CurrentBlockListener = Arc<dyn Fn(&BlockInfo) + Send + Sync>;

/// Block manager shared between the blocks API, the converter and the renderer.
///
/// Lock scopes must never span an `.await`.
pub type SharedBlockManager = Arc<Mutex<BlockManager>>;

/// Wrap a manager for sharing.
pub fn shared_block_manager(manager: BlockManager) -> SharedBlockManager {
    Arc::new(Mutex::new(manager))
}

/// Run `f` under the lock, then deliver queued current-block changes unlocked.
pub fn mutate<R>(manager: &SharedBlockManager, f: impl FnOnce(&mut BlockManager) -> R) -> R {
    let (result, pending) = {
        let mut guard = manager.lock();
        let result = f(&mut guard);
        (result, guard.take_pending_changes())
    };
    if let Some(pending) = pending {
        pending.deliver();
    }
    result
}

/// Current-block changes waiting for delivery, oldest first.
pub struct PendingChanges {
    listener: CurrentBlockListener,
    changes: Vec<BlockInfo>,
}

impl PendingChanges {
    pub fn changes(&self) -> &[BlockInfo] {
        &self.changes
    }

    /// Call the listener once per change.
    pub fn deliver(self) {
        for info in &self.changes {
            tracing::trace!("current block -> {}", info.key.short());
            (self.listener)(info);
        }
    }
}

/// Owns the ordered blocks of one document.
pub struct BlockManager {
    blocks: Vec<Block>,
    key_index: HashMap<BlockKey, usize>,
    current: Option<usize>,
    default_tool: String,
    registry: Arc<dyn ToolRegistry>,
    listener: Option<CurrentBlockListener>,
    pending: Vec<BlockInfo>,
}

impl std::fmt::Debug for BlockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockManager")
            .field("blocks", &self.blocks)
            .field("current", &self.current)
            .field("default_tool", &self.default_tool)
            .field("has_listener", &self.listener.is_some())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl BlockManager {
    /// Create an empty collection.
    pub fn new(registry: Arc<dyn ToolRegistry>, default_tool: impl Into<String>) -> Self {
        Self {
            blocks: Vec::new(),
            key_index: HashMap::new(),
            current: None,
            default_tool: default_tool.into(),
            registry,
            listener: None,
            pending: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    pub fn default_tool(&self) -> &str {
        &self.default_tool
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks in document order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Keys in document order.
    pub fn keys(&self) -> Vec<BlockKey> {
        self.blocks.iter().map(Block::key).collect()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.current.map(|i| &self.blocks[i])
    }

    pub fn get_block_by_index(&self, index: usize) -> Result<&Block> {
        self.blocks
            .get(index)
            .ok_or(BlockError::index_out_of_range(index, self.blocks.len()))
    }

    pub fn get_block_by_index_mut(&mut self, index: usize) -> Result<&mut Block> {
        let len = self.blocks.len();
        self.blocks
            .get_mut(index)
            .ok_or(BlockError::index_out_of_range(index, len))
    }

    pub fn get_block_by_key(&self, key: &BlockKey) -> Result<&Block> {
        let index = self.get_index_by_key(key)?;
        Ok(&self.blocks[index])
    }

    /// Position of a key. Misses are errors so callers holding stale keys notice.
    pub fn get_index_by_key(&self, key: &BlockKey) -> Result<usize> {
        self.key_index
            .get(key)
            .copied()
            .ok_or(BlockError::KeyNotFound(*key))
    }

    /// Check that the key index mirrors the sequence and the current index is in range.
    pub fn is_consistent(&self) -> bool {
        let index_matches = self.key_index.len() == self.blocks.len()
            && self
                .blocks
                .iter()
                .enumerate()
                .all(|(i, b)| self.key_index.get(&b.key()) == Some(&i));
        let current_in_range = match self.current {
            Some(i) => i < self.blocks.len(),
            None => self.blocks.is_empty(),
        };
        index_matches && current_in_range
    }

    // =========================================================================
    // Current block
    // =========================================================================

    /// Register the current-block listener, replacing any previous one.
    pub fn on_current_block_change(
        &mut self,
        listener: impl Fn(&BlockInfo) + Send + Sync + 'static,
    ) {
        self.listener = Some(Arc::new(listener));
    }

    /// Drain queued current-block changes together with the listener they are for.
    pub fn take_pending_changes(&mut self) -> Option<PendingChanges> {
        if self.pending.is_empty() {
            return None;
        }
        let changes = std::mem::take(&mut self.pending);
        let listener = self.listener.clone()?;
        Some(PendingChanges { listener, changes })
    }

    /// Point the current block at `index`.
    pub fn set_current_index(&mut self, index: usize) -> Result<()> {
        self.get_block_by_index(index)?;
        let previous = self.current_key();
        self.assign_current(Some(index), previous);
        Ok(())
    }

    fn current_key(&self) -> Option<BlockKey> {
        self.current_block().map(Block::key)
    }

    /// Write `current` and queue a change if it now names a different block than `previous`.
    fn assign_current(&mut self, index: Option<usize>, previous: Option<BlockKey>) {
        self.current = index;
        let now = self.current_key();
        if now.is_none() || now == previous || self.listener.is_none() {
            return;
        }
        if let Some(info) = self.current_block().map(Block::info) {
            self.pending.push(info);
        }
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Patch `key_index` for every block at or after `start`.
    fn reindex_from(&mut self, start: usize) {
        for (i, block) in self.blocks.iter().enumerate().skip(start) {
            self.key_index.insert(block.key(), i);
        }
    }

    /// Insert a new block.
    ///
    /// `index` defaults to right after the current block, or the end when
    /// there is none. `focus` makes the new block current; the first block of
    /// an empty collection always becomes current.
    pub fn insert(
        &mut self,
        tool_name: &str,
        data: BlockData,
        config: ToolConfig,
        index: Option<usize>,
        focus: bool,
    ) -> Result<&Block> {
        let len = self.blocks.len();
        let index = match index {
            Some(i) if i > len => return Err(BlockError::index_out_of_range(i, len)),
            Some(i) => i,
            None => self.current.map_or(len, |c| c + 1),
        };
        let block = Block::construct(self.registry.as_ref(), tool_name, data, config)?;
        Ok(self.insert_constructed(block, index, focus))
    }

    /// Insert a block of the default tool with an empty payload.
    pub fn insert_default(&mut self, focus: bool) -> Result<&Block> {
        let tool = self.default_tool.clone();
        self.insert(&tool, BlockData::new(), ToolConfig::new(), None, focus)
    }

    /// Insert before or after the block with `key` (the current block when `None`).
    pub fn insert_adjacent_by_key(
        &mut self,
        tool_name: &str,
        data: BlockData,
        config: ToolConfig,
        key: Option<&BlockKey>,
        after: bool,
    ) -> Result<&Block> {
        let position = match key {
            Some(k) => Some(self.get_index_by_key(k)?),
            None => self.current,
        };
        let index = match position {
            Some(p) if after => p + 1,
            Some(p) => p,
            None => self.blocks.len(),
        };
        let block = Block::construct(self.registry.as_ref(), tool_name, data, config)?;
        Ok(self.insert_constructed(block, index, false))
    }

    fn insert_constructed(&mut self, block: Block, index: usize, focus: bool) -> &Block {
        tracing::debug!(
            "insert {} block {} at {}",
            block.tool_name(),
            block.key().short(),
            index
        );
        let previous = self.current_key();
        self.blocks.insert(index, block);
        self.reindex_from(index);

        match self.current {
            _ if focus => self.assign_current(Some(index), previous),
            None => self.assign_current(Some(index), previous),
            // Keep pointing at the same block.
            Some(cur) if cur >= index => self.current = Some(cur + 1),
            Some(_) => {}
        }

        &self.blocks[index]
    }

    /// Remove the block at `index` (the current block when `None`).
    ///
    /// May leave the collection empty; reseeding is the caller's policy.
    pub fn remove_block(&mut self, index: Option<usize>) -> Result<()> {
        let len = self.blocks.len();
        let index = match index.or(self.current) {
            Some(i) if i < len => i,
            Some(i) => return Err(BlockError::index_out_of_range(i, len)),
            None => return Err(BlockError::index_out_of_range(0, len)),
        };

        let previous = self.current_key();
        let block = self.blocks.remove(index);
        self.key_index.remove(&block.key());
        self.reindex_from(index);
        tracing::debug!("removed {} block {} at {}", block.tool_name(), block.key().short(), index);
        block.destroy();

        let next = if self.blocks.is_empty() {
            None
        } else {
            let last = self.blocks.len() - 1;
            self.current
                .map(|cur| if cur >= index { cur.saturating_sub(1) } else { cur })
                .map(|cur| cur.min(last))
                .or(Some(0))
        };
        self.assign_current(next, previous);
        Ok(())
    }

    /// Exchange two blocks. `current` keeps its numeric value.
    pub fn swap(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.blocks.len();
        for i in [from, to] {
            if i >= len {
                return Err(BlockError::index_out_of_range(i, len));
            }
        }
        self.blocks.swap(from, to);
        self.key_index.insert(self.blocks[from].key(), from);
        self.key_index.insert(self.blocks[to].key(), to);
        tracing::debug!("swapped blocks {} and {}", from, to);
        Ok(())
    }

    /// Replace the block with `key` by a new block at the same position.
    ///
    /// The replacement gets a new key. If construction fails the collection
    /// is left untouched.
    pub fn replace_by_key(
        &mut self,
        key: &BlockKey,
        tool_name: &str,
        data: BlockData,
        config: ToolConfig,
    ) -> Result<&Block> {
        let index = self.get_index_by_key(key)?;
        let block = Block::construct(self.registry.as_ref(), tool_name, data, config)?;
        let new_key = block.key();

        let old = std::mem::replace(&mut self.blocks[index], block);
        self.key_index.remove(&old.key());
        self.key_index.insert(new_key, index);
        tracing::debug!(
            "replaced {} block {} with {} block {} at {}",
            old.tool_name(),
            old.key().short(),
            tool_name,
            new_key.short(),
            index
        );
        old.destroy();

        Ok(&self.blocks[index])
    }

    /// Remove every block, optionally seeding one default block.
    pub fn clear(&mut self, insert_default: bool) -> Result<()> {
        for block in self.blocks.drain(..) {
            block.destroy();
        }
        self.key_index.clear();
        self.current = None;
        tracing::debug!("cleared blocks");

        if insert_default {
            self.insert_default(true)?;
        }
        Ok(())
    }
}
