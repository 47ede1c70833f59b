//! This module contains function layout information: block order and the
//! instruction order inside each block.

use cranelift_entity::{packed_option::PackedOption, SecondaryMap};

use crate::{dfg::BlockId, inst::InstId};

/// Append-only layout of a function body. A function whose layout holds no
/// blocks is a declaration.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    blocks: Vec<BlockId>,
    block_insts: SecondaryMap<BlockId, Vec<InstId>>,
    inst_block: SecondaryMap<InstId, PackedOption<BlockId>>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn inst_count_of(&self, block: BlockId) -> usize {
        self.block_insts[block].len()
    }

    pub fn append_block(&mut self, block: BlockId) {
        debug_assert!(!self.blocks.contains(&block));
        self.blocks.push(block);
    }

    pub fn append_inst(&mut self, inst: InstId, block: BlockId) {
        debug_assert!(self.inst_block[inst].is_none());
        self.block_insts[block].push(inst);
        self.inst_block[inst] = block.into();
    }

    pub fn inst_block(&self, inst: InstId) -> BlockId {
        self.inst_block[inst].expand().unwrap()
    }

    pub fn first_inst_of(&self, block: BlockId) -> Option<InstId> {
        self.block_insts[block].first().copied()
    }

    pub fn last_inst_of(&self, block: BlockId) -> Option<InstId> {
        self.block_insts[block].last().copied()
    }

    pub fn iter_block(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.iter().copied()
    }

    pub fn iter_inst(&self, block: BlockId) -> impl Iterator<Item = InstId> + '_ {
        self.block_insts[block].iter().copied()
    }
}
