use core::ptr::NonNull;

use getset::CopyGetters;
use segalloc_block::{
  Arena,
  Block,
  OVERHEAD,
  WORD,
};
use segalloc_sys::region::Region;

use crate::heap::{
  Heap,
  PROLOGUE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BlockInfo {
  block: Block,
  size: usize,
  allocated: bool,
}

impl BlockInfo {
  pub fn capacity(&self) -> usize {
    self.size - OVERHEAD
  }
}

pub struct Blocks<'heap> {
  arena: &'heap Arena,
  next: Option<Block>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.next.take()?;
    if block.header() + WORD > self.arena.len() {
      return None;
    }

    let tag = self.arena.header(block);
    if tag.size() == 0 {
      return None;
    }

    self.next = Some(block.forward(tag.size()));
    Some(BlockInfo {
      block,
      size: tag.size(),
      allocated: tag.is_allocated(),
    })
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct HeapStats {
  arena_bytes: usize,
  allocated_blocks: usize,
  allocated_bytes: usize,
  free_blocks: usize,
  free_bytes: usize,
  largest_free: usize,
}

impl<R: Region> Heap<R> {
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      arena: &self.arena,
      next: Some(self.arena.next(PROLOGUE)),
    }
  }

  /// Payload pointer of a block yielded by [`Heap::blocks`].
  pub fn payload(&self, info: &BlockInfo) -> NonNull<u8> {
    self.arena.payload(info.block)
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      arena_bytes: self.arena.len(),
      ..HeapStats::default()
    };

    for info in self.blocks() {
      if info.allocated {
        stats.allocated_blocks += 1;
        stats.allocated_bytes += info.size;
      } else {
        stats.free_blocks += 1;
        stats.free_bytes += info.size;
        stats.largest_free = stats.largest_free.max(info.size);
      }
    }

    stats
  }
}
