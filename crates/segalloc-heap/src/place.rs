use segalloc_block::{
  Block,
  Tag,
};
use segalloc_list::class_of;
use segalloc_sys::region::Region;

use crate::{
  config::{
    MIN_BLOCK,
    SCAN_LIMIT,
  },
  heap::Heap,
};

impl<R: Region> Heap<R> {
  /// First fit among the first [`SCAN_LIMIT`] blocks of the ideal class,
  /// else the head of the next non-empty larger class. Every block in a
  /// larger class is big enough.
  pub(crate) fn find_fit(&self, asize: usize) -> Option<Block> {
    let class = class_of(asize);

    self
      .lists
      .iter(&self.arena, class)
      .take(SCAN_LIMIT)
      .find(|&block| self.arena.header(block).size() >= asize)
      .or_else(|| self.lists.first_above(class))
  }

  pub(crate) fn place(&mut self, block: Block, asize: usize) -> Block {
    self.lists.remove(&mut self.arena, block);

    let csize = self.arena.header(block).size();
    let rest = csize - asize;

    if rest >= MIN_BLOCK {
      self.arena.stamp(block, Tag::pack(asize, true));
      let remainder = block.forward(asize);
      self.arena.stamp(remainder, Tag::pack(rest, false));
      self.lists.insert(&mut self.arena, remainder);
    } else {
      // The successor of a listed block is never free, so it needs no update.
      self.arena.stamp(block, Tag::pack(csize, true));
    }

    block
  }

  pub(crate) fn trim(&mut self, block: Block, asize: usize) {
    let size = self.arena.header(block).size();
    let rest = size - asize;
    if rest < MIN_BLOCK {
      return;
    }

    self.arena.stamp(block, Tag::pack(asize, true));
    let tail = block.forward(asize);
    self.arena.stamp(tail, Tag::pack(rest, false));
    self.lists.insert(&mut self.arena, tail);
    self.coalesce(tail);
  }
}
