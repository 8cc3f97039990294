use segalloc_block::{
  Block,
  Tag,
};
use segalloc_sys::region::Region;

use crate::heap::Heap;

impl<R: Region> Heap<R> {
  /// Merges the free, listed `block` with free physical neighbours and
  /// returns the surviving block, re-listed under its new size.
  pub(crate) fn coalesce(&mut self, block: Block) -> Block {
    let prev = if self.arena.prev_tag(block).is_free() {
      self.arena.prev(block)
    } else {
      None
    };
    let next = self.arena.next(block);
    let next_free = self.arena.header(next).is_free();
    let mut size = self.arena.header(block).size();

    let merged = match (prev, next_free) {
      (None, false) => return block,
      (Some(prev), false) => {
        size += self.arena.header(prev).size();
        self.lists.remove(&mut self.arena, block);
        self.lists.remove(&mut self.arena, prev);
        self.arena.stamp(prev, Tag::pack(size, false));
        prev
      }
      (None, true) => {
        size += self.arena.header(next).size();
        self.lists.remove(&mut self.arena, block);
        self.lists.remove(&mut self.arena, next);
        self.arena.stamp(block, Tag::pack(size, false));
        block
      }
      (Some(prev), true) => {
        size += self.arena.header(prev).size() + self.arena.header(next).size();
        self.lists.remove(&mut self.arena, block);
        self.lists.remove(&mut self.arena, next);
        self.lists.remove(&mut self.arena, prev);
        self.arena.stamp(prev, Tag::pack(size, false));
        prev
      }
    };

    self.lists.insert(&mut self.arena, merged);
    merged
  }
}
