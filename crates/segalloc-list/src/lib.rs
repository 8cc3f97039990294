#![cfg_attr(not(test), no_std)]

use getset::CopyGetters;
use segalloc_block::{
  Arena,
  Block,
  MIN_BLOCK,
  WORD,
};

pub const NCLASSES: usize = 14;

/// Size class of a block: how many of the thresholds `32·2^0 ..= 32·2^12`
/// are at most `size`. Everything from 131072 bytes up shares the last class.
pub const fn class_of(size: usize) -> usize {
  if size < MIN_BLOCK {
    return 0;
  }

  let class = (size / MIN_BLOCK).ilog2() as usize + 1;
  if class < NCLASSES { class } else { NCLASSES - 1 }
}

pub const fn class_floor(class: usize) -> usize {
  match class {
    0 => 0,
    _ => MIN_BLOCK << (class - 1),
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters)]
pub struct Link {
  #[getset(get_copy = "pub")]
  prev: Option<Block>,
  #[getset(get_copy = "pub")]
  next: Option<Block>,
}

impl Link {
  const PREV: usize = 0;
  const NEXT: usize = WORD;

  const fn encode(block: Option<Block>) -> u64 {
    match block {
      Some(block) => block.offset() as u64,
      None => 0,
    }
  }

  const fn decode(word: u64) -> Option<Block> {
    Block::new(word as usize)
  }

  pub fn read(arena: &Arena, block: Block) -> Self {
    Self {
      prev: Self::decode(arena.read(block.offset() + Self::PREV)),
      next: Self::decode(arena.read(block.offset() + Self::NEXT)),
    }
  }

  pub fn write(self, arena: &mut Arena, block: Block) {
    Self::set_prev(arena, block, self.prev);
    Self::set_next(arena, block, self.next);
  }

  pub fn set_prev(arena: &mut Arena, block: Block, prev: Option<Block>) {
    arena.write(block.offset() + Self::PREV, Self::encode(prev));
  }

  pub fn set_next(arena: &mut Arena, block: Block, next: Option<Block>) {
    arena.write(block.offset() + Self::NEXT, Self::encode(next));
  }
}

#[derive(Debug, Clone)]
pub struct FreeLists {
  heads: [Option<Block>; NCLASSES],
}

impl FreeLists {
  pub const fn new() -> Self {
    Self {
      heads: [None; NCLASSES],
    }
  }

  pub fn clear(&mut self) {
    self.heads = [None; NCLASSES];
  }

  pub fn head(&self, class: usize) -> Option<Block> {
    self.heads.get(class).copied().flatten()
  }

  pub fn is_empty(&self) -> bool {
    self.heads.iter().all(Option::is_none)
  }

  /// Pushes `block` at the head of its class. Its header must already hold
  /// the final size.
  pub fn insert(&mut self, arena: &mut Arena, block: Block) {
    let class = class_of(arena.header(block).size());
    let head = self.heads[class];

    Link { prev: None, next: head }.write(arena, block);
    if let Some(head) = head {
      Link::set_prev(arena, head, Some(block));
    }

    self.heads[class] = Some(block);
  }

  pub fn remove(&mut self, arena: &mut Arena, block: Block) {
    let class = class_of(arena.header(block).size());
    let link = Link::read(arena, block);

    match link.prev {
      Some(prev) => Link::set_next(arena, prev, link.next),
      None => {
        debug_assert_eq!(self.heads[class], Some(block), "unlisted block {block:?}");
        self.heads[class] = link.next;
      }
    }

    if let Some(next) = link.next {
      Link::set_prev(arena, next, link.prev);
    }
  }

  pub fn first_above(&self, class: usize) -> Option<Block> {
    self.heads.get(class + 1..)?.iter().find_map(|head| *head)
  }

  pub fn iter<'arena>(&self, arena: &'arena Arena, class: usize) -> ListIter<'arena> {
    ListIter::new(arena, self.head(class))
  }
}

impl Default for FreeLists {
  fn default() -> Self {
    Self::new()
  }
}

pub struct ListIter<'arena> {
  arena: &'arena Arena,
  next: Option<Block>,
}

impl<'arena> ListIter<'arena> {
  pub fn new(arena: &'arena Arena, start: Option<Block>) -> Self {
    Self { arena, next: start }
  }
}

impl Iterator for ListIter<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.next?;
    self.next = Link::read(self.arena, current).next;
    Some(current)
  }
}
