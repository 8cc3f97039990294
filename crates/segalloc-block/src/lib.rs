#![cfg_attr(not(test), no_std)]

mod arena;
mod tag;

pub use arena::Arena;
pub use tag::Tag;

use core::num::NonZeroUsize;

pub const WORD: usize = 8;
pub const ALIGNMENT: usize = 16;
pub const OVERHEAD: usize = 2 * WORD;
/// Header, footer and room for two link words.
pub const MIN_BLOCK: usize = OVERHEAD + 2 * WORD;

/// Handle to a block: the arena offset of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(NonZeroUsize);

impl Block {
  pub const fn new(offset: usize) -> Option<Self> {
    match NonZeroUsize::new(offset) {
      Some(offset) => Some(Self(offset)),
      None => None,
    }
  }

  #[inline(always)]
  pub const fn offset(self) -> usize {
    self.0.get()
  }

  #[inline(always)]
  pub const fn header(self) -> usize {
    self.0.get() - WORD
  }

  #[inline(always)]
  pub const fn footer(self, size: usize) -> usize {
    self.0.get() + size - OVERHEAD
  }

  #[inline(always)]
  pub const fn forward(self, size: usize) -> Self {
    Self(self.0.saturating_add(size))
  }

  /// The block starting `size` bytes earlier, `None` at offset zero.
  #[inline(always)]
  pub const fn back(self, size: usize) -> Option<Self> {
    match self.0.get().checked_sub(size) {
      Some(offset) => Self::new(offset),
      None => None,
    }
  }

  #[inline(always)]
  pub const fn prev_footer(self) -> usize {
    self.0.get() - OVERHEAD
  }
}
