use core::ptr::NonNull;

use segalloc_sys::math::is_aligned;

use crate::{
  ALIGNMENT,
  Block,
  OVERHEAD,
  Tag,
  WORD,
};

#[derive(Debug)]
pub struct Arena {
  base: NonNull<u8>,
  len: usize,
}

impl Arena {
  pub const fn new(base: NonNull<u8>, len: usize) -> Self {
    Self { base, len }
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn set_len(&mut self, len: usize) {
    debug_assert!(len >= self.len, "arena never shrinks");
    self.len = len;
  }

  #[inline(always)]
  fn word_ptr(&self, at: usize) -> *mut u64 {
    debug_assert!(
      is_aligned(at, WORD) == Some(true),
      "unaligned word offset {at}"
    );
    debug_assert!(
      at.checked_add(WORD).is_some_and(|end| end <= self.len),
      "word offset {at} outside arena of {} bytes",
      self.len
    );
    self.base.as_ptr().wrapping_add(at).cast::<u64>()
  }

  #[inline(always)]
  pub fn read(&self, at: usize) -> u64 {
    // SAFETY: offsets come from well-formed tags inside `0..len`.
    unsafe { self.word_ptr(at).read() }
  }

  #[inline(always)]
  pub fn write(&mut self, at: usize, word: u64) {
    // SAFETY: see `read`.
    unsafe { self.word_ptr(at).write(word) }
  }

  #[inline(always)]
  pub fn tag(&self, at: usize) -> Tag {
    Tag::from_raw(self.read(at))
  }

  #[inline(always)]
  pub fn set_tag(&mut self, at: usize, tag: Tag) {
    self.write(at, tag.raw());
  }

  #[inline(always)]
  pub fn header(&self, block: Block) -> Tag {
    self.tag(block.header())
  }

  #[inline(always)]
  pub fn footer(&self, block: Block) -> Tag {
    self.tag(block.footer(self.header(block).size()))
  }

  #[inline(always)]
  pub fn prev_tag(&self, block: Block) -> Tag {
    self.tag(block.prev_footer())
  }

  /// Writes `tag` into both the header and the footer of `block`.
  pub fn stamp(&mut self, block: Block, tag: Tag) {
    self.set_tag(block.header(), tag);
    self.set_tag(block.footer(tag.size()), tag);
  }

  #[inline(always)]
  pub fn next(&self, block: Block) -> Block {
    block.forward(self.header(block).size())
  }

  #[inline(always)]
  pub fn prev(&self, block: Block) -> Option<Block> {
    let size = self.prev_tag(block).size();
    block.back(size)
  }

  pub fn capacity(&self, block: Block) -> usize {
    self.header(block).size().saturating_sub(OVERHEAD)
  }

  pub fn payload(&self, block: Block) -> NonNull<u8> {
    // SAFETY: a block offset is always inside the arena.
    unsafe { self.base.add(block.offset()) }
  }

  /// Maps a payload pointer back to its block, if it could be one.
  pub fn block_of(&self, ptr: NonNull<u8>) -> Option<Block> {
    let offset = (ptr.as_ptr() as usize).checked_sub(self.base.as_ptr() as usize)?;
    if offset >= self.len || is_aligned(offset, ALIGNMENT) != Some(true) {
      return None;
    }
    Block::new(offset)
  }
}

unsafe impl Send for Arena {}
