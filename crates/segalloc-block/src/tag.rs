const FLAGS: u64 = 0xF;
const ALLOCATED: u64 = 0x1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag(u64);

impl Tag {
  /// Zero-size allocated block terminating the arena.
  pub const EPILOGUE: Tag = Tag::pack(0, true);

  #[inline(always)]
  pub const fn pack(size: usize, allocated: bool) -> Self {
    Self(size as u64 | if allocated { ALLOCATED } else { 0 })
  }

  #[inline(always)]
  pub const fn from_raw(word: u64) -> Self {
    Self(word)
  }

  #[inline(always)]
  pub const fn raw(self) -> u64 {
    self.0
  }

  #[inline(always)]
  pub const fn size(self) -> usize {
    (self.0 & !FLAGS) as usize
  }

  #[inline(always)]
  pub const fn is_allocated(self) -> bool {
    self.0 & ALLOCATED != 0
  }

  #[inline(always)]
  pub const fn is_free(self) -> bool {
    !self.is_allocated()
  }

  pub const fn with_allocated(self, allocated: bool) -> Self {
    Self::pack(self.size(), allocated)
  }
}
