use core::ptr::NonNull;

/// Alignment every region base must satisfy.
pub const REGION_ALIGN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
  Exhausted,
  InvalidArgument,
  Overflow,
  Unsupported,
}

pub type RegionResult<T> = Result<T, RegionError>;

/// A contiguous span of memory that only ever grows at its end, in the
/// manner of `sbrk`.
///
/// # Safety
///
/// Implementors must ensure that:
/// - `base` is aligned to [`REGION_ALIGN`] and never changes
/// - `grow` returns a span starting exactly at `base + len()` as observed
///   before the call, and increases `len()` by `bytes` on success only
/// - every byte in `base..base + len()` stays readable and writable until
///   the region is dropped
pub unsafe trait Region {
  fn base(&self) -> NonNull<u8>;

  fn len(&self) -> usize;

  /// Extends the region by `bytes` and returns the start of the new span.
  fn grow(&mut self, bytes: usize) -> RegionResult<NonNull<u8>>;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lo(&self) -> NonNull<u8> {
    self.base()
  }

  fn hi(&self) -> Option<NonNull<u8>> {
    let last = self.len().checked_sub(1)?;
    NonNull::new(self.base().as_ptr().wrapping_add(last))
  }

  fn contains(&self, ptr: *const u8) -> bool {
    let lo = self.base().as_ptr() as usize;
    let addr = ptr as usize;
    addr >= lo && addr - lo < self.len()
  }
}

/// Stand-in for targets without a system region. It cannot be constructed.
#[derive(Debug)]
pub enum UnsupportedRegion {}

impl UnsupportedRegion {
  pub fn reserve(size: usize) -> RegionResult<Self> {
    _ = size;
    Err(RegionError::Unsupported)
  }
}

unsafe impl Region for UnsupportedRegion {
  fn base(&self) -> NonNull<u8> {
    match *self {}
  }

  fn len(&self) -> usize {
    match *self {}
  }

  fn grow(&mut self, bytes: usize) -> RegionResult<NonNull<u8>> {
    _ = bytes;
    match *self {}
  }
}
