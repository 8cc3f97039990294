use core::fmt;

use segalloc_sys::region::RegionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// A zero-byte request. Not a failure for the malloc-style entry points.
  ZeroSize,
  Overflow,
  InvalidAlignment,
  Region(RegionError),
}

pub type HeapResult<T> = Result<T, HeapError>;

impl From<RegionError> for HeapError {
  fn from(err: RegionError) -> Self {
    HeapError::Region(err)
  }
}

impl fmt::Display for HeapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HeapError::ZeroSize => f.write_str("zero-size request"),
      HeapError::Overflow => f.write_str("request size overflows"),
      HeapError::InvalidAlignment => f.write_str("alignment is not a power of two"),
      HeapError::Region(err) => write!(f, "region growth failed: {err:?}"),
    }
  }
}
