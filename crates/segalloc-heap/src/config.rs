pub use segalloc_block::{
  ALIGNMENT,
  MIN_BLOCK,
  OVERHEAD,
  WORD,
};
pub use segalloc_list::NCLASSES;

/// Bytes requested from the region when nothing fits, unless the request
/// itself is larger.
pub const EXTEND_SIZE: usize = 4096;

pub const SCAN_LIMIT: usize = 32;

pub const PROLOGUE_SPAN: usize = 4 * WORD;
