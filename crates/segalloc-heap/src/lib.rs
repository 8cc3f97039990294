#![cfg_attr(not(test), no_std)]

pub mod check;
mod coalesce;
pub mod config;
pub mod error;
pub mod heap;
mod place;
pub mod walk;

pub use check::{
  CheckReport,
  Violation,
};
pub use error::{
  HeapError,
  HeapResult,
};
pub use heap::Heap;
pub use walk::{
  BlockInfo,
  Blocks,
  HeapStats,
};

pub mod prelude {
  pub use super::{
    CheckReport,
    Heap,
    HeapError,
    HeapResult,
    HeapStats,
    Violation,
    config::ALIGNMENT,
  };
}
