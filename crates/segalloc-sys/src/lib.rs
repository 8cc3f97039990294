#![cfg_attr(not(test), no_std)]

pub mod fixed;
pub mod math;
pub mod prim;
pub mod region;
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub mod unix;

#[cfg(any(target_os = "linux", target_os = "macos"))]
pub type SystemRegion = unix::MmapRegion;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub type SystemRegion = region::UnsupportedRegion;

pub mod prelude {
  pub use super::{
    SystemRegion,
    fixed::FixedRegion,
    math::{
      align_down,
      align_offset,
      align_up,
      is_aligned,
    },
    prim::{
      page_align,
      page_size,
    },
    region::{
      REGION_ALIGN,
      Region,
      RegionError,
      RegionResult,
    },
  };
}
