#![cfg_attr(not(test), no_std)]

use core::{
  ffi::{
    c_int,
    c_void,
  },
  mem,
  ptr::{
    self,
    NonNull,
  },
};

use log::{
  debug,
  error,
};
use segalloc::{
  SegAlloc,
  prelude::CheckReport,
};

mod handler;

static HEAP: SegAlloc = SegAlloc::new();

fn into_raw(ptr: Option<NonNull<u8>>) -> *mut c_void {
  ptr.map_or(ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

fn from_raw(ptr: *mut c_void) -> Option<NonNull<u8>> {
  NonNull::new(ptr.cast())
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn malloc(size: usize) -> *mut c_void {
  into_raw(HEAP.allocate(size))
}

/// # Safety
///
/// `ptr` must be null or a live pointer returned by this library.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
  unsafe { HEAP.deallocate(from_raw(ptr)) };
}

/// # Safety
///
/// Same contract as [`free`].
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
  into_raw(unsafe { HEAP.reallocate(from_raw(ptr), size) })
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn calloc(count: usize, size: usize) -> *mut c_void {
  into_raw(HEAP.allocate_zeroed(count, size))
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn aligned_alloc(align: usize, size: usize) -> *mut c_void {
  into_raw(HEAP.allocate_aligned(align, size))
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn memalign(align: usize, size: usize) -> *mut c_void {
  into_raw(HEAP.allocate_aligned(align, size))
}

/// # Safety
///
/// `out` must be valid for a pointer-sized write.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_memalign(out: *mut *mut c_void, align: usize, size: usize) -> c_int {
  if !align.is_power_of_two() || align % mem::size_of::<*mut c_void>() != 0 {
    return libc::EINVAL;
  }

  if size == 0 {
    unsafe { out.write(ptr::null_mut()) };
    return 0;
  }

  match HEAP.allocate_aligned(align, size) {
    Some(ptr) => {
      unsafe { out.write(ptr.as_ptr().cast()) };
      0
    }
    None => libc::ENOMEM,
  }
}

/// # Safety
///
/// `ptr` must be null or a live pointer returned by this library.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn malloc_usable_size(ptr: *mut c_void) -> usize {
  from_raw(ptr).map_or(0, |ptr| unsafe { HEAP.usable_size(ptr) })
}

fn audit(report: Option<CheckReport>, lineno: c_int) -> bool {
  match report {
    Some(report) if report.is_ok() => true,
    Some(report) => {
      error!(
        "checkheap({lineno}): {} violations over {} blocks",
        report.violations(),
        report.blocks()
      );
      false
    }
    None => {
      debug!("checkheap({lineno}): no heap yet");
      true
    }
  }
}

/// Audits the heap. `lineno` only tags the log line of a failed audit.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn segalloc_checkheap(lineno: c_int) -> bool {
  audit(HEAP.check(), lineno)
}
