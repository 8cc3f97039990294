#![cfg_attr(not(test), no_std)]

use core::{
  alloc::{
    GlobalAlloc,
    Layout,
  },
  cmp,
  ptr::{
    self,
    NonNull,
  },
};

use log::warn;
use segalloc_heap::{
  CheckReport,
  Heap,
  HeapError,
  HeapStats,
  config::ALIGNMENT,
};
use segalloc_sys::SystemRegion;
use spin::Mutex;

pub mod config {
  /// Address space reserved for the process heap. Pages are committed as
  /// the arena grows into it.
  pub const ARENA_RESERVE: usize = 1 << 30;
}

pub mod prelude {
  pub use segalloc_heap::prelude::*;
  pub use segalloc_sys::prelude::*;

  pub use super::SegAlloc;
}

pub struct SegAlloc {
  heap: Mutex<Option<Heap<SystemRegion>>>,
}

impl SegAlloc {
  pub const fn new() -> Self {
    Self {
      heap: Mutex::new(None),
    }
  }

  fn bootstrap() -> Option<Heap<SystemRegion>> {
    SystemRegion::reserve(config::ARENA_RESERVE)
      .map_err(HeapError::from)
      .and_then(Heap::new)
      .inspect_err(|err| warn!("heap bootstrap failed: {err}"))
      .ok()
  }

  fn with_heap<T>(&self, f: impl FnOnce(&mut Heap<SystemRegion>) -> T) -> Option<T> {
    let mut guard = self.heap.lock();
    if guard.is_none() {
      *guard = Self::bootstrap();
    }
    guard.as_mut().map(f)
  }

  // Never bootstraps.
  fn with_existing<T>(&self, f: impl FnOnce(&mut Heap<SystemRegion>) -> T) -> Option<T> {
    self.heap.lock().as_mut().map(f)
  }

  pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
    self.with_heap(|heap| heap.allocate(size)).flatten()
  }

  /// # Safety
  ///
  /// `ptr` must be `None` or a live allocation of this allocator.
  pub unsafe fn deallocate(&self, ptr: Option<NonNull<u8>>) {
    if ptr.is_none() {
      return;
    }
    self.with_existing(|heap| unsafe { heap.deallocate(ptr) });
  }

  /// # Safety
  ///
  /// Same contract as [`SegAlloc::deallocate`].
  pub unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    self
      .with_heap(|heap| unsafe { heap.reallocate(ptr, size) })
      .flatten()
  }

  pub fn allocate_zeroed(&self, count: usize, elem: usize) -> Option<NonNull<u8>> {
    self
      .with_heap(|heap| heap.allocate_zeroed(count, elem))
      .flatten()
  }

  /// `align` must be a power of two.
  pub fn allocate_aligned(&self, align: usize, size: usize) -> Option<NonNull<u8>> {
    self
      .with_heap(|heap| heap.allocate_aligned(align, size))
      .flatten()
  }

  /// # Safety
  ///
  /// `ptr` must be a live allocation of this allocator.
  pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
    self
      .with_existing(|heap| unsafe { heap.usable_size(ptr) })
      .unwrap_or(0)
  }

  pub fn contains(&self, ptr: *const u8) -> bool {
    self
      .with_existing(|heap| heap.contains(ptr))
      .unwrap_or(false)
  }

  /// `None` until the first allocation has built the heap.
  pub fn check(&self) -> Option<CheckReport> {
    self.with_existing(|heap| heap.check())
  }

  pub fn stats(&self) -> Option<HeapStats> {
    self.with_existing(|heap| heap.stats())
  }
}

impl Default for SegAlloc {
  fn default() -> Self {
    Self::new()
  }
}

fn into_raw(ptr: Option<NonNull<u8>>) -> *mut u8 {
  ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
}

unsafe impl GlobalAlloc for SegAlloc {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let ptr = match layout.align() {
      align if align <= ALIGNMENT => self.allocate(layout.size()),
      align => self.allocate_aligned(align, layout.size()),
    };
    into_raw(ptr)
  }

  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    if layout.align() <= ALIGNMENT {
      return into_raw(self.allocate_zeroed(1, layout.size()));
    }

    let ptr = self.allocate_aligned(layout.align(), layout.size());
    if let Some(ptr) = ptr {
      unsafe { ptr.as_ptr().write_bytes(0, layout.size()) };
    }
    into_raw(ptr)
  }

  unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
    _ = layout;
    unsafe { self.deallocate(NonNull::new(ptr)) };
  }

  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    if layout.align() <= ALIGNMENT {
      return into_raw(unsafe { self.reallocate(NonNull::new(ptr), new_size) });
    }

    let Some(new) = self.allocate_aligned(layout.align(), new_size) else {
      return ptr::null_mut();
    };
    unsafe {
      ptr::copy_nonoverlapping(ptr, new.as_ptr(), cmp::min(layout.size(), new_size));
      self.deallocate(NonNull::new(ptr));
    }
    new.as_ptr()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lazy_bootstrap() {
    let alloc = SegAlloc::new();
    assert!(!alloc.contains(ptr::null()));
    assert!(alloc.heap.lock().is_none());

    let ptr = alloc.allocate(1).unwrap();
    assert!(alloc.contains(ptr.as_ptr()));
    assert_eq!(alloc.stats().unwrap().arena_bytes(), 4128);
    assert!(alloc.check().unwrap().is_ok());
  }

  #[test]
  fn test_diagnostics_do_not_bootstrap() {
    let alloc = SegAlloc::new();
    assert!(alloc.check().is_none());
    assert!(alloc.stats().is_none());
    assert!(alloc.heap.lock().is_none());
  }

  #[test]
  fn test_free_before_bootstrap_is_noop() {
    let alloc = SegAlloc::new();
    let mut local = 0u64;
    unsafe { alloc.deallocate(NonNull::new(&mut local as *mut u64 as *mut u8)) };
    assert!(alloc.heap.lock().is_none());
  }

  #[test]
  fn test_allocation_family() {
    let alloc = SegAlloc::new();

    let ptr = alloc.allocate(100).unwrap();
    assert_eq!(ptr.as_ptr() as usize % ALIGNMENT, 0);
    assert!(alloc.contains(ptr.as_ptr()));
    assert!(unsafe { alloc.usable_size(ptr) } >= 100);
    unsafe { ptr.as_ptr().write_bytes(7, 100) };

    let moved = unsafe { alloc.reallocate(Some(ptr), 1000) }.unwrap();
    assert_eq!(unsafe { *moved.as_ptr().add(99) }, 7);

    let zeroed = alloc.allocate_zeroed(8, 8).unwrap();
    assert!((0..64).all(|i| unsafe { *zeroed.as_ptr().add(i) } == 0));

    assert!(alloc.allocate(0).is_none());
    assert!(alloc.allocate_zeroed(usize::MAX, 2).is_none());

    unsafe {
      alloc.deallocate(Some(moved));
      alloc.deallocate(Some(zeroed));
    }
    assert_eq!(alloc.stats().unwrap().allocated_blocks(), 0);
    assert!(alloc.check().unwrap().is_ok());
  }

  #[test]
  fn test_global_alloc_layouts() {
    let alloc = SegAlloc::new();

    for align in [1, 8, 16, 64, 512, 4096] {
      let layout = Layout::from_size_align(200, align).unwrap();
      unsafe {
        let ptr = alloc.alloc_zeroed(layout);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % align, 0);
        assert!((0..200).all(|i| *ptr.add(i) == 0));
        ptr.write_bytes(0x42, 200);

        let grown = alloc.realloc(ptr, layout, 5000);
        assert_eq!(grown as usize % align, 0);
        assert!((0..200).all(|i| *grown.add(i) == 0x42));

        alloc.dealloc(grown, Layout::from_size_align(5000, align).unwrap());
      }
    }

    assert_eq!(alloc.stats().unwrap().allocated_blocks(), 0);
    assert!(alloc.check().unwrap().is_ok());
  }

  #[test]
  fn test_shared_across_threads() {
    static SHARED: SegAlloc = SegAlloc::new();

    std::thread::scope(|scope| {
      for t in 0..4u8 {
        scope.spawn(move || {
          let mut live = Vec::new();
          for i in 0..400usize {
            let size = 1 + (i * 37 + t as usize * 11) % 700;
            let ptr = SHARED.allocate(size).unwrap();
            unsafe { ptr.as_ptr().write_bytes(t, size) };
            live.push((ptr.as_ptr() as usize, size));

            if live.len() > 16 {
              let (addr, size) = live.swap_remove(i % live.len());
              let ptr = addr as *mut u8;
              assert!((0..size).all(|j| unsafe { *ptr.add(j) } == t));
              unsafe { SHARED.deallocate(NonNull::new(ptr)) };
            }
          }
          for (addr, _) in live {
            unsafe { SHARED.deallocate(NonNull::new(addr as *mut u8)) };
          }
        });
      }
    });

    assert!(SHARED.check().unwrap().is_ok());
    assert_eq!(SHARED.stats().unwrap().allocated_blocks(), 0);
  }
}
