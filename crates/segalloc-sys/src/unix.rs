use core::ptr::{
  self,
  NonNull,
};

use crate::{
  prim::page_align,
  region::{
    Region,
    RegionError,
    RegionResult,
  },
};

/// An `sbrk` stand-in built on one up-front virtual reservation.
///
/// The whole range is mapped `PROT_NONE` once; `grow` commits pages with
/// `mprotect` as the break moves, so the region never relocates.
pub struct MmapRegion {
  base: NonNull<u8>,
  reserved: usize,
  committed: usize,
  len: usize,
}

impl MmapRegion {
  const fn flags() -> i32 {
    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS
  }

  const fn commit_prot() -> i32 {
    libc::PROT_READ | libc::PROT_WRITE
  }

  const fn as_c(ptr: *mut u8) -> *mut libc::c_void {
    ptr as *mut libc::c_void
  }

  /// Reserves `size` bytes of address space, rounded up to whole pages.
  pub fn reserve(size: usize) -> RegionResult<Self> {
    let reserved = page_align(size).map_err(|_| RegionError::Overflow)?;
    if reserved == 0 {
      return Err(RegionError::InvalidArgument);
    }

    let ptr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        reserved,
        libc::PROT_NONE,
        Self::flags(),
        -1,
        0,
      )
    };

    if ptr == libc::MAP_FAILED {
      return Err(RegionError::Exhausted);
    }

    let base = NonNull::new(ptr as *mut u8).ok_or(RegionError::Exhausted)?;
    Ok(Self {
      base,
      reserved,
      committed: 0,
      len: 0,
    })
  }

  pub fn reserved(&self) -> usize {
    self.reserved
  }

  pub fn committed(&self) -> usize {
    self.committed
  }

  fn commit(&mut self, upto: usize) -> RegionResult<()> {
    if upto <= self.committed {
      return Ok(());
    }

    let target = page_align(upto).map_err(|_| RegionError::Overflow)?;
    let target = target.min(self.reserved);
    let start = self.base.as_ptr().wrapping_add(self.committed);
    let result = unsafe {
      libc::mprotect(
        Self::as_c(start),
        target - self.committed,
        Self::commit_prot(),
      )
    };

    if result != 0 {
      return Err(RegionError::Exhausted);
    }

    self.committed = target;
    Ok(())
  }
}

unsafe impl Region for MmapRegion {
  fn base(&self) -> NonNull<u8> {
    self.base
  }

  fn len(&self) -> usize {
    self.len
  }

  fn grow(&mut self, bytes: usize) -> RegionResult<NonNull<u8>> {
    let end = self.len.checked_add(bytes).ok_or(RegionError::Overflow)?;
    if end > self.reserved {
      return Err(RegionError::Exhausted);
    }

    self.commit(end)?;

    // SAFETY: `self.len <= self.reserved`, inside the mapping.
    let start = unsafe { self.base.add(self.len) };
    self.len = end;
    Ok(start)
  }
}

impl Drop for MmapRegion {
  fn drop(&mut self) {
    let _ = unsafe { libc::munmap(Self::as_c(self.base.as_ptr()), self.reserved) };
  }
}

unsafe impl Send for MmapRegion {}
