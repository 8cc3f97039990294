use core::{
  marker::PhantomData,
  ptr::NonNull,
};

use crate::{
  math::align_offset,
  region::{
    REGION_ALIGN,
    Region,
    RegionError,
    RegionResult,
  },
};

/// A region carved out of a borrowed buffer. Growth fails once the buffer
/// is used up.
pub struct FixedRegion<'buf> {
  base: NonNull<u8>,
  capacity: usize,
  len: usize,
  _marker: PhantomData<&'buf mut [u8]>,
}

impl<'buf> FixedRegion<'buf> {
  /// Uses `buffer` from its first [`REGION_ALIGN`]-aligned byte onwards.
  pub fn new(buffer: &'buf mut [u8]) -> RegionResult<Self> {
    let skip = align_offset(buffer.as_ptr() as usize, REGION_ALIGN).ok_or(RegionError::Overflow)?;
    if skip > buffer.len() {
      return Err(RegionError::InvalidArgument);
    }

    let usable = &mut buffer[skip..];
    let base = NonNull::new(usable.as_mut_ptr()).ok_or(RegionError::InvalidArgument)?;

    Ok(Self {
      base,
      capacity: usable.len(),
      len: 0,
      _marker: PhantomData,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn remaining(&self) -> usize {
    self.capacity - self.len
  }
}

unsafe impl Region for FixedRegion<'_> {
  fn base(&self) -> NonNull<u8> {
    self.base
  }

  fn len(&self) -> usize {
    self.len
  }

  fn grow(&mut self, bytes: usize) -> RegionResult<NonNull<u8>> {
    let end = self.len.checked_add(bytes).ok_or(RegionError::Overflow)?;
    if end > self.capacity {
      return Err(RegionError::Exhausted);
    }

    // SAFETY: `self.len <= self.capacity`, so the offset stays inside the buffer.
    let start = unsafe { self.base.add(self.len) };
    self.len = end;
    Ok(start)
  }
}

unsafe impl Send for FixedRegion<'_> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fixed_base_is_aligned() {
    let mut buffer = vec![0u8; 256];
    for skew in 0..REGION_ALIGN {
      let region = FixedRegion::new(&mut buffer[skew..]).unwrap();
      assert_eq!(region.base().as_ptr() as usize % REGION_ALIGN, 0);
      assert!(region.capacity() > 256 - 2 * REGION_ALIGN);
      assert!(region.is_empty());
    }
  }

  #[test]
  fn test_fixed_grow_is_contiguous() {
    let mut buffer = vec![0u8; 512];
    let mut region = FixedRegion::new(&mut buffer).unwrap();
    let base = region.base().as_ptr() as usize;

    let first = region.grow(32).unwrap();
    let second = region.grow(64).unwrap();

    assert_eq!(first.as_ptr() as usize, base);
    assert_eq!(second.as_ptr() as usize, base + 32);
    assert_eq!(region.len(), 96);
    assert_eq!(region.hi().unwrap().as_ptr() as usize, base + 95);
    assert!(region.contains(second.as_ptr()));
    assert!(!region.contains((base + 96) as *const u8));
  }

  #[test]
  fn test_fixed_exhaustion_keeps_len() {
    let mut buffer = vec![0u8; 128];
    let mut region = FixedRegion::new(&mut buffer).unwrap();
    let capacity = region.capacity();

    assert!(region.grow(capacity).is_ok());
    assert_eq!(region.remaining(), 0);
    assert_eq!(region.grow(16), Err(RegionError::Exhausted));
    assert_eq!(region.len(), capacity);
    assert_eq!(region.grow(usize::MAX), Err(RegionError::Overflow));
  }

  #[test]
  fn test_fixed_empty_buffer() {
    let mut buffer: [u8; 0] = [];
    match FixedRegion::new(&mut buffer) {
      Ok(mut region) => {
        assert_eq!(region.capacity(), 0);
        assert!(region.hi().is_none());
        assert_eq!(region.grow(1), Err(RegionError::Exhausted));
      }
      Err(err) => assert_eq!(err, RegionError::InvalidArgument),
    }
  }
}
