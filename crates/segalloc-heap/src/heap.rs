use core::{
  cmp,
  ptr::{
    self,
    NonNull,
  },
};

use log::{
  debug,
  trace,
  warn,
};
use segalloc_block::{
  Arena,
  Block,
  Tag,
};
use segalloc_list::FreeLists;
use segalloc_sys::{
  math::{
    align_offset,
    align_up,
    is_aligned,
  },
  region::{
    Region,
    RegionError,
  },
};

use crate::{
  config::{
    ALIGNMENT,
    EXTEND_SIZE,
    MIN_BLOCK,
    OVERHEAD,
    PROLOGUE_SPAN,
  },
  error::{
    HeapError,
    HeapResult,
  },
};

pub(crate) const PROLOGUE: Block = match Block::new(OVERHEAD) {
  Some(block) => block,
  None => unreachable!(),
};

pub(crate) fn adjusted_size(size: usize) -> HeapResult<usize> {
  if size == 0 {
    return Err(HeapError::ZeroSize);
  }

  let padded = size.checked_add(OVERHEAD).ok_or(HeapError::Overflow)?;
  let asize = align_up(padded, ALIGNMENT).ok_or(HeapError::Overflow)?;
  Ok(cmp::max(asize, MIN_BLOCK))
}

pub struct Heap<R: Region> {
  pub(crate) region: R,
  pub(crate) arena: Arena,
  pub(crate) lists: FreeLists,
}

impl<R: Region> Heap<R> {
  pub fn new(region: R) -> HeapResult<Self> {
    let base = region.base();
    if !region.is_empty() || is_aligned(base.as_ptr() as usize, ALIGNMENT) != Some(true) {
      return Err(HeapError::Region(RegionError::InvalidArgument));
    }

    let mut heap = Self {
      region,
      arena: Arena::new(base, 0),
      lists: FreeLists::new(),
    };
    heap.bootstrap()?;
    Ok(heap)
  }

  fn bootstrap(&mut self) -> HeapResult<()> {
    self.lists.clear();

    let start = self.grow(PROLOGUE_SPAN)?;
    self.arena.write(start, 0);
    self.arena.stamp(PROLOGUE, Tag::pack(OVERHEAD, true));
    let first = self.arena.next(PROLOGUE);
    self.arena.set_tag(first.header(), Tag::EPILOGUE);

    let seed = self.extend(EXTEND_SIZE)?;
    debug!(
      "heap ready at {:p}, first free block {} bytes",
      self.arena.base(),
      self.arena.header(seed).size()
    );
    Ok(())
  }

  fn grow(&mut self, bytes: usize) -> HeapResult<usize> {
    let start = self.arena.len();
    let span = self.region.grow(bytes)?;
    debug_assert_eq!(
      span.as_ptr() as usize,
      self.arena.base().as_ptr() as usize + start,
      "region grew discontiguously"
    );
    self.arena.set_len(self.region.len());
    Ok(start)
  }

  /// Appends a free block of at least `bytes` and merges it with a free
  /// block that ended at the old epilogue.
  pub(crate) fn extend(&mut self, bytes: usize) -> HeapResult<Block> {
    let size = align_up(bytes, ALIGNMENT).ok_or(HeapError::Overflow)?;
    let start = self.grow(size)?;

    // The new payload begins where the old end was, so its header takes
    // over the old epilogue word.
    let block = Block::new(start).ok_or(HeapError::Overflow)?;
    self.arena.stamp(block, Tag::pack(size, false));
    let epilogue = self.arena.next(block);
    self.arena.set_tag(epilogue.header(), Tag::EPILOGUE);

    self.lists.insert(&mut self.arena, block);
    debug!("arena extended by {size} bytes to {}", self.arena.len());
    Ok(self.coalesce(block))
  }

  pub(crate) fn allocate_block(&mut self, size: usize) -> HeapResult<Block> {
    let asize = adjusted_size(size)?;

    let block = match self.find_fit(asize) {
      Some(block) => block,
      None => self
        .extend(cmp::max(asize, EXTEND_SIZE))
        .inspect_err(|err| warn!("allocate({size}): {err}"))?,
    };

    Ok(self.place(block, asize))
  }

  pub fn try_allocate(&mut self, size: usize) -> HeapResult<NonNull<u8>> {
    let block = self.allocate_block(size)?;
    let ptr = self.arena.payload(block);
    trace!("allocate({size}) -> {ptr:p}");
    Ok(ptr)
  }

  pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
    self.try_allocate(size).ok()
  }

  /// # Safety
  ///
  /// `ptr` must have come from this heap and must not have been released
  /// since. The payload must not be touched afterwards.
  pub unsafe fn deallocate(&mut self, ptr: Option<NonNull<u8>>) {
    let Some(ptr) = ptr else {
      return;
    };

    let block = self.arena.block_of(ptr);
    debug_assert!(block.is_some(), "free of foreign pointer {ptr:p}");
    let Some(block) = block else {
      return;
    };

    let tag = self.arena.header(block);
    debug_assert!(tag.is_allocated(), "double free of {ptr:p}");
    if tag.is_free() {
      return;
    }

    self.arena.stamp(block, tag.with_allocated(false));
    self.lists.insert(&mut self.arena, block);
    self.coalesce(block);
    trace!("deallocate({ptr:p}) size {}", tag.size());
  }

  /// # Safety
  ///
  /// Same contract as [`Heap::deallocate`] for `ptr`.
  pub unsafe fn reallocate(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    let Some(old) = ptr else {
      return self.allocate(size);
    };

    if size == 0 {
      unsafe { self.deallocate(Some(old)) };
      return None;
    }

    let capacity = self.arena.capacity(self.arena.block_of(old)?);
    let new = self.allocate(size)?;
    unsafe {
      ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), cmp::min(size, capacity));
      self.deallocate(Some(old));
    }

    trace!("reallocate({old:p}, {size}) -> {new:p}");
    Some(new)
  }

  pub fn try_allocate_zeroed(&mut self, count: usize, elem: usize) -> HeapResult<NonNull<u8>> {
    let size = count.checked_mul(elem).ok_or(HeapError::Overflow)?;
    let ptr = self.try_allocate(size)?;
    unsafe { ptr.as_ptr().write_bytes(0, size) };
    Ok(ptr)
  }

  pub fn allocate_zeroed(&mut self, count: usize, elem: usize) -> Option<NonNull<u8>> {
    self.try_allocate_zeroed(count, elem).ok()
  }

  pub fn try_allocate_aligned(&mut self, align: usize, size: usize) -> HeapResult<NonNull<u8>> {
    if !align.is_power_of_two() {
      return Err(HeapError::InvalidAlignment);
    }
    if align <= ALIGNMENT {
      return self.try_allocate(size);
    }

    let asize = adjusted_size(size)?;
    let padded = asize
      .checked_add(align)
      .and_then(|bytes| bytes.checked_add(MIN_BLOCK))
      .ok_or(HeapError::Overflow)?;
    let block = self.allocate_block(padded - OVERHEAD)?;
    let total = self.arena.header(block).size();

    let addr = self.arena.payload(block).as_ptr() as usize;
    let mut lead = align_offset(addr, align).ok_or(HeapError::Overflow)?;
    if lead != 0 && lead < MIN_BLOCK {
      lead += align;
    }

    let block = match lead {
      0 => block,
      _ => {
        let aligned = block.forward(lead);
        self.arena.stamp(block, Tag::pack(lead, false));
        self.arena.stamp(aligned, Tag::pack(total - lead, true));
        self.lists.insert(&mut self.arena, block);
        self.coalesce(block);
        aligned
      }
    };

    self.trim(block, asize);
    let ptr = self.arena.payload(block);
    trace!("allocate_aligned({align}, {size}) -> {ptr:p}");
    Ok(ptr)
  }

  pub fn allocate_aligned(&mut self, align: usize, size: usize) -> Option<NonNull<u8>> {
    self.try_allocate_aligned(align, size).ok()
  }

  /// # Safety
  ///
  /// `ptr` must be a live allocation of this heap.
  pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
    self
      .arena
      .block_of(ptr)
      .map_or(0, |block| self.arena.capacity(block))
  }

  pub fn lo(&self) -> NonNull<u8> {
    self.region.lo()
  }

  pub fn hi(&self) -> Option<NonNull<u8>> {
    self.region.hi()
  }

  pub fn contains(&self, ptr: *const u8) -> bool {
    self.region.contains(ptr)
  }

  pub fn region(&self) -> &R {
    &self.region
  }
}
