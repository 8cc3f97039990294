use core::fmt;

use getset::CopyGetters;
use log::error;
use segalloc_block::{
  Block,
  Tag,
};
use segalloc_list::{
  Link,
  class_of,
};
use segalloc_sys::{
  math::is_aligned,
  region::Region,
};

use crate::{
  config::{
    ALIGNMENT,
    MIN_BLOCK,
    NCLASSES,
    OVERHEAD,
    WORD,
  },
  heap::{
    Heap,
    PROLOGUE,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
  Prologue { header: Tag, footer: Tag },
  Epilogue { offset: usize, tag: Tag },
  OutOfBounds { block: Block },
  BadSize { block: Block, size: usize },
  Misaligned { block: Block },
  TagMismatch { block: Block, header: Tag, footer: Tag },
  MissedCoalesce { block: Block, next: Block },
  ListedAllocated { class: usize, block: Block },
  WrongClass { class: usize, block: Block, size: usize },
  BrokenLink { class: usize, block: Block },
  ListCycle { class: usize },
  FreeCount { walked: usize, listed: usize },
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      Violation::Prologue { header, footer } => {
        write!(f, "prologue corrupt: header {:#x}, footer {:#x}", header.raw(), footer.raw())
      }
      Violation::Epilogue { offset, tag } => {
        write!(f, "epilogue {:#x} at offset {offset} is not at the arena end", tag.raw())
      }
      Violation::OutOfBounds { block } => write!(f, "block {} runs past the arena", block.offset()),
      Violation::BadSize { block, size } => write!(f, "block {} has bad size {size}", block.offset()),
      Violation::Misaligned { block } => write!(f, "block {} payload is misaligned", block.offset()),
      Violation::TagMismatch {
        block,
        header,
        footer,
      } => write!(
        f,
        "block {} header {:#x} does not match footer {:#x}",
        block.offset(),
        header.raw(),
        footer.raw()
      ),
      Violation::MissedCoalesce { block, next } => write!(
        f,
        "adjacent free blocks {} and {}",
        block.offset(),
        next.offset()
      ),
      Violation::ListedAllocated { class, block } => {
        write!(f, "class {class} lists allocated block {}", block.offset())
      }
      Violation::WrongClass { class, block, size } => write!(
        f,
        "class {class} lists block {} of size {size}, which belongs to class {}",
        block.offset(),
        class_of(size)
      ),
      Violation::BrokenLink { class, block } => {
        write!(f, "class {class}: block {} has a stale back link", block.offset())
      }
      Violation::ListCycle { class } => write!(f, "class {class} list does not terminate"),
      Violation::FreeCount { walked, listed } => {
        write!(f, "{walked} free blocks in the arena but {listed} listed")
      }
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct CheckReport {
  blocks: usize,
  free_blocks: usize,
  listed: usize,
  violations: usize,
  first: Option<Violation>,
}

impl CheckReport {
  pub fn is_ok(&self) -> bool {
    self.violations == 0
  }

  fn record(&mut self, violation: Violation) {
    error!("heap check: {violation}");
    self.violations += 1;
    self.first.get_or_insert(violation);
  }
}

impl<R: Region> Heap<R> {
  pub fn check(&self) -> CheckReport {
    let mut report = CheckReport::default();

    if !self.walk_arena(&mut report) {
      return report;
    }

    self.walk_lists(&mut report);
    if report.listed != report.free_blocks {
      report.record(Violation::FreeCount {
        walked: report.free_blocks,
        listed: report.listed,
      });
    }

    report
  }

  fn in_arena(&self, block: Block, size: usize) -> bool {
    block
      .offset()
      .checked_add(size)
      .is_some_and(|end| block.offset() >= OVERHEAD && end <= self.arena.len())
  }

  /// Returns false when the tags are too broken to keep walking.
  fn walk_arena(&self, report: &mut CheckReport) -> bool {
    let expected = Tag::pack(OVERHEAD, true);
    let header = self.arena.header(PROLOGUE);
    let footer = self.arena.tag(PROLOGUE.footer(OVERHEAD));
    if header != expected || footer != expected {
      report.record(Violation::Prologue { header, footer });
      return false;
    }

    let mut block = self.arena.next(PROLOGUE);
    let mut free_before: Option<Block> = None;

    loop {
      if !self.in_arena(block, 0) {
        report.record(Violation::OutOfBounds { block });
        return false;
      }

      let header = self.arena.header(block);
      let size = header.size();
      if size == 0 {
        let end = self.arena.len() - WORD;
        if header.is_free() || block.header() != end {
          report.record(Violation::Epilogue {
            offset: block.header(),
            tag: header,
          });
        }
        return true;
      }

      if size < MIN_BLOCK || is_aligned(size, ALIGNMENT) != Some(true) {
        report.record(Violation::BadSize { block, size });
        return false;
      }
      // the successor's header sits in the last word of this span
      if !self.in_arena(block, size) {
        report.record(Violation::OutOfBounds { block });
        return false;
      }
      if is_aligned(self.arena.payload(block).as_ptr() as usize, ALIGNMENT) != Some(true) {
        report.record(Violation::Misaligned { block });
      }

      let footer = self.arena.tag(block.footer(size));
      if footer != header {
        report.record(Violation::TagMismatch {
          block,
          header,
          footer,
        });
      }

      report.blocks += 1;
      if header.is_free() {
        report.free_blocks += 1;
        if let Some(before) = free_before {
          report.record(Violation::MissedCoalesce {
            block: before,
            next: block,
          });
        }
        free_before = Some(block);
      } else {
        free_before = None;
      }

      block = block.forward(size);
    }
  }

  fn valid_link(&self, block: Block) -> bool {
    self.in_arena(block, MIN_BLOCK) && is_aligned(block.offset(), ALIGNMENT) == Some(true)
  }

  fn next_link(&self, block: Block) -> Option<Block> {
    if !self.valid_link(block) {
      return None;
    }
    Link::read(&self.arena, block).next()
  }

  /// Floyd's two-speed walk over one class.
  fn has_cycle(&self, class: usize) -> bool {
    let mut slow = self.lists.head(class);
    let mut fast = slow;

    loop {
      fast = fast
        .and_then(|block| self.next_link(block))
        .and_then(|block| self.next_link(block));
      slow = slow.and_then(|block| self.next_link(block));

      match fast {
        None => return false,
        Some(_) if fast == slow => return true,
        Some(_) => {}
      }
    }
  }

  fn walk_lists(&self, report: &mut CheckReport) {
    for class in 0..NCLASSES {
      if self.has_cycle(class) {
        report.record(Violation::ListCycle { class });
        continue;
      }

      let mut prev = None;
      let mut cursor = self.lists.head(class);

      while let Some(block) = cursor {
        if !self.valid_link(block) {
          report.record(Violation::OutOfBounds { block });
          break;
        }

        let tag = self.arena.header(block);
        if tag.is_allocated() {
          report.record(Violation::ListedAllocated { class, block });
        }
        if class_of(tag.size()) != class {
          report.record(Violation::WrongClass {
            class,
            block,
            size: tag.size(),
          });
        }

        let link = Link::read(&self.arena, block);
        if link.prev() != prev {
          report.record(Violation::BrokenLink { class, block });
        }

        report.listed += 1;
        prev = Some(block);
        cursor = link.next();
      }
    }
  }
}
