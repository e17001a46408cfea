//! Address-space collaborators the heap grows into.

use std::{alloc, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::block::ALIGNMENT;

/// Something that can extend a single contiguous address range.
///
/// Every successful call must return a region that starts exactly where the
/// previous one ended. The heap verifies this and reports
/// [`HeapError::Discontiguous`](crate::HeapError::Discontiguous) otherwise.
pub trait MemorySource {
  /// Extends the range by `bytes`, returning the start of the new region, or
  /// `None` when no more memory is available.
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;
}

/// Grows the process data segment with `sbrk(2)`.
///
/// Memory is never handed back to the operating system. Anything else in
/// the process that moves the program break will break contiguity.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

impl MemorySource for Sbrk {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let increment = intptr_t::try_from(bytes).ok()?;
    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(address.cast())
  }
}

/// A fixed-capacity region owned by the process, grown by bumping an
/// internal break. Useful for tests and for embedding a bounded heap.
#[derive(Debug)]
pub struct Arena {
  start: NonNull<u8>,
  layout: alloc::Layout,
  brk: usize,
}

impl Arena {
  /// Reserves `capacity` bytes (rounded up to 8), zeroed and 8-aligned.
  pub fn new(capacity: usize) -> Self {
    let size = crate::align!(capacity.max(ALIGNMENT));
    let layout = match alloc::Layout::from_size_align(size, ALIGNMENT) {
      Ok(layout) => layout,
      Err(_) => panic!("arena capacity {capacity} is too large"),
    };

    let start = unsafe { alloc::alloc_zeroed(layout) };
    let Some(start) = NonNull::new(start) else {
      alloc::handle_alloc_error(layout);
    };

    Self { start, layout, brk: 0 }
  }

  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.brk
  }
}

impl MemorySource for Arena {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    if bytes > self.capacity() - self.brk {
      return None;
    }

    let region = unsafe { self.start.add(self.brk) };
    self.brk += bytes;

    Some(region)
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.start.as_ptr(), self.layout) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_arena_grows_contiguously() {
    let mut arena = Arena::new(100);

    assert_eq!(104, arena.capacity());

    let first = arena.grow(16).unwrap();
    let second = arena.grow(8).unwrap();

    assert_eq!(0, first.as_ptr() as usize % ALIGNMENT);
    assert_eq!(first.as_ptr() as usize + 16, second.as_ptr() as usize);
    assert_eq!(24, arena.used());
  }

  #[test]
  fn test_arena_refuses_past_capacity() {
    let mut arena = Arena::new(32);

    assert!(arena.grow(24).is_some());
    assert!(arena.grow(16).is_none());
    assert_eq!(24, arena.used());
    assert!(arena.grow(8).is_some());
    assert!(arena.grow(1).is_none());
  }
}
