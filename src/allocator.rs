use std::ptr;

use tracing::trace;

use crate::{
  align,
  block::{ALIGNMENT, Block, MIN_BLOCK_SIZE, OVERHEAD},
  config::Config,
  error::{HeapError, Result},
  heap::Heap,
  source::MemorySource,
};

/// Computes the block size needed for `payload` bytes: payload plus both
/// tags, rounded up to 8.
fn required_block_size(payload: usize) -> Result<usize> {
  match payload.checked_add(OVERHEAD + ALIGNMENT - 1) {
    Some(_) => Ok(align!(payload + OVERHEAD).max(MIN_BLOCK_SIZE)),
    None => Err(HeapError::RequestTooLarge { requested: payload }),
  }
}

/// First-fit allocator over an explicit free list with boundary-tag
/// coalescing.
///
/// Not thread-safe: every operation takes `&mut self`. Wrap it in a lock if
/// it has to be shared.
#[derive(Debug)]
pub struct Allocator<S: MemorySource> {
  heap: Heap<S>,
  config: Config,
}

impl<S: MemorySource> Allocator<S> {
  /// Bootstraps a heap on `source` with the default [`Config`].
  pub fn new(source: S) -> Result<Self> {
    Self::with_config(source, Config::default())
  }

  /// Bootstraps a heap on `source`: installs the sentinels, then adds
  /// `config.initial_size` bytes of free space.
  pub fn with_config(
    source: S,
    config: Config,
  ) -> Result<Self> {
    config.validate()?;

    let mut heap = Heap::new(source)?;
    heap.extend_heap(config.initial_size)?;

    Ok(Self { heap, config })
  }

  pub fn heap(&self) -> &Heap<S> {
    &self.heap
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// First free block, in list order, that spans at least `size` bytes.
  fn find_fit(
    &self,
    size: usize,
  ) -> Option<Block> {
    self.heap.free_blocks().find(|&block| self.heap.size_of(block) >= size)
  }

  /// Allocates `size` bytes out of the free `block`, splitting off the rest
  /// when it can form a block of its own.
  fn place(
    &mut self,
    block: Block,
    size: usize,
  ) -> Block {
    let total = self.heap.size_of(block);
    let remainder = total - size;

    self.heap.list_remove(block);

    if remainder < MIN_BLOCK_SIZE {
      trace!(offset = block.offset(), total, "placed without split");
      self.heap.set_tags(block, total, true);
      return block;
    }

    if size >= self.config.tail_threshold {
      self.heap.set_tags(block, remainder, false);
      self.heap.list_prepend(block);
      let tail = self.heap.next(block);
      self.heap.set_tags(tail, size, true);

      trace!(offset = tail.offset(), size, remainder, "placed at tail");
      tail
    } else {
      self.heap.set_tags(block, size, true);
      let rest = self.heap.next(block);
      self.heap.set_tags(rest, remainder, false);
      self.heap.list_prepend(rest);

      trace!(offset = block.offset(), size, remainder, "placed at head");
      block
    }
  }

  /// Allocates at least `size` bytes and returns an 8-aligned pointer to
  /// them, growing the heap when no free block fits.
  ///
  /// A zero-byte request allocates nothing and returns a null pointer.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<*mut u8> {
    if size == 0 {
      return Ok(ptr::null_mut());
    }

    let required = required_block_size(size)?;

    let block = loop {
      if let Some(block) = self.find_fit(required) {
        break block;
      }
      self.heap.extend_heap(required.max(self.config.chunk_size))?;
    };

    let block = self.place(block, required);
    trace!(size, offset = block.offset(), "allocated");

    Ok(self.heap.payload_ptr(block))
  }

  /// Returns the block behind `ptr` to the free list, merged with any free
  /// neighbors. A null pointer is ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by [`allocate`](Self::allocate)
  /// or [`resize`](Self::resize) on this allocator that has not been
  /// released yet.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }

    let block = self.heap.block_of(ptr);
    debug_assert!(self.heap.is_allocated(block), "release of free block at {ptr:?}");

    let merged = self.heap.free_coalesce(block);
    trace!(offset = block.offset(), merged = merged.offset(), "released");
  }

  /// Resizes the allocation at `ptr` to hold at least `size` bytes,
  /// preserving its contents up to the smaller of the two sizes.
  ///
  /// Blocks never shrink. A block grows in place when the following block
  /// is free and large enough; otherwise the data moves to a new block. If
  /// that allocation fails, the original block is left untouched.
  ///
  /// A null `ptr` behaves like [`allocate`](Self::allocate); a zero `size`
  /// releases `ptr` and returns null.
  ///
  /// # Safety
  ///
  /// Same contract as [`release`](Self::release).
  pub unsafe fn resize(
    &mut self,
    ptr: *mut u8,
    size: usize,
  ) -> Result<*mut u8> {
    unsafe {
      if ptr.is_null() {
        return self.allocate(size);
      }

      if size == 0 {
        self.release(ptr);
        return Ok(ptr::null_mut());
      }

      let block = self.heap.block_of(ptr);
      let current = self.heap.size_of(block);
      let capacity = current - OVERHEAD;

      if size <= capacity {
        return Ok(ptr);
      }

      let next = self.heap.next(block);
      if !self.heap.is_allocated(next) {
        let combined = current + self.heap.size_of(next);
        if combined - OVERHEAD >= size {
          self.heap.list_remove(next);
          self.heap.set_tags(block, combined, true);

          trace!(offset = block.offset(), combined, "grown in place");
          return Ok(ptr);
        }
      }

      let moved = self.allocate(size)?;
      ptr::copy_nonoverlapping(ptr, moved, capacity.min(size));
      self.release(ptr);

      trace!(from = block.offset(), to = ?moved, size, "relocated");
      Ok(moved)
    }
  }
}
