//! The managed heap region and its growth.
//!
//! ```text
//!   base
//!   ▼
//!   ┌─────┬────────┬────────┬─────────────────────────────┬──────────┐
//!   │ pad │ 8 | a  │ 8 | a  │  blocks, back to back ...   │  0 | a   │
//!   └─────┴────────┴────────┴─────────────────────────────┴──────────┘
//!   0     4        8        12                          len-4       len
//!          └─── prologue ──┘                             epilogue
//! ```

use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::{
  block::{ALIGNMENT, Block, OVERHEAD, Tag, WORD},
  error::{HeapError, Result},
  source::MemorySource,
};

/// Bytes requested to hold the padding word and both sentinels.
const BOOTSTRAP_SIZE: usize = 4 * WORD;

/// Tags and free-list links store offsets in 32 bits.
const MAX_LEN: usize = u32::MAX as usize & !(ALIGNMENT - 1);

/// Location and state of one block, as reported by [`Heap::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub offset: usize,
  pub size: usize,
  pub allocated: bool,
}

/// A single contiguous heap grown through a [`MemorySource`].
///
/// All state lives here: the arena bounds and the head of the free list.
/// Nothing is shared between instances.
#[derive(Debug)]
pub struct Heap<S> {
  source: S,
  base: NonNull<u8>,
  len: usize,
  pub(crate) free_head: Option<Block>,
}

impl<S: MemorySource> Heap<S> {
  /// Requests the bootstrap region and writes the padding word, the prologue
  /// and the epilogue. The heap starts with no free blocks.
  pub fn new(mut source: S) -> Result<Self> {
    let start = grow(&mut source, BOOTSTRAP_SIZE)?;

    // Payloads are only 8-aligned if the base is.
    let pad = start.as_ptr().align_offset(ALIGNMENT);
    if pad != 0 {
      let expected = start.as_ptr() as usize + BOOTSTRAP_SIZE;
      let extra = grow(&mut source, pad)?;
      if extra.as_ptr() as usize != expected {
        return Err(HeapError::Discontiguous {
          expected,
          actual: extra.as_ptr() as usize,
        });
      }
    }

    let mut heap = Self {
      source,
      base: unsafe { start.add(pad) },
      len: BOOTSTRAP_SIZE,
      free_head: None,
    };

    heap.list_init();
    heap.write_word(0, 0);
    heap.set_tags(heap.prologue(), OVERHEAD, true);
    heap.set_header(heap.epilogue(), 0, true);

    debug!(base = ?heap.base, pad, "heap bootstrapped");

    Ok(heap)
  }

  /// Grows the heap by `size` bytes and returns the resulting free block,
  /// already merged with a free block that ended the heap, if any.
  pub(crate) fn extend_heap(
    &mut self,
    size: usize,
  ) -> Result<Block> {
    debug_assert!(size > 0 && size % ALIGNMENT == 0, "bad extension size {size}");

    if self.len.checked_add(size).is_none_or(|len| len > MAX_LEN) {
      warn!(size, len = self.len, "heap would exceed the addressable range");
      return Err(HeapError::Exhausted { requested: size });
    }

    let start = grow(&mut self.source, size)?;
    let expected = self.base.as_ptr() as usize + self.len;
    if start.as_ptr() as usize != expected {
      return Err(HeapError::Discontiguous {
        expected,
        actual: start.as_ptr() as usize,
      });
    }

    // The old epilogue header becomes the header of the new block.
    let block = self.epilogue();
    self.len += size;
    self.set_tags(block, size, false);
    self.set_header(self.epilogue(), 0, true);

    debug!(size, len = self.len, "heap extended");

    Ok(self.free_coalesce(block))
  }
}

impl<S> Heap<S> {
  /// Bytes currently managed, sentinels included.
  #[allow(clippy::len_without_is_empty)]
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub(crate) const fn prologue(&self) -> Block {
    Block::at(WORD)
  }

  pub(crate) fn epilogue(&self) -> Block {
    Block::at(self.len - WORD)
  }

  /// Every block between the sentinels, in address order.
  pub fn blocks(&self) -> Blocks<'_, S> {
    Blocks {
      heap: self,
      cursor: self.next(self.prologue()),
    }
  }

  /// Offset of the block whose payload starts at `ptr`, if `ptr` points
  /// into the heap.
  pub fn offset_of(
    &self,
    ptr: *const u8,
  ) -> Option<usize> {
    let payload = (ptr as usize).checked_sub(self.base.as_ptr() as usize)?;

    (payload >= 2 * OVERHEAD && payload < self.len).then(|| Block::from_payload(payload).offset())
  }

  pub(crate) fn block_of(
    &self,
    ptr: *const u8,
  ) -> Block {
    match self.offset_of(ptr) {
      Some(offset) => Block::at(offset),
      None => panic!("pointer {ptr:?} does not belong to this heap"),
    }
  }

  pub(crate) fn payload_ptr(
    &self,
    block: Block,
  ) -> *mut u8 {
    unsafe { self.base.as_ptr().add(block.payload()) }
  }

  pub(crate) fn read_word(
    &self,
    offset: usize,
  ) -> u32 {
    assert!(offset + WORD <= self.len, "word at offset {offset} lies outside the heap");
    debug_assert_eq!(offset % WORD, 0);

    unsafe { self.base.as_ptr().add(offset).cast::<u32>().read() }
  }

  pub(crate) fn write_word(
    &mut self,
    offset: usize,
    value: u32,
  ) {
    assert!(offset + WORD <= self.len, "word at offset {offset} lies outside the heap");
    debug_assert_eq!(offset % WORD, 0);

    unsafe { self.base.as_ptr().add(offset).cast::<u32>().write(value) }
  }
}

fn grow<S: MemorySource>(
  source: &mut S,
  size: usize,
) -> Result<NonNull<u8>> {
  source.grow(size).ok_or_else(|| {
    warn!(size, "memory source refused to grow");
    HeapError::Exhausted { requested: size }
  })
}

/// Iterator over the blocks of a heap. See [`Heap::blocks`].
pub struct Blocks<'a, S> {
  heap: &'a Heap<S>,
  cursor: Block,
}

impl<S> Iterator for Blocks<'_, S> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let Tag { size, allocated } = self.heap.tag(self.cursor);
    if size == 0 {
      return None;
    }

    let info = BlockInfo {
      offset: self.cursor.offset(),
      size,
      allocated,
    };
    self.cursor = Block::at(self.cursor.offset() + size);

    Some(info)
  }
}
