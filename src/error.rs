//! Heap error types.

use thiserror::Error;

/// Result alias used by every fallible heap operation.
pub type Result<T> = core::result::Result<T, HeapError>;

/// Errors surfaced by the allocator and by [`Heap::check`](crate::Heap::check).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
  /// The memory source refused to grow the heap.
  #[error("heap exhausted: could not grow by {requested} bytes")]
  Exhausted { requested: usize },

  /// The memory source returned a region that does not continue the heap.
  #[error("memory source returned {actual:#x}, expected the heap end at {expected:#x}")]
  Discontiguous { expected: usize, actual: usize },

  #[error("request of {requested} bytes is too large")]
  RequestTooLarge { requested: usize },

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  // Reported by the heap checker only.
  #[error("header and footer disagree for block at offset {offset}")]
  TagMismatch { offset: usize },

  #[error("free blocks at offsets {first} and {second} were not coalesced")]
  AdjacentFree { first: usize, second: usize },

  #[error("block at offset {offset} has invalid size {size}")]
  BadBlockSize { offset: usize, size: usize },

  #[error("corrupted {0} sentinel")]
  BadSentinel(&'static str),

  #[error("free list holds {in_list} blocks but the heap has {in_heap} free blocks")]
  FreeListMismatch { in_list: usize, in_heap: usize },

  #[error("free list entry at offset {offset} is not a free block or has a broken link")]
  FreeListLink { offset: usize },
}
