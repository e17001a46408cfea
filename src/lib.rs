//! # tagalloc - An Explicit Free-List Memory Allocator
//!
//! This crate provides a general-purpose `allocate` / `release` / `resize`
//! allocator over a single contiguous heap that grows on demand, in the
//! style of `sbrk`-backed `malloc` implementations.
//!
//! ## Overview
//!
//! Every block carries a **boundary tag** at both ends, so the allocator can
//! walk to either neighbor without any side table. Free blocks are chained
//! into an **explicit free list** whose links live inside their own unused
//! payload.
//!
//! ```text
//!   Heap after a few allocations and releases:
//!
//!   ┌───┬──────┬────────┬──────────────┬────────┬───────────────┬──────┐
//!   │pad│ prol │ A (a)  │   free       │ B (a)  │     free      │ epil │
//!   └───┴──────┴────────┴──────────────┴────────┴───────────────┴──────┘
//!                            ▲    │                    ▲
//!   free list head ──────────┼────┼────────────────────┘
//!                            └────┘◄── next link stored in the free block
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Rounding to the 8-byte double word (align!)
//!   ├── block      - Boundary-tag encoding and neighbor arithmetic
//!   ├── list       - Explicit free list (links inside free payloads)
//!   ├── coalesce   - Merging freed blocks with free neighbors
//!   ├── heap       - Heap context, sentinels, heap growth
//!   ├── check      - Heap consistency checker
//!   ├── source     - MemorySource trait, Sbrk and Arena
//!   ├── allocator  - Allocator: allocate / release / resize
//!   ├── config     - Growth and placement tunables
//!   └── error      - HeapError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::{Allocator, Arena};
//!
//! let mut allocator = Allocator::new(Arena::new(4096)).unwrap();
//!
//! unsafe {
//!     let ptr = allocator.allocate(8).unwrap() as *mut u64;
//!     *ptr = 42;
//!
//!     let ptr = allocator.resize(ptr as *mut u8, 64).unwrap() as *mut u64;
//!     assert_eq!(42, *ptr);
//!
//!     allocator.release(ptr as *mut u8);
//! }
//!
//! assert!(allocator.heap().check().is_ok());
//! ```
//!
//! ## How It Works
//!
//! - **allocate**: the request plus 8 bytes of tags is rounded up to a
//!   multiple of 8. The free list is searched first-fit. If nothing fits,
//!   the heap grows by at least 512 bytes and the search is retried. A
//!   larger block is split when the rest can stand alone (16 bytes or
//!   more). Requests of 75 bytes and up take the tail of the block; smaller
//!   ones take the head.
//! - **release**: the block is marked free and merged with free neighbors.
//!   No two adjacent blocks are ever both free afterwards.
//! - **resize**: never shrinks. It grows in place by absorbing a free
//!   successor when possible, otherwise it allocates, copies and releases.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **No trimming**: Memory is never returned to the OS
//! - **8-byte alignment**: Stronger alignments are not provided
//!
//! ## Safety
//!
//! `release` and `resize` are `unsafe`: they trust that the pointer came
//! from the same allocator and is still live. Double releases and foreign
//! pointers are not detected in release builds.

pub mod align;
mod allocator;
mod block;
mod check;
mod coalesce;
mod config;
mod error;
mod heap;
mod list;
mod source;

pub use allocator::Allocator;
pub use block::{ALIGNMENT, Block};
pub use config::Config;
pub use error::{HeapError, Result};
pub use heap::{BlockInfo, Blocks, Heap};
pub use list::FreeBlocks;
pub use source::{Arena, MemorySource, Sbrk};
