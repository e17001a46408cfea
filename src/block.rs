//! Boundary-tag encoding.
//!
//! ```text
//!   Block layout (offsets relative to the header word):
//!
//!   ┌──────────┬─────────────────────────────────────┬──────────┐
//!   │  header  │   payload (free: next | prev links) │  footer  │
//!   │ size | a │                                     │ size | a │
//!   └──────────┴─────────────────────────────────────┴──────────┘
//!   0          4                                  size-4     size
//! ```
//!
//! Both tags hold the same word: the block size (a multiple of 8) with the
//! allocated flag packed into bit 0.

use crate::heap::Heap;

/// Width of a header or footer tag.
pub const WORD: usize = 4;

/// Bytes of every block spent on its header and footer.
pub const OVERHEAD: usize = 2 * WORD;

/// Alignment of block sizes and payload addresses.
pub const ALIGNMENT: usize = 8;

/// Smallest block that can hold both tags and both free-list links.
pub const MIN_BLOCK_SIZE: usize = 16;

const ALLOCATED: u32 = 0x1;
const SIZE_MASK: u32 = !(ALIGNMENT as u32 - 1);

/// Decoded contents of a header or footer word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
  pub size: usize,
  pub allocated: bool,
}

impl Tag {
  pub const fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self { size, allocated }
  }

  pub fn encode(self) -> u32 {
    debug_assert_eq!(self.size % ALIGNMENT, 0, "unaligned block size {}", self.size);
    debug_assert!(self.size <= SIZE_MASK as usize, "block size {} overflows a tag", self.size);
    self.size as u32 | if self.allocated { ALLOCATED } else { 0 }
  }

  pub const fn decode(word: u32) -> Self {
    Self {
      size: (word & SIZE_MASK) as usize,
      allocated: word & ALLOCATED != 0,
    }
  }
}

/// A block on the heap, identified by the offset of its header word from the
/// start of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(usize);

impl Block {
  pub(crate) const fn at(offset: usize) -> Self {
    Self(offset)
  }

  /// Offset of the header word.
  pub const fn offset(self) -> usize {
    self.0
  }

  /// Offset of the first payload byte.
  pub const fn payload(self) -> usize {
    self.0 + WORD
  }

  /// Offset of the footer word for a block spanning `size` bytes.
  pub const fn footer(
    self,
    size: usize,
  ) -> usize {
    self.0 + size - WORD
  }

  pub(crate) const fn from_payload(payload: usize) -> Self {
    Self(payload - WORD)
  }
}

// Structural accessors. None of these validate that `block` is a real heap
// member; the word accessors only keep reads and writes inside the arena.
impl<S> Heap<S> {
  pub(crate) fn tag(
    &self,
    block: Block,
  ) -> Tag {
    Tag::decode(self.read_word(block.offset()))
  }

  pub(crate) fn footer_tag(
    &self,
    block: Block,
  ) -> Tag {
    Tag::decode(self.read_word(block.footer(self.size_of(block))))
  }

  pub fn size_of(
    &self,
    block: Block,
  ) -> usize {
    self.tag(block).size
  }

  pub fn is_allocated(
    &self,
    block: Block,
  ) -> bool {
    self.tag(block).allocated
  }

  pub(crate) fn set_header(
    &mut self,
    block: Block,
    size: usize,
    allocated: bool,
  ) {
    self.write_word(block.offset(), Tag::new(size, allocated).encode());
  }

  pub(crate) fn set_footer(
    &mut self,
    block: Block,
    size: usize,
    allocated: bool,
  ) {
    self.write_word(block.footer(size), Tag::new(size, allocated).encode());
  }

  /// Writes identical header and footer tags over `size` bytes from `block`.
  pub(crate) fn set_tags(
    &mut self,
    block: Block,
    size: usize,
    allocated: bool,
  ) {
    self.set_header(block, size, allocated);
    self.set_footer(block, size, allocated);
  }

  /// The block physically after `block`. Must not be called on the epilogue.
  pub(crate) fn next(
    &self,
    block: Block,
  ) -> Block {
    Block::at(block.offset() + self.size_of(block))
  }

  /// The block physically before `block`, found through the preceding
  /// footer. Must not be called on the prologue.
  pub(crate) fn prev(
    &self,
    block: Block,
  ) -> Block {
    let size = Tag::decode(self.read_word(block.offset() - WORD)).size;
    Block::at(block.offset() - size)
  }
}
