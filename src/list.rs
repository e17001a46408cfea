//! Explicit free list.
//!
//! Links live in the payload of each free block, as heap offsets:
//!
//! ```text
//!   ┌────────┬────────┬────────┬ ─ ─ ─ ─ ┬────────┐
//!   │ header │  next  │  prev  │ (unused)│ footer │
//!   └────────┴────────┴────────┴ ─ ─ ─ ─ ┴────────┘
//! ```
//!
//! Offset 0 is the padding word at the start of the arena, so it doubles as
//! the "no link" marker. The links are garbage once the block is allocated.

use crate::{
  block::{Block, WORD},
  heap::Heap,
};

const NIL: u32 = 0;

fn encode(link: Option<Block>) -> u32 {
  link.map_or(NIL, |block| block.offset() as u32)
}

fn decode(word: u32) -> Option<Block> {
  (word != NIL).then(|| Block::at(word as usize))
}

impl<S> Heap<S> {
  pub(crate) fn list_init(&mut self) {
    self.free_head = None;
  }

  /// Inserts `block` at the head. `block` must not already be a member.
  pub(crate) fn list_prepend(
    &mut self,
    block: Block,
  ) {
    let head = self.free_head;

    self.set_link_next(block, head);
    self.set_link_prev(block, None);
    if let Some(head) = head {
      self.set_link_prev(head, Some(block));
    }

    self.free_head = Some(block);
  }

  /// Unlinks `block`. `block` must be a member.
  pub(crate) fn list_remove(
    &mut self,
    block: Block,
  ) {
    let prev = self.link_prev(block);
    let next = self.link_next(block);

    match prev {
      Some(prev) => self.set_link_next(prev, next),
      None => self.free_head = next,
    }
    if let Some(next) = next {
      self.set_link_prev(next, prev);
    }
  }

  /// Free blocks in list order, head first.
  pub fn free_blocks(&self) -> FreeBlocks<'_, S> {
    FreeBlocks {
      heap: self,
      cursor: self.free_head,
    }
  }

  pub(crate) fn link_next(
    &self,
    block: Block,
  ) -> Option<Block> {
    decode(self.read_word(block.payload()))
  }

  pub(crate) fn link_prev(
    &self,
    block: Block,
  ) -> Option<Block> {
    decode(self.read_word(block.payload() + WORD))
  }

  fn set_link_next(
    &mut self,
    block: Block,
    next: Option<Block>,
  ) {
    self.write_word(block.payload(), encode(next));
  }

  fn set_link_prev(
    &mut self,
    block: Block,
    prev: Option<Block>,
  ) {
    self.write_word(block.payload() + WORD, encode(prev));
  }
}

/// Iterator over the free list. See [`Heap::free_blocks`].
pub struct FreeBlocks<'a, S> {
  heap: &'a Heap<S>,
  cursor: Option<Block>,
}

impl<S> Iterator for FreeBlocks<'_, S> {
  type Item = Block;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.cursor?;
    self.cursor = self.heap.link_next(block);

    Some(block)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::Arena;

  /// Carves the initial free block into three free 32-byte blocks that are
  /// not yet on the list.
  fn three_blocks() -> (Heap<Arena>, [Block; 3]) {
    let mut heap = Heap::new(Arena::new(256)).unwrap();
    let first = heap.extend_heap(96).unwrap();
    heap.list_remove(first);

    heap.set_tags(first, 32, false);
    let second = heap.next(first);
    heap.set_tags(second, 32, false);
    let third = heap.next(second);
    heap.set_tags(third, 32, false);

    (heap, [first, second, third])
  }

  fn members(heap: &Heap<Arena>) -> Vec<usize> {
    heap.free_blocks().map(Block::offset).collect()
  }

  #[test]
  fn test_prepend_puts_newest_first() {
    let (mut heap, [a, b, c]) = three_blocks();

    assert!(members(&heap).is_empty());

    heap.list_prepend(a);
    heap.list_prepend(b);
    heap.list_prepend(c);

    assert_eq!(vec![c.offset(), b.offset(), a.offset()], members(&heap));
    assert_eq!(None, heap.link_prev(c));
    assert_eq!(Some(c), heap.link_prev(b));
    assert_eq!(None, heap.link_next(a));
  }

  #[test]
  fn test_remove_from_any_position() {
    let (mut heap, [a, b, c]) = three_blocks();
    heap.list_prepend(a);
    heap.list_prepend(b);
    heap.list_prepend(c);

    heap.list_remove(b);
    assert_eq!(vec![c.offset(), a.offset()], members(&heap));
    assert_eq!(Some(c), heap.link_prev(a));

    heap.list_remove(c);
    assert_eq!(vec![a.offset()], members(&heap));
    assert_eq!(None, heap.link_prev(a));

    heap.list_remove(a);
    assert!(members(&heap).is_empty());
    assert_eq!(None, heap.free_head);
  }

  #[test]
  fn test_init_forgets_members() {
    let (mut heap, [a, _, _]) = three_blocks();
    heap.list_prepend(a);

    heap.list_init();

    assert!(members(&heap).is_empty());
  }
}
