//! Merging a freed block with its free neighbors.

use crate::{block::Block, heap::Heap};

impl<S> Heap<S> {
  /// Marks `block` free, merges it with whichever physical neighbors are
  /// free, and leaves exactly one free-list entry for the merged span.
  ///
  /// `block` must not be on the free list when this is called. A free
  /// predecessor keeps its list entry and absorbs `block`; a free successor
  /// loses its entry.
  pub(crate) fn free_coalesce(
    &mut self,
    block: Block,
  ) -> Block {
    let mut size = self.size_of(block);
    self.set_tags(block, size, false);

    let prev = self.prev(block);
    let next = self.next(block);

    match (self.is_allocated(prev), self.is_allocated(next)) {
      (true, true) => {
        self.list_prepend(block);
        block
      }
      (true, false) => {
        size += self.size_of(next);
        self.list_remove(next);
        self.set_tags(block, size, false);
        self.list_prepend(block);
        block
      }
      (false, true) => {
        size += self.size_of(prev);
        self.set_tags(prev, size, false);
        prev
      }
      (false, false) => {
        size += self.size_of(prev) + self.size_of(next);
        self.list_remove(next);
        self.set_tags(prev, size, false);
        prev
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{heap::BlockInfo, source::Arena};

  /// Three allocated 32-byte blocks filling the heap between the sentinels.
  fn three_allocated() -> (Heap<Arena>, [Block; 3]) {
    let mut heap = Heap::new(Arena::new(256)).unwrap();
    let first = heap.extend_heap(96).unwrap();
    heap.list_remove(first);

    heap.set_tags(first, 32, true);
    let second = heap.next(first);
    heap.set_tags(second, 32, true);
    let third = heap.next(second);
    heap.set_tags(third, 32, true);

    (heap, [first, second, third])
  }

  fn layout(heap: &Heap<Arena>) -> Vec<(usize, usize, bool)> {
    heap
      .blocks()
      .map(|BlockInfo { offset, size, allocated }| (offset, size, allocated))
      .collect()
  }

  #[test]
  fn test_both_neighbors_allocated() {
    let (mut heap, [_, b, _]) = three_allocated();

    let merged = heap.free_coalesce(b);

    assert_eq!(b, merged);
    assert_eq!(vec![(12, 32, true), (44, 32, false), (76, 32, true)], layout(&heap));
    assert_eq!(vec![b], heap.free_blocks().collect::<Vec<_>>());
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_next_free() {
    let (mut heap, [_, b, c]) = three_allocated();
    heap.free_coalesce(c);

    let merged = heap.free_coalesce(b);

    assert_eq!(b, merged);
    assert_eq!(vec![(12, 32, true), (44, 64, false)], layout(&heap));
    assert_eq!(vec![b], heap.free_blocks().collect::<Vec<_>>());
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_prev_free() {
    let (mut heap, [a, b, _]) = three_allocated();
    heap.free_coalesce(a);

    let merged = heap.free_coalesce(b);

    assert_eq!(a, merged);
    assert_eq!(vec![(12, 64, false), (76, 32, true)], layout(&heap));
    assert_eq!(vec![a], heap.free_blocks().collect::<Vec<_>>());
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_both_neighbors_free() {
    let (mut heap, [a, b, c]) = three_allocated();
    heap.free_coalesce(a);
    heap.free_coalesce(c);

    let merged = heap.free_coalesce(b);

    assert_eq!(a, merged);
    assert_eq!(vec![(12, 96, false)], layout(&heap));
    assert_eq!(vec![a], heap.free_blocks().collect::<Vec<_>>());
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_sentinels_stop_merging() {
    let (mut heap, [a, _, c]) = three_allocated();

    assert_eq!(a, heap.free_coalesce(a));
    assert_eq!(c, heap.free_coalesce(c));

    assert_eq!(vec![c, a], heap.free_blocks().collect::<Vec<_>>());
    assert_eq!(Ok(()), heap.check());
  }
}
