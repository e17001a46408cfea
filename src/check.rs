//! Heap consistency checker.

use crate::{
  block::{ALIGNMENT, Block, MIN_BLOCK_SIZE, OVERHEAD, Tag},
  error::{HeapError, Result},
  heap::Heap,
};

impl<S> Heap<S> {
  /// Walks the heap and the free list and reports the first broken
  /// invariant:
  ///
  /// - prologue and epilogue are intact and the epilogue ends the heap,
  /// - every block's header and footer agree,
  /// - every block size is a multiple of 8 and at least 16,
  /// - no two physically adjacent blocks are both free,
  /// - the free list holds exactly the free blocks, with matching back links.
  pub fn check(&self) -> Result<()> {
    let prologue = self.prologue();
    let sentinel = Tag::new(OVERHEAD, true);
    if self.tag(prologue) != sentinel || self.footer_tag(prologue) != sentinel {
      return Err(HeapError::BadSentinel("prologue"));
    }

    let free = self.check_blocks()?;
    self.check_free_list(&free)
  }

  /// Returns the free blocks in address order.
  fn check_blocks(&self) -> Result<Vec<Block>> {
    let epilogue = self.epilogue();
    let mut free = Vec::new();
    let mut previous_free: Option<Block> = None;
    let mut cursor = self.next(self.prologue());

    loop {
      let tag = self.tag(cursor);
      if tag.size == 0 {
        break;
      }

      let offset = cursor.offset();
      if tag.size % ALIGNMENT != 0 || tag.size < MIN_BLOCK_SIZE || offset + tag.size > epilogue.offset() {
        return Err(HeapError::BadBlockSize { offset, size: tag.size });
      }
      if self.footer_tag(cursor) != tag {
        return Err(HeapError::TagMismatch { offset });
      }

      if tag.allocated {
        previous_free = None;
      } else {
        if let Some(previous) = previous_free {
          return Err(HeapError::AdjacentFree {
            first: previous.offset(),
            second: offset,
          });
        }
        free.push(cursor);
        previous_free = Some(cursor);
      }

      cursor = Block::at(offset + tag.size);
    }

    if cursor != epilogue || !self.is_allocated(cursor) {
      return Err(HeapError::BadSentinel("epilogue"));
    }

    Ok(free)
  }

  fn check_free_list(
    &self,
    free: &[Block],
  ) -> Result<()> {
    let mut in_list = 0;
    let mut expected_prev = None;
    let mut cursor = self.free_head;

    while let Some(block) = cursor {
      in_list += 1;
      if in_list > free.len() {
        return Err(HeapError::FreeListMismatch {
          in_list,
          in_heap: free.len(),
        });
      }

      // Only follow links out of blocks known to be free heap members.
      if free.binary_search(&block).is_err() || self.link_prev(block) != expected_prev {
        return Err(HeapError::FreeListLink {
          offset: block.offset(),
        });
      }

      expected_prev = Some(block);
      cursor = self.link_next(block);
    }

    if in_list != free.len() {
      return Err(HeapError::FreeListMismatch {
        in_list,
        in_heap: free.len(),
      });
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::Arena;

  fn heap_with_two_blocks() -> (Heap<Arena>, Block, Block) {
    let mut heap = Heap::new(Arena::new(256)).unwrap();
    let first = heap.extend_heap(64).unwrap();
    heap.list_remove(first);
    heap.set_tags(first, 32, true);
    let second = heap.next(first);
    heap.set_tags(second, 32, true);

    (heap, first, second)
  }

  #[test]
  fn test_consistent_heap_passes() {
    let (mut heap, first, _) = heap_with_two_blocks();

    assert_eq!(Ok(()), heap.check());
    heap.free_coalesce(first);
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_detects_tag_mismatch() {
    let (mut heap, first, _) = heap_with_two_blocks();

    heap.set_footer(first, 32, false);

    assert_eq!(Err(HeapError::TagMismatch { offset: 12 }), heap.check());
  }

  #[test]
  fn test_detects_uncoalesced_neighbors() {
    let (mut heap, first, second) = heap_with_two_blocks();

    heap.set_tags(first, 32, false);
    heap.list_prepend(first);
    heap.set_tags(second, 32, false);
    heap.list_prepend(second);

    assert_eq!(Err(HeapError::AdjacentFree { first: 12, second: 44 }), heap.check());
  }

  #[test]
  fn test_detects_free_block_missing_from_list() {
    let (mut heap, first, _) = heap_with_two_blocks();

    heap.set_tags(first, 32, false);

    assert_eq!(Err(HeapError::FreeListMismatch { in_list: 0, in_heap: 1 }), heap.check());
  }

  #[test]
  fn test_detects_allocated_block_on_list() {
    let (mut heap, first, _) = heap_with_two_blocks();

    heap.list_prepend(first);

    assert_eq!(Err(HeapError::FreeListMismatch { in_list: 1, in_heap: 0 }), heap.check());
  }

  #[test]
  fn test_detects_broken_sentinels() {
    let (mut heap, first, _) = heap_with_two_blocks();

    heap.set_header(heap.prologue(), 8, false);
    assert_eq!(Err(HeapError::BadSentinel("prologue")), heap.check());

    heap.set_tags(heap.prologue(), 8, true);
    heap.set_tags(first, 24, true);
    assert!(heap.check().is_err());
  }
}
