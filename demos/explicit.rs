use std::{io::Read, ptr};

use libc::sbrk;
use tagalloc::{Allocator, HeapError, Sbrk};
use tracing::Level;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `gdb`,
/// or just to watch the program break move between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

/// Prints every block between the sentinels.
fn print_heap(allocator: &Allocator<Sbrk>) {
  for block in allocator.heap().blocks() {
    println!(
      "    offset {:>6}  size {:>6}  {}",
      block.offset,
      block.size,
      if block.allocated { "allocated" } else { "free" }
    );
  }
}

fn main() -> Result<(), HeapError> {
  tracing_subscriber::fmt().with_max_level(Level::TRACE).with_target(false).init();

  print_program_break("start");
  let mut allocator = Allocator::new(Sbrk)?;
  print_program_break("after init");
  print_heap(&allocator);
  block_until_enter_pressed();

  unsafe {
    // --------------------------------------------------------------------
    // 1) Two small allocations are carved from the head of the first free
    //    block.
    // --------------------------------------------------------------------
    let first = allocator.allocate(10)?;
    ptr::write_bytes(first, 0xAB, 10);
    let second = allocator.allocate(20)?;
    second.cast::<u64>().write(0x1122334455667788);
    println!("\n[1] allocate(10) = {:?}, allocate(20) = {:?}", first, second);
    print_heap(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Releasing the first leaves a hole that the next small request
    //    reuses.
    // --------------------------------------------------------------------
    allocator.release(first);
    let third = allocator.allocate(4)?;
    println!(
      "\n[2] released first, allocate(4) = {:?} (reused: {})",
      third,
      third == first
    );
    print_heap(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) A large request grows the heap and is placed at the tail of the
    //    new free block.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");
    let big = allocator.allocate(4 * 1024)?;
    print_program_break("after large alloc");
    println!("\n[3] allocate(4096) = {:?}", big);
    print_heap(&allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Resizing `second` past its block relocates it and keeps the data.
    // --------------------------------------------------------------------
    let moved = allocator.resize(second, 200)?;
    println!(
      "\n[4] resize(second, 200) = {:?}, value = 0x{:X}",
      moved,
      moved.cast::<u64>().read()
    );
    print_heap(&allocator);

    allocator.release(big);
    allocator.release(moved);
    allocator.release(third);
  }

  allocator.heap().check()?;
  println!("\n[5] All blocks released, heap is consistent. Memory stays with the process.");
  print_heap(&allocator);

  Ok(())
}
