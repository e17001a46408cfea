//! Tunables for heap growth and placement.

use crate::{
  block::{ALIGNMENT, MIN_BLOCK_SIZE},
  error::{HeapError, Result},
};

/// Allocator configuration. The defaults reproduce the classic policy:
/// a 64-byte first extension, 512-byte growth steps, and tail placement for
/// blocks of 75 bytes and up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// Bytes added right after the sentinels are installed.
  pub initial_size: usize,
  /// Smallest extension made when no free block fits a request.
  pub chunk_size: usize,
  /// Required block sizes at or above this are carved from the tail of the
  /// chosen free block; smaller ones from its head.
  pub tail_threshold: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      initial_size: 64,
      chunk_size: 512,
      tail_threshold: 75,
    }
  }
}

impl Config {
  pub fn with_initial_size(
    mut self,
    initial_size: usize,
  ) -> Self {
    self.initial_size = initial_size;
    self
  }

  pub fn with_chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  pub fn with_tail_threshold(
    mut self,
    tail_threshold: usize,
  ) -> Self {
    self.tail_threshold = tail_threshold;
    self
  }

  pub fn validate(&self) -> Result<()> {
    for (name, value) in [("initial_size", self.initial_size), ("chunk_size", self.chunk_size)] {
      if value < MIN_BLOCK_SIZE || value % ALIGNMENT != 0 {
        return Err(HeapError::InvalidConfig(format!(
          "{name} must be a multiple of {ALIGNMENT} of at least {MIN_BLOCK_SIZE}, got {value}"
        )));
      }
    }

    Ok(())
  }
}
