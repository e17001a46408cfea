/// Rounds `value` up to the next multiple of the heap's double-word
/// alignment (8 bytes), independent of the machine word size.
///
/// # Examples
///
/// ```rust
/// use tagalloc::{ALIGNMENT, align};
///
/// assert_eq!(8, ALIGNMENT);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(17), 24);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::ALIGNMENT - 1) & !($crate::ALIGNMENT - 1)
  };
}
