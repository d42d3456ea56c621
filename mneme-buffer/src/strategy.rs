use mneme_error::MnemeResult;

use crate::{Alignment, BufferMut};

/// A pluggable allocation strategy for storage fields.
///
/// The strategy fixes the minimum alignment of every buffer it allocates. Buffers are never
/// aligned below the natural alignment of their item type.
pub trait AllocStrategy: 'static {
    /// The requested alignment of each allocation.
    const ALIGNMENT: Alignment;

    /// Allocate `len` items, each initialised to `item`.
    fn allocate<T: Copy>(item: T, len: usize) -> MnemeResult<BufferMut<T>> {
        BufferMut::full_aligned(item, len, Self::ALIGNMENT)
    }

    /// Allocate `len` default-initialised items.
    fn allocate_default<T: Copy + Default>(len: usize) -> MnemeResult<BufferMut<T>> {
        Self::allocate(T::default(), len)
    }
}

/// Allocate with the natural alignment of the item type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl AllocStrategy for Natural {
    const ALIGNMENT: Alignment = Alignment::none();
}

/// Allocate aligned to `A` bytes.
///
/// `A` must be a power of two and a multiple of the pointer size. Both are checked when the
/// strategy is used, so a bad alignment fails the build:
///
/// ```compile_fail
/// use mneme_buffer::{Aligned, AllocStrategy};
///
/// let _alignment = *Aligned::<12>::ALIGNMENT;
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Aligned<const A: usize>;

impl<const A: usize> AllocStrategy for Aligned<A> {
    const ALIGNMENT: Alignment = {
        assert!(A.is_power_of_two(), "Alignment has to be a power of two");
        assert!(
            A % size_of::<*const ()>() == 0,
            "Alignment has to be a multiple of the pointer size"
        );
        Alignment::new(A)
    };
}
