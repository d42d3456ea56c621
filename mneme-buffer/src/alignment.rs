use std::fmt::Display;
use std::ops::Deref;

/// The alignment of a buffer, in bytes.
///
/// Always a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alignment(usize);

impl Alignment {
    /// Create a new alignment.
    ///
    /// ## Panics
    ///
    /// Panics if `align` is not a power of 2. In a const context this is a compile error.
    #[inline]
    pub const fn new(align: usize) -> Self {
        assert!(align > 0, "Alignment must be greater than 0");
        assert!(align.is_power_of_two(), "Alignment must be a power of 2");
        Self(align)
    }

    /// Create an alignment of one byte, i.e. no alignment requirement at all.
    #[inline]
    pub const fn none() -> Self {
        Self::new(1)
    }

    /// Create the natural alignment of `T`.
    #[inline]
    pub const fn of<T>() -> Self {
        Self::new(align_of::<T>())
    }

    /// Check if this alignment is a multiple of `other`, i.e. anything aligned to `self` is
    /// also aligned to `other`.
    #[inline]
    pub const fn is_aligned_to(&self, other: Alignment) -> bool {
        self.0.trailing_zeros() >= other.0.trailing_zeros()
    }

    /// The larger of the two alignments.
    #[inline]
    pub const fn max(self, other: Alignment) -> Self {
        if self.0 >= other.0 { self } else { other }
    }

    /// Whether the pointer is aligned to this alignment.
    #[inline]
    pub fn is_ptr_aligned<T>(&self, ptr: *const T) -> bool {
        ptr.cast::<u8>().align_offset(self.0) == 0
    }

    /// The base-2 exponent of the alignment.
    #[inline]
    pub const fn exponent(&self) -> u32 {
        self.0.trailing_zeros()
    }
}

impl Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for Alignment {
    type Target = usize;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Alignment> for usize {
    #[inline]
    fn from(value: Alignment) -> Self {
        value.0
    }
}
