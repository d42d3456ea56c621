use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use bytes::BytesMut;
use mneme_error::{MnemeResult, mneme_err};

use crate::debug::TruncatedDebug;
use crate::{Alignment, AlignedBytesMut};

/// A fixed-length, mutable buffer of items of `T` with a guaranteed alignment.
///
/// The length is chosen at allocation time and never changes; storage that needs a different
/// size allocates a new buffer. Items are `Copy`, so dropping the buffer only releases memory.
///
/// The items live in the spare capacity of the underlying [`BytesMut`], whose own length stays
/// zero. Padding bytes inside `T` are therefore never claimed as initialised `u8`s, and items are
/// only reached through the pointer taken at allocation.
pub struct BufferMut<T> {
    bytes: BytesMut,
    ptr: NonNull<T>,
    length: usize,
    alignment: Alignment,
}

// SAFETY: the buffer owns its items, like `Vec<T>`.
unsafe impl<T: Send> Send for BufferMut<T> {}

// SAFETY: shared access only reads items, like `Vec<T>`.
unsafe impl<T: Sync> Sync for BufferMut<T> {}

impl<T: Copy> BufferMut<T> {
    /// Allocate `len` copies of `item` with the natural alignment of `T`.
    pub fn full(item: T, len: usize) -> MnemeResult<Self> {
        Self::full_aligned(item, len, Alignment::of::<T>())
    }

    /// Allocate `len` copies of `item` aligned to at least `alignment`.
    ///
    /// The resulting alignment is the larger of `alignment` and the natural alignment of `T`.
    ///
    /// ## Errors
    ///
    /// Returns an `OutOfMemory` error if the requested size cannot be represented.
    pub fn full_aligned(item: T, len: usize, alignment: Alignment) -> MnemeResult<Self> {
        let alignment = alignment.max(Alignment::of::<T>());
        let nbytes = len
            .checked_mul(size_of::<T>())
            .filter(|n| {
                n.checked_add(*alignment)
                    .is_some_and(|capacity| capacity <= isize::MAX as usize)
            })
            .ok_or_else(|| {
                mneme_err!(
                    OutOfMemory: "Cannot allocate {} items of {} bytes aligned to {}",
                    len,
                    size_of::<T>(),
                    alignment
                )
            })?;

        let mut bytes = BytesMut::with_capacity(nbytes + *alignment);
        bytes.align_empty(alignment);

        let ptr = NonNull::from(bytes.spare_capacity_mut()).cast::<T>();
        for i in 0..len {
            // SAFETY: `ptr` is aligned to `alignment`, which is at least the alignment of `T`, and
            // the spare capacity holds at least `nbytes` bytes.
            unsafe { ptr.add(i).write(item) };
        }

        log::trace!(
            "Allocated {} items ({} bytes) aligned to {}",
            len,
            nbytes,
            alignment
        );

        Ok(Self {
            bytes,
            ptr,
            length: len,
            alignment,
        })
    }

    /// Create a new empty buffer with the natural alignment of `T`.
    pub fn empty() -> Self {
        Self::empty_aligned(Alignment::of::<T>())
    }

    /// Create a new empty buffer with the provided alignment.
    pub fn empty_aligned(alignment: Alignment) -> Self {
        let alignment = alignment.max(Alignment::of::<T>());
        let mut bytes = BytesMut::with_capacity(*alignment);
        bytes.align_empty(alignment);
        let ptr = NonNull::from(bytes.spare_capacity_mut()).cast::<T>();
        Self {
            bytes,
            ptr,
            length: 0,
            alignment,
        }
    }

    /// Overwrite every item with `item`.
    pub fn fill(&mut self, item: T) {
        self.as_mut_slice().fill(item);
    }
}

impl<T> BufferMut<T> {
    /// Returns the length of the buffer in items of type T.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns whether the buffer is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the alignment of the buffer.
    #[inline(always)]
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// A raw pointer to the first item.
    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr().cast_const()
    }

    /// A raw mutable pointer to the first item.
    ///
    /// The pointer stays valid until the buffer is dropped; the allocation never moves.
    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns a slice over the buffer of items of type T.
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: alignment and length are established on construction.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.length) }
    }

    /// Returns a mutable slice over the buffer of items of type T.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: alignment and length are established on construction.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.length) }
    }
}

impl<T: Debug> Debug for BufferMut<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferMut")
            .field("length", &self.length)
            .field("alignment", &self.alignment)
            .field("capacity_bytes", &self.bytes.capacity())
            .field("values", &TruncatedDebug(self.as_slice()))
            .finish()
    }
}

impl<T> Deref for BufferMut<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for BufferMut<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T> AsRef<[T]> for BufferMut<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> AsMut<[T]> for BufferMut<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

#[cfg(test)]
mod test {
    use mneme_error::MnemeError;

    use crate::{Alignment, BufferMut};

    #[test]
    fn full_and_write() {
        let mut buf = BufferMut::full(0u32, 5).unwrap();
        buf[2] = 7;
        buf.as_mut_slice()[4] = 9;
        assert_eq!(buf.as_slice(), &[0, 0, 7, 0, 9]);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn alignment_never_below_item() {
        let buf = BufferMut::full(0u64, 3).unwrap();
        assert_eq!(buf.alignment(), Alignment::of::<u64>());
        let buf = BufferMut::full_aligned(0u64, 3, Alignment::none()).unwrap();
        assert_eq!(buf.alignment(), Alignment::of::<u64>());
    }

    #[test]
    fn empty_is_aligned() {
        let buf = BufferMut::<u8>::empty_aligned(Alignment::new(4096));
        assert!(buf.is_empty());
        assert!(buf.alignment().is_ptr_aligned(buf.as_ptr()));
    }

    #[test]
    fn oversized_allocation_fails() {
        let err = BufferMut::full(0u64, usize::MAX / 2).err();
        assert!(matches!(err, Some(MnemeError::OutOfMemory(..))));
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Padded {
        flag: u8,
        value: u64,
    }

    #[test]
    fn padded_items_stay_out_of_bytes() {
        let item = Padded { flag: 1, value: 2 };
        let mut buf = BufferMut::full(item, 4).unwrap();
        assert!(buf.bytes.is_empty());
        assert!(buf.bytes.capacity() >= 4 * size_of::<Padded>());
        buf[3].value = 7;
        assert_eq!(buf[0], item);
        assert_eq!(buf[3], Padded { flag: 1, value: 7 });
        assert!(buf.alignment().is_ptr_aligned(buf.as_ptr()));
    }

    #[test]
    fn buffers_move_between_threads() {
        let mut buf = BufferMut::full(0u32, 8).unwrap();
        let buf = std::thread::spawn(move || {
            buf.fill(3);
            buf
        })
        .join()
        .unwrap();
        assert_eq!(buf.as_slice(), &[3; 8]);
    }

    #[test]
    fn fill_overwrites() {
        let mut buf = BufferMut::full([1i32; 4], 3).unwrap();
        buf.fill([2; 4]);
        assert!(buf.iter().all(|v| *v == [2; 4]));
    }
}
