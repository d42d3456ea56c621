//! Physical storage of typed fields in array-of-structs or struct-of-arrays layout.
//!
//! A field is a marker type implementing [`Field`]; a [`FieldSet`] is a tuple of fields. The
//! same field set can be stored as one allocation of records ([`Aos`]) or one allocation per
//! field ([`Soa`]). Views only talk to the [`Storage`] trait, so they never know which layout is
//! in use.
//!
//! ```
//! use mneme::{AosStorage, Field, Natural, Storage};
//!
//! struct Density;
//! impl Field for Density {
//!     type Type = f64;
//!     type Alloc = Natural;
//! }
//!
//! struct Tag;
//! impl Field for Tag {
//!     type Type = u8;
//!     type Alloc = Natural;
//! }
//!
//! let mut storage = AosStorage::<(Density, Tag)>::try_new(4).unwrap();
//! let (density, tag) = storage.get_mut(2);
//! *density = 1.5;
//! *tag = 7;
//! assert_eq!(storage.get(2), (&1.5, &7));
//! ```

mod fields;
mod iter;
mod multi;
mod single;

use std::marker::PhantomData;

pub use fields::*;
pub use iter::*;
use mneme_buffer::AllocStrategy;
use mneme_error::{MnemeResult, mneme_bail, mneme_panic};
pub use multi::*;
pub use single::*;

/// A typed field of a storage.
pub trait Field: 'static {
    /// The value type stored for every item.
    type Type: Copy + Default + 'static;
    /// How the field's memory is allocated.
    type Alloc: AllocStrategy;
}

/// A fixed-size physical store of items, addressed by item index.
///
/// Element access goes through raw pointers of type [`Storage::Ptr`] so that an [`Offset`]
/// handle can address the store from any starting item without going back to index 0. The
/// unsafe accessors are the primitive operations; the safe methods check bounds first.
///
/// # Safety
///
/// The safe methods trust [`Storage::len`]: `len()` items must be readable through
/// [`Storage::as_ptr`] and writable through [`Storage::as_mut_ptr`], and items at distinct
/// indices must not overlap in memory.
pub unsafe trait Storage: Sized {
    /// A raw pointer, or a tuple of raw pointers, to the first item.
    type Ptr: Copy;
    /// Shared access to one item.
    type Item<'a>
    where
        Self: 'a;
    /// Exclusive access to one item.
    type ItemMut<'a>
    where
        Self: 'a;
    /// Shared access to a contiguous range of items.
    type Range<'a>
    where
        Self: 'a;
    /// Exclusive access to a contiguous range of items.
    type RangeMut<'a>
    where
        Self: 'a;

    /// The number of items.
    fn len(&self) -> usize;

    /// Whether the storage holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A pointer to the first item, valid for reads only.
    fn as_ptr(&self) -> Self::Ptr;

    /// A pointer to the first item, valid for reads and writes.
    fn as_mut_ptr(&mut self) -> Self::Ptr;

    /// Advance `ptr` by `count` items.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this storage type and the result must stay within its allocation.
    unsafe fn ptr_add(ptr: Self::Ptr, count: usize) -> Self::Ptr;

    /// The item at `idx`.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds of the allocation behind `ptr`, which must outlive `'a` and not be
    /// mutated while the result is alive.
    unsafe fn item<'a>(ptr: Self::Ptr, idx: usize) -> Self::Item<'a>
    where
        Self: 'a;

    /// The item at `idx`, mutably.
    ///
    /// # Safety
    ///
    /// As [`Storage::item`], and no other reference to the item may be alive.
    unsafe fn item_mut<'a>(ptr: Self::Ptr, idx: usize) -> Self::ItemMut<'a>
    where
        Self: 'a;

    /// The items `from..to`.
    ///
    /// # Safety
    ///
    /// `from <= to` and `to` must be in bounds; otherwise as [`Storage::item`].
    unsafe fn range<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::Range<'a>
    where
        Self: 'a;

    /// The items `from..to`, mutably.
    ///
    /// # Safety
    ///
    /// As [`Storage::range`], and no other reference to the items may be alive.
    unsafe fn range_mut<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::RangeMut<'a>
    where
        Self: 'a;

    /// The item at `idx`.
    ///
    /// ## Panics
    ///
    /// Panics if `idx >= self.len()`.
    fn get(&self, idx: usize) -> Self::Item<'_> {
        check_index(idx, self.len());
        // SAFETY: idx is in bounds and the result borrows self.
        unsafe { Self::item(self.as_ptr(), idx) }
    }

    /// The item at `idx`, mutably.
    ///
    /// ## Panics
    ///
    /// Panics if `idx >= self.len()`.
    fn get_mut(&mut self, idx: usize) -> Self::ItemMut<'_> {
        check_index(idx, self.len());
        // SAFETY: idx is in bounds and the result borrows self exclusively.
        unsafe { Self::item_mut(self.as_mut_ptr(), idx) }
    }

    /// A handle addressing this storage from item `from` onwards, without copying.
    fn offset(&mut self, from: usize) -> MnemeResult<Offset<'_, Self>> {
        let len = self.len();
        if from > len {
            mneme_bail!(OutOfBounds: from, 0, len);
        }
        // SAFETY: from <= len, so the pointer stays within (or one past) the allocation.
        let ptr = unsafe { Self::ptr_add(self.as_mut_ptr(), from) };
        Ok(Offset {
            ptr,
            start: from,
            len: len - from,
            _marker: PhantomData,
        })
    }

    /// Iterate all items.
    fn iter(&self) -> Iter<'_, Self> {
        // SAFETY: the iterator borrows self and stays within len.
        unsafe { Iter::new(self.as_ptr(), self.len()) }
    }

    /// Iterate all items mutably.
    fn iter_mut(&mut self) -> IterMut<'_, Self> {
        let len = self.len();
        // SAFETY: the iterator borrows self exclusively and stays within len.
        unsafe { IterMut::new(self.as_mut_ptr(), len) }
    }
}

#[inline]
fn check_index(idx: usize, len: usize) {
    if idx >= len {
        mneme_panic!(OutOfBounds: idx, 0, len);
    }
}

#[inline]
fn check_range(from: usize, to: usize, len: usize) {
    if from > to {
        mneme_panic!("Range start {} is greater than its end {}", from, to);
    }
    if to > len {
        mneme_panic!(OutOfBounds: to, 0, len);
    }
}

/// A storage advanced by a number of items.
///
/// The handle borrows the items `start()..start() + len()` of the storage exclusively for `'a`
/// and checks every access against them. [`Offset::split_at_mut`] divides the items between two
/// handles, which may then be used from different threads.
pub struct Offset<'a, S: Storage> {
    ptr: S::Ptr,
    start: usize,
    len: usize,
    _marker: PhantomData<&'a mut S>,
}

// SAFETY: the handle is an exclusive borrow of its items, like `&'a mut S`.
unsafe impl<S: Storage + Send> Send for Offset<'_, S> {}

// SAFETY: shared access to the handle only reads items, like `&&'a mut S`.
unsafe impl<S: Storage + Sync> Sync for Offset<'_, S> {}

impl<'a, S: Storage> Offset<'a, S> {
    /// The number of items addressable through the handle.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// The storage index of the first addressable item.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Whether no items are addressable through the handle.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The raw pointer to the first addressable item.
    #[inline]
    pub fn as_ptr(&self) -> S::Ptr {
        self.ptr
    }

    /// The item at `idx`, relative to the offset.
    pub fn get(&self, idx: usize) -> S::Item<'_> {
        check_index(idx, self.len);
        // SAFETY: in bounds, and the handle borrows the storage for longer than the result.
        unsafe { S::item(self.ptr, idx) }
    }

    /// The item at `idx`, relative to the offset, mutably.
    pub fn get_mut(&mut self, idx: usize) -> S::ItemMut<'_> {
        check_index(idx, self.len);
        // SAFETY: in bounds, and the result borrows the handle exclusively.
        unsafe { S::item_mut(self.ptr, idx) }
    }

    /// The items `from..to`, relative to the offset.
    pub fn range(&self, from: usize, to: usize) -> S::Range<'_> {
        check_range(from, to, self.len);
        // SAFETY: in bounds, and the handle borrows the storage for longer than the result.
        unsafe { S::range(self.ptr, from, to) }
    }

    /// The items `from..to`, relative to the offset, mutably.
    pub fn range_mut(&mut self, from: usize, to: usize) -> S::RangeMut<'_> {
        check_range(from, to, self.len);
        // SAFETY: in bounds, and the result borrows the handle exclusively.
        unsafe { S::range_mut(self.ptr, from, to) }
    }

    /// Consume the handle, returning the items `from..to` for the whole borrow of the storage.
    pub fn into_range_mut(self, from: usize, to: usize) -> S::RangeMut<'a> {
        check_range(from, to, self.len);
        // SAFETY: in bounds, and the handle's exclusive borrow moves into the result.
        unsafe { S::range_mut(self.ptr, from, to) }
    }

    /// Divide the handle into the items before `mid` and the items from `mid` on, relative to
    /// the offset.
    ///
    /// ## Panics
    ///
    /// Panics if `mid > self.len()`.
    pub fn split_at_mut(self, mid: usize) -> (Self, Self) {
        check_range(0, mid, self.len);
        // SAFETY: mid <= len, so the pointer stays within (or one past) the allocation.
        let tail = unsafe { S::ptr_add(self.ptr, mid) };
        (
            Self {
                ptr: self.ptr,
                start: self.start,
                len: mid,
                _marker: PhantomData,
            },
            Self {
                ptr: tail,
                start: self.start + mid,
                len: self.len - mid,
                _marker: PhantomData,
            },
        )
    }

    /// Advance the handle to storage index `item`, dropping the items before it.
    pub(crate) fn advance_to(self, item: usize) -> MnemeResult<Self> {
        let end = self.start + self.len;
        if item < self.start || item > end {
            mneme_bail!(OutOfBounds: item, self.start, end);
        }
        let mid = item - self.start;
        Ok(self.split_at_mut(mid).1)
    }
}

#[cfg(test)]
mod test {
    use mneme_buffer::Natural;
    use rstest::rstest;

    use super::{DataLayout, Field, MultiStorage, Storage};
    use crate::{AosStorage, SoaStorage};

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct ElasticMaterial {
        rho: f64,
        mu: f64,
        lambda: f64,
    }

    struct Material;
    impl Field for Material {
        type Type = ElasticMaterial;
        type Alloc = Natural;
    }

    struct Bc;
    impl Field for Bc {
        type Type = [i32; 4];
        type Alloc = Natural;
    }

    fn write_then_read<L: DataLayout<(Material, Bc)>>(storage: &mut MultiStorage<L, (Material, Bc)>) {
        for i in 0..storage.len() {
            let (material, bc) = storage.get_mut(i);
            let x = i as f64;
            *material = ElasticMaterial {
                rho: x,
                mu: x,
                lambda: 2.0 * x,
            };
            *bc = [i as i32; 4];
        }
        for (i, (material, bc)) in storage.iter().enumerate() {
            assert_eq!(material.lambda, 2.0 * i as f64);
            assert_eq!(bc, &[i as i32; 4]);
        }
    }

    #[test]
    fn aos_works() {
        let mut storage = AosStorage::<(Material, Bc)>::try_new(155).unwrap();
        write_then_read(&mut storage);
    }

    #[test]
    fn soa_works() {
        let mut storage = SoaStorage::<(Material, Bc)>::try_new(155).unwrap();
        write_then_read(&mut storage);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(10)]
    fn offset_addresses_from_start(#[case] from: usize) {
        let mut storage = SoaStorage::<(Material, Bc)>::try_new(10).unwrap();
        for (i, (_, bc)) in storage.iter_mut().enumerate() {
            bc[0] = i as i32;
        }
        let offset = storage.offset(from).unwrap();
        assert_eq!(offset.len(), 10 - from);
        if !offset.is_empty() {
            assert_eq!(offset.get(0).1[0], from as i32);
            let (_, bcs) = offset.range(0, offset.len());
            assert_eq!(bcs.len(), 10 - from);
        }
    }

    #[test]
    fn offset_past_end() {
        let mut storage = AosStorage::<(Material,)>::try_new(4).unwrap();
        assert!(storage.offset(5).is_err());
    }

    #[test]
    #[should_panic]
    fn get_out_of_bounds() {
        let storage = AosStorage::<(Material, Bc)>::try_new(2).unwrap();
        storage.get(2);
    }

    #[test]
    #[should_panic]
    fn offset_range_out_of_bounds() {
        let mut storage = AosStorage::<(Material, Bc)>::try_new(4).unwrap();
        let offset = storage.offset(2).unwrap();
        offset.range(1, 3);
    }

    #[test]
    fn split_handles_are_disjoint() {
        let mut storage = AosStorage::<(Material, Bc)>::try_new(6).unwrap();
        let (mut head, mut tail) = storage.offset(1).unwrap().split_at_mut(2);
        assert_eq!((head.start(), head.len()), (1, 2));
        assert_eq!((tail.start(), tail.len()), (3, 3));
        head.get_mut(1).1[0] = 1;
        tail.get_mut(0).1[0] = 2;
        assert_eq!(storage.get(2).1[0], 1);
        assert_eq!(storage.get(3).1[0], 2);
    }

    #[test]
    #[should_panic]
    fn split_past_end() {
        let mut storage = SoaStorage::<(Material,)>::try_new(2).unwrap();
        let _ = storage.offset(0).unwrap().split_at_mut(3);
    }
}
