use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use mneme_buffer::BufferMut;
use mneme_error::MnemeResult;

use super::{FieldSet, Storage};

/// How a [`FieldSet`] is laid out in memory.
///
/// The policy owns the allocation and the pointer arithmetic. Single items are always handed out
/// as [`FieldSet::Refs`], so code written against one layout reads the same against the other.
pub trait DataLayout<F: FieldSet>: 'static {
    /// A short name for log messages.
    const NAME: &'static str;

    /// The allocation(s) backing a storage.
    type Values;
    /// A raw pointer, or tuple of raw pointers, into [`DataLayout::Values`].
    type Ptr: Copy;
    /// Shared access to a contiguous range of items.
    type Range<'a>;
    /// Exclusive access to a contiguous range of items.
    type RangeMut<'a>;

    /// Allocate `len` default-initialised items.
    fn allocate(len: usize) -> MnemeResult<Self::Values>;

    /// An allocation holding no items.
    fn empty() -> Self::Values;

    /// A pointer to the first item, valid for reads only.
    fn as_ptr(values: &Self::Values) -> Self::Ptr;

    /// A pointer to the first item, valid for reads and writes.
    fn as_mut_ptr(values: &mut Self::Values) -> Self::Ptr;

    /// # Safety
    ///
    /// See [`Storage::ptr_add`].
    unsafe fn ptr_add(ptr: Self::Ptr, count: usize) -> Self::Ptr;

    /// # Safety
    ///
    /// See [`Storage::item`].
    unsafe fn item<'a>(ptr: Self::Ptr, idx: usize) -> F::Refs<'a>;

    /// # Safety
    ///
    /// See [`Storage::item_mut`].
    unsafe fn item_mut<'a>(ptr: Self::Ptr, idx: usize) -> F::RefsMut<'a>;

    /// # Safety
    ///
    /// See [`Storage::range`].
    unsafe fn range<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::Range<'a>;

    /// # Safety
    ///
    /// See [`Storage::range_mut`].
    unsafe fn range_mut<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::RangeMut<'a>;
}

/// Array of structs: one allocation of [`FieldSet::Record`]s.
///
/// Ranges are slices of records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Aos;

/// Struct of arrays: one allocation per field, each with its own alignment.
///
/// Ranges are tuples of per-field slices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Soa;

impl<F: FieldSet> DataLayout<F> for Aos {
    const NAME: &'static str = "AoS";

    type Values = BufferMut<F::Record>;
    type Ptr = *mut F::Record;
    type Range<'a> = &'a [F::Record];
    type RangeMut<'a> = &'a mut [F::Record];

    fn allocate(len: usize) -> MnemeResult<Self::Values> {
        BufferMut::full_aligned(Default::default(), len, F::record_alignment())
    }

    fn empty() -> Self::Values {
        BufferMut::empty_aligned(F::record_alignment())
    }

    fn as_ptr(values: &Self::Values) -> Self::Ptr {
        values.as_ptr().cast_mut()
    }

    fn as_mut_ptr(values: &mut Self::Values) -> Self::Ptr {
        values.as_mut_ptr()
    }

    unsafe fn ptr_add(ptr: Self::Ptr, count: usize) -> Self::Ptr {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr.add(count) }
    }

    unsafe fn item<'a>(ptr: Self::Ptr, idx: usize) -> F::Refs<'a> {
        // SAFETY: guaranteed by the caller.
        F::record_refs(unsafe { &*ptr.add(idx) })
    }

    unsafe fn item_mut<'a>(ptr: Self::Ptr, idx: usize) -> F::RefsMut<'a> {
        // SAFETY: guaranteed by the caller.
        F::record_refs_mut(unsafe { &mut *ptr.add(idx) })
    }

    unsafe fn range<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::Range<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(ptr.add(from), to - from) }
    }

    unsafe fn range_mut<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::RangeMut<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts_mut(ptr.add(from), to - from) }
    }
}

impl<F: FieldSet> DataLayout<F> for Soa {
    const NAME: &'static str = "SoA";

    type Values = F::Columns;
    type Ptr = F::Ptrs;
    type Range<'a> = F::Slices<'a>;
    type RangeMut<'a> = F::SlicesMut<'a>;

    fn allocate(len: usize) -> MnemeResult<Self::Values> {
        F::allocate_columns(len)
    }

    fn empty() -> Self::Values {
        F::empty_columns()
    }

    fn as_ptr(values: &Self::Values) -> Self::Ptr {
        F::column_ptrs(values)
    }

    fn as_mut_ptr(values: &mut Self::Values) -> Self::Ptr {
        F::column_ptrs_mut(values)
    }

    unsafe fn ptr_add(ptr: Self::Ptr, count: usize) -> Self::Ptr {
        // SAFETY: guaranteed by the caller.
        unsafe { F::ptrs_add(ptr, count) }
    }

    unsafe fn item<'a>(ptr: Self::Ptr, idx: usize) -> F::Refs<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { F::refs(ptr, idx) }
    }

    unsafe fn item_mut<'a>(ptr: Self::Ptr, idx: usize) -> F::RefsMut<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { F::refs_mut(ptr, idx) }
    }

    unsafe fn range<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::Range<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { F::slices(ptr, from, to) }
    }

    unsafe fn range_mut<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::RangeMut<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { F::slices_mut(ptr, from, to) }
    }
}

/// A storage of several fields in layout `L`.
///
/// The number of items is fixed at allocation. [`MultiStorage::resize`] reallocates and resets
/// every item to its default value.
pub struct MultiStorage<L: DataLayout<F>, F: FieldSet> {
    values: L::Values,
    len: usize,
    _marker: PhantomData<F>,
}

/// A [`MultiStorage`] in array-of-structs layout.
pub type AosStorage<F> = MultiStorage<Aos, F>;

/// A [`MultiStorage`] in struct-of-arrays layout.
pub type SoaStorage<F> = MultiStorage<Soa, F>;

impl<L: DataLayout<F>, F: FieldSet> MultiStorage<L, F> {
    /// Allocate `len` default-initialised items.
    pub fn try_new(len: usize) -> MnemeResult<Self> {
        log::trace!("Allocating {} storage of {} items", L::NAME, len);
        Ok(Self {
            values: L::allocate(len)?,
            len,
            _marker: PhantomData,
        })
    }

    /// A storage holding no items.
    pub fn empty() -> Self {
        Self {
            values: L::empty(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Release the memory; the storage becomes empty.
    pub fn deallocate(&mut self) {
        log::trace!("Releasing {} storage of {} items", L::NAME, self.len);
        self.values = L::empty();
        self.len = 0;
    }

    /// Reallocate for `len` default-initialised items. Previous contents are discarded.
    ///
    /// On error the storage is left empty.
    pub fn resize(&mut self, len: usize) -> MnemeResult<()> {
        self.deallocate();
        log::trace!("Resizing {} storage to {} items", L::NAME, len);
        self.values = L::allocate(len)?;
        self.len = len;
        Ok(())
    }

    /// The underlying allocation(s).
    pub fn values(&self) -> &L::Values {
        &self.values
    }
}

impl<L: DataLayout<F>, F: FieldSet> Default for MultiStorage<L, F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<L: DataLayout<F>, F: FieldSet> Debug for MultiStorage<L, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiStorage")
            .field("layout", &L::NAME)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

// SAFETY: `len` is the item count every buffer of the layout was allocated with.
unsafe impl<L: DataLayout<F>, F: FieldSet> Storage for MultiStorage<L, F> {
    type Ptr = L::Ptr;
    type Item<'a> = F::Refs<'a>;
    type ItemMut<'a> = F::RefsMut<'a>;
    type Range<'a> = L::Range<'a>;
    type RangeMut<'a> = L::RangeMut<'a>;

    fn len(&self) -> usize {
        self.len
    }

    fn as_ptr(&self) -> Self::Ptr {
        L::as_ptr(&self.values)
    }

    fn as_mut_ptr(&mut self) -> Self::Ptr {
        L::as_mut_ptr(&mut self.values)
    }

    unsafe fn ptr_add(ptr: Self::Ptr, count: usize) -> Self::Ptr {
        // SAFETY: guaranteed by the caller.
        unsafe { L::ptr_add(ptr, count) }
    }

    unsafe fn item<'a>(ptr: Self::Ptr, idx: usize) -> Self::Item<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { L::item(ptr, idx) }
    }

    unsafe fn item_mut<'a>(ptr: Self::Ptr, idx: usize) -> Self::ItemMut<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { L::item_mut(ptr, idx) }
    }

    unsafe fn range<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::Range<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { L::range(ptr, from, to) }
    }

    unsafe fn range_mut<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::RangeMut<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { L::range_mut(ptr, from, to) }
    }
}
