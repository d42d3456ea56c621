use mneme_buffer::{Alignment, AllocStrategy, BufferMut};
use mneme_error::MnemeResult;

use super::Field;

/// A tuple of [`Field`]s stored together.
///
/// Implemented for tuples of one to six fields. Items are always handed out as tuples of
/// references, one per field, whatever the physical layout.
pub trait FieldSet: 'static {
    /// One item with every field, as stored by an array-of-structs layout.
    type Record: Copy + Default + 'static;
    /// One buffer per field, as stored by a struct-of-arrays layout.
    type Columns;
    /// One raw pointer per field.
    type Ptrs: Copy;
    /// One shared reference per field.
    type Refs<'a>;
    /// One exclusive reference per field.
    type RefsMut<'a>;
    /// One shared slice per field.
    type Slices<'a>;
    /// One exclusive slice per field.
    type SlicesMut<'a>;

    /// The alignment of a [`FieldSet::Record`] allocation: the largest field requirement.
    fn record_alignment() -> Alignment;

    /// Allocate one default-initialised buffer of `len` items per field.
    fn allocate_columns(len: usize) -> MnemeResult<Self::Columns>;

    /// One empty buffer per field.
    fn empty_columns() -> Self::Columns;

    /// Pointers to the first item of every column, valid for reads only.
    fn column_ptrs(columns: &Self::Columns) -> Self::Ptrs;

    /// Pointers to the first item of every column, valid for reads and writes.
    fn column_ptrs_mut(columns: &mut Self::Columns) -> Self::Ptrs;

    /// Split a record into references to its fields.
    fn record_refs(record: &Self::Record) -> Self::Refs<'_>;

    /// Split a record into exclusive references to its fields.
    fn record_refs_mut(record: &mut Self::Record) -> Self::RefsMut<'_>;

    /// Advance every pointer by `count` items.
    ///
    /// # Safety
    ///
    /// Every result must stay within its column.
    unsafe fn ptrs_add(ptrs: Self::Ptrs, count: usize) -> Self::Ptrs;

    /// # Safety
    ///
    /// `idx` must be in bounds of every column, and the columns must outlive `'a`.
    unsafe fn refs<'a>(ptrs: Self::Ptrs, idx: usize) -> Self::Refs<'a>;

    /// # Safety
    ///
    /// As [`FieldSet::refs`], and no other reference to the item may be alive.
    unsafe fn refs_mut<'a>(ptrs: Self::Ptrs, idx: usize) -> Self::RefsMut<'a>;

    /// # Safety
    ///
    /// `from <= to` and `to` must be in bounds of every column.
    unsafe fn slices<'a>(ptrs: Self::Ptrs, from: usize, to: usize) -> Self::Slices<'a>;

    /// # Safety
    ///
    /// As [`FieldSet::slices`], and no other reference to the items may be alive.
    unsafe fn slices_mut<'a>(ptrs: Self::Ptrs, from: usize, to: usize) -> Self::SlicesMut<'a>;
}

macro_rules! impl_field_set {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: Field),+> FieldSet for ($($name,)+) {
            type Record = ($(<$name as Field>::Type,)+);
            type Columns = ($(BufferMut<<$name as Field>::Type>,)+);
            type Ptrs = ($(*mut <$name as Field>::Type,)+);
            type Refs<'a> = ($(&'a <$name as Field>::Type,)+);
            type RefsMut<'a> = ($(&'a mut <$name as Field>::Type,)+);
            type Slices<'a> = ($(&'a [<$name as Field>::Type],)+);
            type SlicesMut<'a> = ($(&'a mut [<$name as Field>::Type],)+);

            fn record_alignment() -> Alignment {
                Alignment::of::<Self::Record>()
                    $(.max(<<$name as Field>::Alloc as AllocStrategy>::ALIGNMENT))+
            }

            fn allocate_columns(len: usize) -> MnemeResult<Self::Columns> {
                Ok(($(
                    <<$name as Field>::Alloc as AllocStrategy>::allocate_default::<
                        <$name as Field>::Type,
                    >(len)?,
                )+))
            }

            fn empty_columns() -> Self::Columns {
                ($(
                    BufferMut::<<$name as Field>::Type>::empty_aligned(
                        <<$name as Field>::Alloc as AllocStrategy>::ALIGNMENT,
                    ),
                )+)
            }

            fn column_ptrs(columns: &Self::Columns) -> Self::Ptrs {
                ($(columns.$idx.as_ptr().cast_mut(),)+)
            }

            fn column_ptrs_mut(columns: &mut Self::Columns) -> Self::Ptrs {
                ($(columns.$idx.as_mut_ptr(),)+)
            }

            fn record_refs(record: &Self::Record) -> Self::Refs<'_> {
                ($(&record.$idx,)+)
            }

            fn record_refs_mut(record: &mut Self::Record) -> Self::RefsMut<'_> {
                ($(&mut record.$idx,)+)
            }

            unsafe fn ptrs_add(ptrs: Self::Ptrs, count: usize) -> Self::Ptrs {
                // SAFETY: guaranteed by the caller.
                ($(unsafe { ptrs.$idx.add(count) },)+)
            }

            unsafe fn refs<'a>(ptrs: Self::Ptrs, idx: usize) -> Self::Refs<'a> {
                // SAFETY: guaranteed by the caller.
                ($(unsafe { &*ptrs.$idx.add(idx) },)+)
            }

            unsafe fn refs_mut<'a>(ptrs: Self::Ptrs, idx: usize) -> Self::RefsMut<'a> {
                // SAFETY: guaranteed by the caller.
                ($(unsafe { &mut *ptrs.$idx.add(idx) },)+)
            }

            unsafe fn slices<'a>(ptrs: Self::Ptrs, from: usize, to: usize) -> Self::Slices<'a> {
                // SAFETY: guaranteed by the caller.
                ($(unsafe { std::slice::from_raw_parts(ptrs.$idx.add(from), to - from) },)+)
            }

            unsafe fn slices_mut<'a>(
                ptrs: Self::Ptrs,
                from: usize,
                to: usize,
            ) -> Self::SlicesMut<'a> {
                // SAFETY: guaranteed by the caller.
                ($(unsafe { std::slice::from_raw_parts_mut(ptrs.$idx.add(from), to - from) },)+)
            }
        }
    };
}

impl_field_set!(A 0);
impl_field_set!(A 0, B 1);
impl_field_set!(A 0, B 1, C 2);
impl_field_set!(A 0, B 1, C 2, D 3);
impl_field_set!(A 0, B 1, C 2, D 3, E 4);
impl_field_set!(A 0, B 1, C 2, D 3, E 4, F 5);
