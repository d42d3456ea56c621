use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use mneme_buffer::{Alignment, AllocStrategy, BufferMut};
use mneme_error::MnemeResult;

use super::{Field, Storage};

/// A storage of one field.
///
/// Items and ranges are plain references and slices of the field's value type.
pub struct SingleStorage<F: Field> {
    values: BufferMut<F::Type>,
    _marker: PhantomData<F>,
}

impl<F: Field> SingleStorage<F> {
    /// Allocate `len` default-initialised items.
    pub fn try_new(len: usize) -> MnemeResult<Self> {
        log::trace!("Allocating single-field storage of {} items", len);
        Ok(Self {
            values: F::Alloc::allocate_default(len)?,
            _marker: PhantomData,
        })
    }

    /// A storage holding no items.
    pub fn empty() -> Self {
        Self {
            values: BufferMut::empty_aligned(F::Alloc::ALIGNMENT),
            _marker: PhantomData,
        }
    }

    /// Release the memory; the storage becomes empty.
    pub fn deallocate(&mut self) {
        log::trace!("Releasing single-field storage of {} items", self.values.len());
        self.values = BufferMut::empty_aligned(F::Alloc::ALIGNMENT);
    }

    /// Reallocate for `len` default-initialised items. Previous contents are discarded.
    pub fn resize(&mut self, len: usize) -> MnemeResult<()> {
        self.deallocate();
        self.values = F::Alloc::allocate_default(len)?;
        Ok(())
    }

    /// The alignment of the allocation.
    pub fn alignment(&self) -> Alignment {
        self.values.alignment()
    }

    /// All items as a slice.
    pub fn as_slice(&self) -> &[F::Type] {
        self.values.as_slice()
    }

    /// All items as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [F::Type] {
        self.values.as_mut_slice()
    }
}

impl<F: Field> Default for SingleStorage<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Field> Debug for SingleStorage<F>
where
    F::Type: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SingleStorage").field(&self.values).finish()
    }
}

impl<F: Field> Index<usize> for SingleStorage<F> {
    type Output = F::Type;

    fn index(&self, idx: usize) -> &Self::Output {
        self.get(idx)
    }
}

impl<F: Field> IndexMut<usize> for SingleStorage<F> {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        self.get_mut(idx)
    }
}

// SAFETY: `len` is the length of the buffer behind both pointers.
unsafe impl<F: Field> Storage for SingleStorage<F> {
    type Ptr = *mut F::Type;
    type Item<'a> = &'a F::Type;
    type ItemMut<'a> = &'a mut F::Type;
    type Range<'a> = &'a [F::Type];
    type RangeMut<'a> = &'a mut [F::Type];

    fn len(&self) -> usize {
        self.values.len()
    }

    fn as_ptr(&self) -> Self::Ptr {
        self.values.as_ptr().cast_mut()
    }

    fn as_mut_ptr(&mut self) -> Self::Ptr {
        self.values.as_mut_ptr()
    }

    unsafe fn ptr_add(ptr: Self::Ptr, count: usize) -> Self::Ptr {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr.add(count) }
    }

    unsafe fn item<'a>(ptr: Self::Ptr, idx: usize) -> Self::Item<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { &*ptr.add(idx) }
    }

    unsafe fn item_mut<'a>(ptr: Self::Ptr, idx: usize) -> Self::ItemMut<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { &mut *ptr.add(idx) }
    }

    unsafe fn range<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::Range<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(ptr.add(from), to - from) }
    }

    unsafe fn range_mut<'a>(ptr: Self::Ptr, from: usize, to: usize) -> Self::RangeMut<'a>
    where
        Self: 'a,
    {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts_mut(ptr.add(from), to - from) }
    }
}

#[cfg(test)]
mod test {
    use mneme_buffer::{Aligned, Alignment, Natural};

    use super::SingleStorage;
    use crate::storage::{Field, Storage};

    struct Dof;
    impl Field for Dof {
        type Type = i32;
        type Alloc = Natural;
    }

    struct PageDof;
    impl Field for PageDof {
        type Type = f32;
        type Alloc = Aligned<4096>;
    }

    #[test]
    fn index_and_iterate() {
        let mut storage = SingleStorage::<Dof>::try_new(5).unwrap();
        for (i, dof) in storage.iter_mut().enumerate() {
            *dof = i as i32 * 10;
        }
        storage[4] += 1;
        assert_eq!(storage.as_slice(), &[0, 10, 20, 30, 41]);
        assert_eq!(storage.iter().copied().sum::<i32>(), 101);
    }

    #[test]
    fn allocation_is_aligned() {
        let mut storage = SingleStorage::<PageDof>::try_new(3).unwrap();
        assert_eq!(storage.alignment(), Alignment::new(4096));
        assert!(storage.alignment().is_ptr_aligned(storage.as_ptr().cast_const()));

        storage.resize(1000).unwrap();
        assert_eq!(storage.len(), 1000);
        assert!(Alignment::new(4096).is_ptr_aligned(storage.as_slice().as_ptr()));
    }

    #[test]
    fn offset_is_a_suffix() {
        let mut storage = SingleStorage::<Dof>::try_new(6).unwrap();
        storage.as_mut_slice().copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let mut offset = storage.offset(4).unwrap();
        assert_eq!(offset.range(0, 2), &[5, 6]);
        *offset.get_mut(1) = 0;
        assert_eq!(storage.as_slice(), &[1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn deallocate_keeps_alignment() {
        let mut storage = SingleStorage::<PageDof>::try_new(3).unwrap();
        storage.deallocate();
        assert!(storage.is_empty());
        assert_eq!(storage.alignment(), Alignment::new(4096));
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds() {
        let storage = SingleStorage::<Dof>::try_new(2).unwrap();
        let _ = storage[2];
    }
}
