use mneme_error::{MnemeResult, mneme_panic};

use super::check_extent;
use super::iter::{Extents, Ranges, RangesMut};
use crate::displs::{Displacements, OffsetType};
use crate::storage::{Offset, Storage};

/// A view in which elements own arbitrary numbers of items.
///
/// The view keeps its own copy of the table slice `layout[from..=to]`, rebased to start at zero,
/// so the table it was built from may change or be dropped afterwards.
pub struct GeneralView<'a, S: Storage> {
    offset: Offset<'a, S>,
    displs: Vec<usize>,
}

impl<'a, S: Storage> GeneralView<'a, S> {
    /// View the elements `from..to` of `layout` into `storage`.
    ///
    /// ## Errors
    ///
    /// * `InvalidRange` if `to <= from`.
    /// * `OutOfBounds` if the range exceeds the table, or the table exceeds the storage.
    pub fn try_new<I: OffsetType>(
        layout: &Displacements<I>,
        storage: &'a mut S,
        from: usize,
        to: usize,
    ) -> MnemeResult<Self> {
        Self::try_from_offset(layout, storage.offset(0)?, from, to)
    }

    /// View the elements `from..to` of `layout` through a handle on part of a storage.
    ///
    /// ## Errors
    ///
    /// As [`GeneralView::try_new`], with `OutOfBounds` if the items fall outside the handle.
    pub fn try_from_offset<I: OffsetType>(
        layout: &Displacements<I>,
        offset: Offset<'a, S>,
        from: usize,
        to: usize,
    ) -> MnemeResult<Self> {
        check_extent(layout, offset.start()..offset.start() + offset.len(), from, to)?;

        let base: usize = layout[from].as_();
        let displs = layout.as_slice()[from..=to]
            .iter()
            .map(|d| d.as_() - base)
            .collect();
        let offset = offset.advance_to(base)?;
        Ok(Self { offset, displs })
    }

    /// The number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.displs.len() - 1
    }

    /// Whether the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of items owned by element `j`.
    pub fn count(&self, j: usize) -> usize {
        self.check_element(j);
        self.displs[j + 1] - self.displs[j]
    }

    /// The rebased table: element `j` owns items `displs()[j]..displs()[j + 1]` of the view.
    pub fn displs(&self) -> &[usize] {
        &self.displs
    }

    /// The items of element `j`.
    ///
    /// ## Panics
    ///
    /// Panics if `j >= self.len()`.
    pub fn get(&self, j: usize) -> S::Range<'_> {
        self.check_element(j);
        self.offset.range(self.displs[j], self.displs[j + 1])
    }

    /// The items of element `j`, mutably.
    ///
    /// ## Panics
    ///
    /// Panics if `j >= self.len()`.
    pub fn get_mut(&mut self, j: usize) -> S::RangeMut<'_> {
        self.check_element(j);
        self.offset.range_mut(self.displs[j], self.displs[j + 1])
    }

    /// Iterate the item ranges of all elements.
    pub fn iter(&self) -> Ranges<'_, S> {
        // SAFETY: the rebased table is non-decreasing and ends within the offset.
        unsafe { Ranges::new(self.offset.as_ptr(), Extents::General(&self.displs), self.len()) }
    }

    /// Iterate the item ranges of all elements, mutably.
    pub fn iter_mut(&mut self) -> RangesMut<'_, S> {
        let len = self.len();
        // SAFETY: as `iter`, and consecutive extents never overlap.
        unsafe { RangesMut::new(self.offset.as_ptr(), Extents::General(&self.displs), len) }
    }

    #[inline]
    fn check_element(&self, j: usize) {
        if j >= self.len() {
            mneme_panic!(OutOfBounds: j, 0, self.len());
        }
    }
}

impl<'v, 'a, S: Storage> IntoIterator for &'v GeneralView<'a, S> {
    type Item = S::Range<'v>;
    type IntoIter = Ranges<'v, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'v, 'a, S: Storage> IntoIterator for &'v mut GeneralView<'a, S> {
    type Item = S::RangeMut<'v>;
    type IntoIter = RangesMut<'v, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use mneme_buffer::Natural;
    use mneme_error::MnemeError;

    use super::GeneralView;
    use crate::displs::Displacements;
    use crate::storage::{Field, SingleStorage, SoaStorage, Storage};

    struct Dof;
    impl Field for Dof {
        type Type = i64;
        type Alloc = Natural;
    }

    struct Mask;
    impl Field for Mask {
        type Type = u8;
        type Alloc = Natural;
    }

    #[test]
    fn variable_counts() {
        let layout = Displacements::new(&[0i32, 4, 0, 0, 1, 0, 2, 0]);
        let mut storage = SingleStorage::<Dof>::try_new(7).unwrap();
        storage.as_mut_slice().copy_from_slice(&[10, 11, 12, 13, 14, 15, 16]);

        let view = GeneralView::try_new(&layout, &mut storage, 1, 7).unwrap();
        assert_eq!(view.len(), 6);
        assert_eq!(view.displs(), &[0, 4, 4, 4, 5, 5, 7]);
        assert_eq!(view.count(0), 4);
        assert_eq!(view.get(0), &[10, 11, 12, 13]);
        assert!(view.get(1).is_empty());
        assert_eq!(
            view.iter().map(<[i64]>::len).collect_vec(),
            vec![4, 0, 0, 1, 0, 2]
        );
    }

    #[test]
    fn rebased_on_from() {
        let layout = Displacements::new(&[2usize, 1, 3]);
        let mut storage = SoaStorage::<(Dof, Mask)>::try_new(6).unwrap();
        {
            let mut view = GeneralView::try_new(&layout, &mut storage, 1, 3).unwrap();
            assert_eq!(view.displs(), &[0, 1, 4]);
            for (j, (dofs, masks)) in view.iter_mut().enumerate() {
                dofs.fill(j as i64 + 1);
                masks.fill(1);
            }
            let (dofs, _) = view.get_mut(1);
            dofs[2] = -1;
        }
        let (dofs, masks) = storage.values();
        assert_eq!(dofs.as_slice(), &[0, 0, 1, 2, 2, -1]);
        assert_eq!(masks.as_slice(), &[0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn outlives_table() {
        let mut storage = SingleStorage::<Dof>::try_new(3).unwrap();
        let view = {
            let layout = Displacements::new(&[1usize, 2]);
            GeneralView::try_new(&layout, &mut storage, 0, 2).unwrap()
        };
        assert_eq!(view.count(1), 2);
    }

    #[test]
    fn invalid_extent() {
        let layout = Displacements::new(&[1usize, 2]);
        let mut storage = SingleStorage::<Dof>::try_new(2).unwrap();
        assert!(matches!(
            GeneralView::try_new(&layout, &mut storage, 1, 1),
            Err(MnemeError::InvalidRange(1, 1, _))
        ));
        assert!(matches!(
            GeneralView::try_new(&layout, &mut storage, 0, 2),
            Err(MnemeError::OutOfBounds(3, 0, 2, _))
        ));
    }

    #[test]
    fn mutable_for_loop() {
        let layout = Displacements::new(&[2usize, 0, 1]);
        let mut storage = SingleStorage::<Dof>::try_new(3).unwrap();
        let mut view = GeneralView::try_new(&layout, &mut storage, 0, 3).unwrap();
        for items in &mut view {
            let count = items.len() as i64;
            items.fill(count);
        }
        assert_eq!(storage.as_slice(), &[2, 2, 1]);
    }

    #[test]
    fn views_over_split_handles() {
        let layout = Displacements::new(&[2usize, 1, 3]);
        let mut storage = SingleStorage::<Dof>::try_new(6).unwrap();
        {
            let (head, tail) = storage.offset(0).unwrap().split_at_mut(3);
            let mut first = GeneralView::try_from_offset(&layout, head, 0, 2).unwrap();
            let mut last = GeneralView::try_from_offset(&layout, tail, 2, 3).unwrap();
            first.get_mut(1)[0] = 1;
            last.get_mut(0).fill(2);
        }
        assert_eq!(storage.as_slice(), &[0, 0, 1, 2, 2, 2]);

        let (head, _) = storage.offset(0).unwrap().split_at_mut(3);
        assert!(matches!(
            GeneralView::try_from_offset(&layout, head, 1, 3),
            Err(MnemeError::OutOfBounds(6, 0, 3, _))
        ));
        let (_, tail) = storage.offset(0).unwrap().split_at_mut(3);
        assert!(matches!(
            GeneralView::try_from_offset(&layout, tail, 0, 3),
            Err(MnemeError::OutOfBounds(0, 3, 6, _))
        ));
    }
}
