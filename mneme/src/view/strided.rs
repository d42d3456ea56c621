use mneme_error::{MnemeResult, mneme_bail, mneme_panic};

use super::iter::{Extents, Ranges, RangesMut};
use super::{DYNAMIC_STRIDE, check_extent};
use crate::displs::{Displacements, OffsetType};
use crate::storage::{Offset, Storage};

/// A view in which every element owns exactly `stride` items.
///
/// With `STRIDE` fixed at compile time the table must agree with it; with [`DYNAMIC_STRIDE`] the
/// stride is taken from the first element of the range. Element `j` of the view is the item range
/// `j * stride..(j + 1) * stride`, relative to the first item of element `from`.
pub struct StridedView<'a, S: Storage, const STRIDE: usize = DYNAMIC_STRIDE> {
    offset: Offset<'a, S>,
    len: usize,
    stride: usize,
}

impl<'a, S: Storage, const STRIDE: usize> StridedView<'a, S, STRIDE> {
    /// View the elements `from..to` of `layout` into `storage`.
    ///
    /// ## Errors
    ///
    /// * `InvalidRange` if `to <= from`.
    /// * `OutOfBounds` if the range exceeds the table, or the table exceeds the storage.
    /// * `NonUniformStride` if an element in the range does not own exactly `stride` items.
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
    /// The table indexes the whole storage, and the items of the range must lie within the
    /// handle. Handles from [`Offset::split_at_mut`] let views over disjoint ranges coexist.
    ///
    /// ## Errors
    ///
    /// As [`StridedView::try_new`], with `OutOfBounds` if the items fall outside the handle.
    pub fn try_from_offset<I: OffsetType>(
        layout: &Displacements<I>,
        offset: Offset<'a, S>,
        from: usize,
        to: usize,
    ) -> MnemeResult<Self> {
        check_extent(layout, offset.start()..offset.start() + offset.len(), from, to)?;

        let stride = if STRIDE == DYNAMIC_STRIDE {
            layout.count(from).as_()
        } else {
            STRIDE
        };
        for element in from..to {
            let count: usize = layout.count(element).as_();
            if count != stride {
                log::debug!(
                    "Rejecting strided view over elements {}..{}: element {} owns {} items, not {}",
                    from,
                    to,
                    element,
                    count,
                    stride
                );
                mneme_bail!(NonUniformStride: element, stride, count);
            }
        }

        let offset = offset.advance_to(layout[from].as_())?;
        Ok(Self {
            offset,
            len: to - from,
            stride,
        })
    }

    /// View the elements `from..to` of a storage in which every element owns `stride` items,
    /// without a displacement table.
    ///
    /// With a fixed `STRIDE` the argument is ignored.
    ///
    /// ## Errors
    ///
    /// Fails if `to <= from`, if the stride is zero or does not divide the storage length, or if
    /// the range exceeds the storage.
    pub fn with_stride(
        storage: &'a mut S,
        from: usize,
        to: usize,
        stride: usize,
    ) -> MnemeResult<Self> {
        let stride = if STRIDE == DYNAMIC_STRIDE {
            stride
        } else {
            STRIDE
        };
        if to <= from {
            mneme_bail!(InvalidRange: from, to);
        }
        if stride == 0 {
            mneme_bail!("Stride of a view without displacement table must be positive");
        }
        let len = storage.len();
        if len % stride != 0 {
            mneme_bail!("Storage of {} items is not divisible by stride {}", len, stride);
        }
        if to > len / stride {
            mneme_bail!(OutOfBounds: to, 0, len / stride);
        }

        let offset = storage.offset(from * stride)?;
        Ok(Self {
            offset,
            len: to - from,
            stride,
        })
    }

    /// The number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of items owned by every element.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The items of element `j`.
    ///
    /// ## Panics
    ///
    /// Panics if `j >= self.len()`.
    pub fn get(&self, j: usize) -> S::Range<'_> {
        self.check_element(j);
        self.offset.range(j * self.stride, (j + 1) * self.stride)
    }

    /// The items of element `j`, mutably.
    ///
    /// ## Panics
    ///
    /// Panics if `j >= self.len()`.
    pub fn get_mut(&mut self, j: usize) -> S::RangeMut<'_> {
        self.check_element(j);
        self.offset.range_mut(j * self.stride, (j + 1) * self.stride)
    }

    /// Iterate the item ranges of all elements.
    pub fn iter(&self) -> Ranges<'_, S> {
        // SAFETY: construction checked len * stride items exist after the offset.
        unsafe { Ranges::new(self.offset.as_ptr(), Extents::Strided(self.stride), self.len) }
    }

    /// Iterate the item ranges of all elements, mutably.
    pub fn iter_mut(&mut self) -> RangesMut<'_, S> {
        // SAFETY: as `iter`, and strided extents never overlap.
        unsafe { RangesMut::new(self.offset.as_ptr(), Extents::Strided(self.stride), self.len) }
    }

    pub(crate) fn offset(&self) -> &Offset<'a, S> {
        &self.offset
    }

    pub(crate) fn offset_mut(&mut self) -> &mut Offset<'a, S> {
        &mut self.offset
    }

    #[inline]
    fn check_element(&self, j: usize) {
        if j >= self.len {
            mneme_panic!(OutOfBounds: j, 0, self.len);
        }
    }
}

impl<'v, 'a, S: Storage, const STRIDE: usize> IntoIterator for &'v StridedView<'a, S, STRIDE> {
    type Item = S::Range<'v>;
    type IntoIter = Ranges<'v, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'v, 'a, S: Storage, const STRIDE: usize> IntoIterator for &'v mut StridedView<'a, S, STRIDE> {
    type Item = S::RangeMut<'v>;
    type IntoIter = RangesMut<'v, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod test {
    use mneme_buffer::Natural;
    use mneme_error::MnemeError;
    use rstest::rstest;

    use super::StridedView;
    use crate::displs::Displacements;
    use crate::storage::{Field, SingleStorage, SoaStorage, Storage};
    use crate::view::DYNAMIC_STRIDE;

    struct Dof;
    impl Field for Dof {
        type Type = usize;
        type Alloc = Natural;
    }

    struct Weight;
    impl Field for Weight {
        type Type = f32;
        type Alloc = Natural;
    }

    #[test]
    fn fixed_stride_transpose() {
        let layout = Displacements::new(&[4usize; 4]);
        let mut storage = SingleStorage::<Dof>::try_new(16).unwrap();
        {
            let mut view = StridedView::<_, 4>::try_new(&layout, &mut storage, 0, 4).unwrap();
            for k in 0..view.len() {
                for (l, item) in view.get_mut(k).iter_mut().enumerate() {
                    *item = k + 4 * l;
                }
            }
        }
        for j in 0..storage.len() {
            assert_eq!(storage[j], j / 4 + 4 * (j % 4));
        }
    }

    #[test]
    fn dynamic_stride_from_first_element() {
        let layout = Displacements::new(&[1usize, 3, 3, 3]);
        let mut storage = SingleStorage::<Dof>::try_new(10).unwrap();
        storage.as_mut_slice().copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let view = StridedView::<_, DYNAMIC_STRIDE>::try_new(&layout, &mut storage, 1, 4).unwrap();
        assert_eq!(view.stride(), 3);
        assert_eq!(view.len(), 3);
        assert_eq!(view.get(0), &[1, 2, 3]);
        assert_eq!(view.iter().last(), Some(&[7, 8, 9][..]));
    }

    #[test]
    fn non_uniform_stride() {
        let layout = Displacements::new(&[2usize, 2, 3, 2]);
        let mut storage = SingleStorage::<Dof>::try_new(9).unwrap();
        let result = StridedView::<_, 2>::try_new(&layout, &mut storage, 0, 4);
        assert!(matches!(
            result,
            Err(MnemeError::NonUniformStride(2, 2, 3, _))
        ));
        // A sub-range of uniform elements is fine.
        assert!(StridedView::<_, DYNAMIC_STRIDE>::try_new(&layout, &mut storage, 0, 2).is_ok());
    }

    #[rstest]
    #[case(2, 2)]
    #[case(3, 1)]
    fn empty_or_reversed_range(#[case] from: usize, #[case] to: usize) {
        let layout = Displacements::new(&[1usize; 4]);
        let mut storage = SingleStorage::<Dof>::try_new(4).unwrap();
        assert!(matches!(
            StridedView::<_, 1>::try_new(&layout, &mut storage, from, to),
            Err(MnemeError::InvalidRange(..))
        ));
    }

    #[test]
    fn range_beyond_table_or_storage() {
        let layout = Displacements::new(&[2usize; 4]);
        let mut storage = SingleStorage::<Dof>::try_new(6).unwrap();
        assert!(matches!(
            StridedView::<_, 2>::try_new(&layout, &mut storage, 0, 5),
            Err(MnemeError::OutOfBounds(5, 0, 4, _))
        ));
        assert!(matches!(
            StridedView::<_, 2>::try_new(&layout, &mut storage, 1, 4),
            Err(MnemeError::OutOfBounds(8, 0, 6, _))
        ));
    }

    #[test]
    fn soa_ranges() {
        let layout = Displacements::new(&[2usize; 3]);
        let mut storage = SoaStorage::<(Dof, Weight)>::try_new(6).unwrap();
        {
            let mut view = StridedView::<_, 2>::try_new(&layout, &mut storage, 1, 3).unwrap();
            for (k, (dofs, weights)) in view.iter_mut().enumerate() {
                dofs.fill(k + 1);
                weights[1] = 0.5;
            }
        }
        assert_eq!(storage.get(2), (&1, &0.0));
        assert_eq!(storage.get(5), (&2, &0.5));
        assert_eq!(storage.get(0), (&0, &0.0));
    }

    #[test]
    fn with_stride_checks_divisibility() {
        let mut storage = SingleStorage::<Dof>::try_new(10).unwrap();
        assert!(StridedView::<_, DYNAMIC_STRIDE>::with_stride(&mut storage, 0, 2, 3).is_err());
        assert!(StridedView::<_, DYNAMIC_STRIDE>::with_stride(&mut storage, 0, 2, 0).is_err());
        assert!(StridedView::<_, DYNAMIC_STRIDE>::with_stride(&mut storage, 0, 6, 2).is_err());

        let mut view = StridedView::<_, DYNAMIC_STRIDE>::with_stride(&mut storage, 3, 5, 2).unwrap();
        view.get_mut(1).fill(7);
        assert_eq!(storage.as_slice(), &[0, 0, 0, 0, 0, 0, 0, 0, 7, 7]);
    }

    #[test]
    #[should_panic]
    fn element_out_of_bounds() {
        let layout = Displacements::new(&[1usize; 3]);
        let mut storage = SingleStorage::<Dof>::try_new(3).unwrap();
        let view = StridedView::<_, 1>::try_new(&layout, &mut storage, 0, 2).unwrap();
        view.get(2);
    }
}
