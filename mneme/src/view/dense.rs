use mneme_error::{MnemeResult, mneme_panic};

use super::StridedView;
use crate::displs::{Displacements, OffsetType};
use crate::storage::{Iter, IterMut, Offset, Storage};

/// A view in which every element owns exactly one item.
///
/// Element `j` is a single item rather than a range of length one.
pub struct DenseView<'a, S: Storage>(StridedView<'a, S, 1>);

impl<'a, S: Storage> DenseView<'a, S> {
    /// View the elements `from..to` of `layout` into `storage`.
    ///
    /// ## Errors
    ///
    /// As [`StridedView::try_new`]; every element must own exactly one item.
    pub fn try_new<I: OffsetType>(
        layout: &Displacements<I>,
        storage: &'a mut S,
        from: usize,
        to: usize,
    ) -> MnemeResult<Self> {
        StridedView::try_new(layout, storage, from, to).map(Self)
    }

    /// View the elements `from..to` of `layout` through a handle on part of a storage.
    ///
    /// ## Errors
    ///
    /// As [`StridedView::try_from_offset`].
    pub fn try_from_offset<I: OffsetType>(
        layout: &Displacements<I>,
        offset: Offset<'a, S>,
        from: usize,
        to: usize,
    ) -> MnemeResult<Self> {
        StridedView::try_from_offset(layout, offset, from, to).map(Self)
    }

    /// View the items `from..to` of `storage` directly.
    pub fn from_range(storage: &'a mut S, from: usize, to: usize) -> MnemeResult<Self> {
        StridedView::with_stride(storage, from, to, 1).map(Self)
    }

    /// The number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The item of element `j`.
    ///
    /// ## Panics
    ///
    /// Panics if `j >= self.len()`.
    pub fn get(&self, j: usize) -> S::Item<'_> {
        self.check_element(j);
        self.0.offset().get(j)
    }

    /// The item of element `j`, mutably.
    ///
    /// ## Panics
    ///
    /// Panics if `j >= self.len()`.
    pub fn get_mut(&mut self, j: usize) -> S::ItemMut<'_> {
        self.check_element(j);
        self.0.offset_mut().get_mut(j)
    }

    /// Iterate the items of all elements.
    pub fn iter(&self) -> Iter<'_, S> {
        // SAFETY: construction checked len items exist after the offset.
        unsafe { Iter::new(self.0.offset().as_ptr(), self.len()) }
    }

    /// Iterate the items of all elements, mutably.
    pub fn iter_mut(&mut self) -> IterMut<'_, S> {
        let len = self.len();
        // SAFETY: as `iter`, and the view borrows the storage exclusively.
        unsafe { IterMut::new(self.0.offset().as_ptr(), len) }
    }

    /// The items of all elements as one range.
    pub fn as_range(&self) -> S::Range<'_> {
        self.0.offset().range(0, self.len())
    }

    /// The items of all elements as one range, mutably.
    pub fn as_range_mut(&mut self) -> S::RangeMut<'_> {
        let len = self.len();
        self.0.offset_mut().range_mut(0, len)
    }

    #[inline]
    fn check_element(&self, j: usize) {
        if j >= self.len() {
            mneme_panic!(OutOfBounds: j, 0, self.len());
        }
    }
}

impl<'a, S: Storage> From<DenseView<'a, S>> for StridedView<'a, S, 1> {
    fn from(view: DenseView<'a, S>) -> Self {
        view.0
    }
}
