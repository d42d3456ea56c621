use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::storage::Storage;

/// Where the items of each view element start and end, relative to the view's first item.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Extents<'v> {
    Strided(usize),
    General(&'v [usize]),
}

impl Extents<'_> {
    #[inline]
    pub(crate) fn bounds(&self, element: usize) -> (usize, usize) {
        match self {
            Self::Strided(stride) => (element * stride, (element + 1) * stride),
            Self::General(displs) => (displs[element], displs[element + 1]),
        }
    }
}

/// Iterator over the per-element item ranges of a view.
pub struct Ranges<'v, S: Storage> {
    ptr: S::Ptr,
    extents: Extents<'v>,
    element: usize,
    len: usize,
    _marker: PhantomData<&'v S>,
}

// SAFETY: the iterator only reads items, like `&'v S`.
unsafe impl<S: Storage + Sync> Send for Ranges<'_, S> {}

// SAFETY: as `Send`.
unsafe impl<S: Storage + Sync> Sync for Ranges<'_, S> {}

impl<'v, S: Storage> Ranges<'v, S> {
    /// # Safety
    ///
    /// Every extent of the `len` elements must lie within the items behind `ptr`, which must stay
    /// valid and unmodified for `'v`.
    pub(crate) unsafe fn new(ptr: S::Ptr, extents: Extents<'v>, len: usize) -> Self {
        Self {
            ptr,
            extents,
            element: 0,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'v, S: Storage + 'v> Iterator for Ranges<'v, S> {
    type Item = S::Range<'v>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.element == self.len {
            return None;
        }
        let (lo, hi) = self.extents.bounds(self.element);
        self.element += 1;
        // SAFETY: upheld by the constructor.
        Some(unsafe { S::range(self.ptr, lo, hi) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.element;
        (remaining, Some(remaining))
    }
}

impl<'v, S: Storage + 'v> ExactSizeIterator for Ranges<'v, S> {}

impl<'v, S: Storage + 'v> FusedIterator for Ranges<'v, S> {}

/// Iterator over the per-element item ranges of a view, mutably.
pub struct RangesMut<'v, S: Storage> {
    ptr: S::Ptr,
    extents: Extents<'v>,
    element: usize,
    len: usize,
    _marker: PhantomData<&'v mut S>,
}

// SAFETY: the iterator is an exclusive borrow of its items, like `&'v mut S`.
unsafe impl<S: Storage + Send> Send for RangesMut<'_, S> {}

// SAFETY: shared access to the iterator reaches no item.
unsafe impl<S: Storage + Sync> Sync for RangesMut<'_, S> {}

impl<'v, S: Storage> RangesMut<'v, S> {
    /// # Safety
    ///
    /// As [`Ranges::new`], the extents must not overlap, and nothing else may access the items
    /// for `'v`.
    pub(crate) unsafe fn new(ptr: S::Ptr, extents: Extents<'v>, len: usize) -> Self {
        Self {
            ptr,
            extents,
            element: 0,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'v, S: Storage + 'v> Iterator for RangesMut<'v, S> {
    type Item = S::RangeMut<'v>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.element == self.len {
            return None;
        }
        let (lo, hi) = self.extents.bounds(self.element);
        self.element += 1;
        // SAFETY: upheld by the constructor; each element is handed out at most once.
        Some(unsafe { S::range_mut(self.ptr, lo, hi) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.element;
        (remaining, Some(remaining))
    }
}

impl<'v, S: Storage + 'v> ExactSizeIterator for RangesMut<'v, S> {}

impl<'v, S: Storage + 'v> FusedIterator for RangesMut<'v, S> {}
