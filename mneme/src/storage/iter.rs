use std::iter::FusedIterator;
use std::marker::PhantomData;

use super::Storage;

/// Iterator over the items of a [`Storage`].
pub struct Iter<'a, S: Storage> {
    ptr: S::Ptr,
    idx: usize,
    len: usize,
    _marker: PhantomData<&'a S>,
}

// SAFETY: the iterator only reads items, like `&'a S`.
unsafe impl<S: Storage + Sync> Send for Iter<'_, S> {}

// SAFETY: as `Send`.
unsafe impl<S: Storage + Sync> Sync for Iter<'_, S> {}

impl<S: Storage> Iter<'_, S> {
    /// # Safety
    ///
    /// `ptr` must address `len` items that stay valid and unmodified for the iterator's lifetime.
    pub(crate) unsafe fn new(ptr: S::Ptr, len: usize) -> Self {
        Self {
            ptr,
            idx: 0,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'a, S: Storage + 'a> Iterator for Iter<'a, S> {
    type Item = S::Item<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx == self.len {
            return None;
        }
        // SAFETY: idx < len, upheld by the constructor.
        let item = unsafe { S::item(self.ptr, self.idx) };
        self.idx += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a, S: Storage + 'a> ExactSizeIterator for Iter<'a, S> {}

impl<'a, S: Storage + 'a> FusedIterator for Iter<'a, S> {}

/// Iterator over the items of a [`Storage`], mutably.
pub struct IterMut<'a, S: Storage> {
    ptr: S::Ptr,
    idx: usize,
    len: usize,
    _marker: PhantomData<&'a mut S>,
}

// SAFETY: the iterator is an exclusive borrow of its items, like `&'a mut S`.
unsafe impl<S: Storage + Send> Send for IterMut<'_, S> {}

// SAFETY: shared access to the iterator reaches no item.
unsafe impl<S: Storage + Sync> Sync for IterMut<'_, S> {}

impl<S: Storage> IterMut<'_, S> {
    /// # Safety
    ///
    /// `ptr` must address `len` items that nothing else accesses for the iterator's lifetime.
    pub(crate) unsafe fn new(ptr: S::Ptr, len: usize) -> Self {
        Self {
            ptr,
            idx: 0,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'a, S: Storage + 'a> Iterator for IterMut<'a, S> {
    type Item = S::ItemMut<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx == self.len {
            return None;
        }
        // SAFETY: idx < len, and every index is handed out at most once.
        let item = unsafe { S::item_mut(self.ptr, self.idx) };
        self.idx += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a, S: Storage + 'a> ExactSizeIterator for IterMut<'a, S> {}

impl<'a, S: Storage + 'a> FusedIterator for IterMut<'a, S> {}
