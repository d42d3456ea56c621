//! Prefix-sum displacement tables.
//!
//! Assume ids `i = 0..N`, each owning `n_i` items stored contiguously in one array `A`. With
//! `d = Displacements::new(&[n_0, ..., n_{N-1}])`, `A[d[i]]` is the first item of id `i` and
//! `A[d[i + 1] - 1]` its last. `d[N]` is the total number of items, so `n_i = d[i + 1] - d[i]`.
//!
//! The raw table (`N + 1` non-decreasing offsets starting at zero) is also the displacement array
//! an irregular all-to-all exchange expects, see [`Displacements::as_slice`].

use std::fmt::{Debug, Display};
use std::iter::FusedIterator;
use std::ops::Index;

use itertools::Itertools;
use mneme_error::{MnemeError, MnemeExpect, MnemeResult, mneme_bail, mneme_panic};
use num_traits::{AsPrimitive, PrimInt};

/// Integer types usable as displacement offsets.
pub trait OffsetType: PrimInt + AsPrimitive<usize> + Debug + Display + Send + Sync + 'static {}

impl<T> OffsetType for T where
    T: PrimInt + AsPrimitive<usize> + Debug + Display + Send + Sync + 'static
{
}

/// A prefix-sum table over per-element item counts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(
        try_from = "Vec<I>",
        into = "Vec<I>",
        bound(
            serialize = "I: OffsetType + serde::Serialize",
            deserialize = "I: OffsetType + serde::Deserialize<'de>"
        )
    )
)]
pub struct Displacements<I = usize> {
    displs: Vec<I>,
}

impl<I: OffsetType> Displacements<I> {
    /// Build the table from per-element counts.
    pub fn new(counts: &[I]) -> Self {
        let mut displs = Self::default();
        displs.make(counts);
        displs
    }

    /// Rebuild the table from per-element counts, discarding the previous contents.
    ///
    /// ## Panics
    ///
    /// Panics if a count is negative or the total overflows `I`.
    pub fn make(&mut self, counts: &[I]) {
        self.displs.clear();
        self.displs.reserve(counts.len() + 1);
        self.displs.push(I::zero());

        let mut total = I::zero();
        for (element, &count) in counts.iter().enumerate() {
            if count < I::zero() {
                mneme_panic!("Negative count {} for element {}", count, element);
            }
            total = total
                .checked_add(&count)
                .mneme_expect("Displacement table overflows its offset type");
            self.displs.push(total);
        }
    }

    /// The number of elements `N`.
    #[inline]
    pub fn len(&self) -> usize {
        self.displs.len() - 1
    }

    /// Whether the table describes no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of items owned by `element`.
    ///
    /// ## Panics
    ///
    /// Panics if `element >= self.len()`.
    #[inline]
    pub fn count(&self, element: usize) -> I {
        if element >= self.len() {
            mneme_panic!(OutOfBounds: element, 0, self.len());
        }
        self.displs[element + 1] - self.displs[element]
    }

    /// The total number of items, `d[N]`.
    #[inline]
    pub fn total(&self) -> I {
        self.displs[self.len()]
    }

    /// The raw offsets `d[0..=N]`.
    #[inline]
    pub fn as_slice(&self) -> &[I] {
        &self.displs
    }

    /// Iterate the per-element counts.
    pub fn counts(&self) -> impl ExactSizeIterator<Item = I> + '_ {
        self.displs.windows(2).map(|w| w[1] - w[0])
    }

    /// Iterate every `(element, item)` pair in element-major, item-ascending order.
    ///
    /// Replaces the nested loop
    /// `for element in 0..N { for item in d[element]..d[element + 1] { .. } }`.
    pub fn iter(&self) -> DisplacementsIter<'_, I> {
        DisplacementsIter {
            displs: &self.displs,
            element: 0,
            item: self.displs[0].as_(),
            end: self.total().as_(),
        }
    }

    /// Exchange the contents of two tables.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.displs, &mut other.displs);
    }
}

impl<I: OffsetType> Default for Displacements<I> {
    fn default() -> Self {
        Self {
            displs: vec![I::zero()],
        }
    }
}

impl<I: OffsetType> Index<usize> for Displacements<I> {
    type Output = I;

    /// `d[element]` for `element` in `0..=N`.
    fn index(&self, element: usize) -> &Self::Output {
        self.displs
            .get(element)
            .unwrap_or_else(|| mneme_panic!(OutOfBounds: element, 0, self.len() + 1))
    }
}

impl<I: OffsetType> FromIterator<I> for Displacements<I> {
    fn from_iter<T: IntoIterator<Item = I>>(counts: T) -> Self {
        Self::new(&counts.into_iter().collect::<Vec<_>>())
    }
}

/// Validates a raw table, e.g. one received from a peer.
impl<I: OffsetType> TryFrom<Vec<I>> for Displacements<I> {
    type Error = MnemeError;

    fn try_from(displs: Vec<I>) -> MnemeResult<Self> {
        match displs.first() {
            None => mneme_bail!("Displacement table needs at least one offset"),
            Some(first) if !first.is_zero() => {
                mneme_bail!("Displacement table must start at 0, got {}", first)
            }
            Some(_) => {}
        }
        if let Some((element, (lo, hi))) = displs
            .iter()
            .tuple_windows()
            .find_position(|(lo, hi)| hi < lo)
        {
            mneme_bail!(
                "Displacement table decreases at element {}: {} > {}",
                element,
                lo,
                hi
            );
        }
        Ok(Self { displs })
    }
}

impl<I> From<Displacements<I>> for Vec<I> {
    fn from(value: Displacements<I>) -> Self {
        value.displs
    }
}

impl<'a, I: OffsetType> IntoIterator for &'a Displacements<I> {
    type Item = (usize, usize);
    type IntoIter = DisplacementsIter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the `(element, item)` pairs of a [`Displacements`] table.
#[derive(Clone, Debug)]
pub struct DisplacementsIter<'a, I> {
    displs: &'a [I],
    element: usize,
    item: usize,
    end: usize,
}

impl<I: OffsetType> Iterator for DisplacementsIter<'_, I> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.item >= self.end {
            return None;
        }
        // Skip elements without items. Terminates because item < d[N].
        while self.displs[self.element + 1].as_() <= self.item {
            self.element += 1;
        }
        let pair = (self.element, self.item);
        self.item += 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.item;
        (remaining, Some(remaining))
    }
}

impl<I: OffsetType> ExactSizeIterator for DisplacementsIter<'_, I> {}

impl<I: OffsetType> FusedIterator for DisplacementsIter<'_, I> {}
