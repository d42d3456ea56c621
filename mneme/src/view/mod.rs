//! Windows onto a [`Storage`](crate::Storage) over a range of elements.
//!
//! A view is built from a displacement table, a storage and an element range `from..to`. It
//! borrows the storage exclusively and addresses element `j` of the view as the items owned by
//! element `from + j` of the table.
//!
//! * [`StridedView`]: every element owns the same number of items.
//! * [`DenseView`]: every element owns exactly one item.
//! * [`GeneralView`]: elements own arbitrary numbers of items.
//!
//! [`ViewFactory`] builds views from a layered plan and a layer key.

mod dense;
mod factory;
mod general;
mod iter;
mod strided;

use std::ops::Range;

pub use dense::*;
pub use factory::*;
pub use general::*;
pub use iter::*;
use mneme_error::{MnemeResult, mneme_bail};
pub use strided::*;

use crate::displs::{Displacements, OffsetType};

/// The stride of a [`StridedView`] whose stride is only known at runtime.
pub const DYNAMIC_STRIDE: usize = usize::MAX;

/// Validate the element range `from..to` against a table and the storage items `items` a view
/// may address.
fn check_extent<I: OffsetType>(
    layout: &Displacements<I>,
    items: Range<usize>,
    from: usize,
    to: usize,
) -> MnemeResult<()> {
    if to <= from {
        mneme_bail!(InvalidRange: from, to);
    }
    if to > layout.len() {
        mneme_bail!(OutOfBounds: to, 0, layout.len());
    }
    let begin = layout[from].as_();
    if begin < items.start {
        mneme_bail!(OutOfBounds: begin, items.start, items.end);
    }
    let end = layout[to].as_();
    if end > items.end {
        mneme_bail!(OutOfBounds: end, items.start, items.end);
    }
    Ok(())
}
