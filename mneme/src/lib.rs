#![deny(missing_docs)]

//! Memory layouts for elements that own a variable number of items.
//!
//! Elements (cells, particles, mesh entities, ...) each own some number of items, e.g. the
//! degrees of freedom of a finite element. All items are stored in one contiguous storage and
//! addressed through a prefix-sum table:
//!
//! * [`Displacements`] maps an element to the range of items it owns.
//! * [`Plan`], [`LayeredPlan`] and [`CombinedLayeredPlan`] assign item counts to elements, grouped
//!   into named layers and, for combined plans, partitions.
//! * [`MultiStorage`] keeps several typed fields in array-of-structs ([`Aos`]) or
//!   struct-of-arrays ([`Soa`]) layout with per-field alignment; [`SingleStorage`] keeps one.
//! * [`StridedView`], [`DenseView`] and [`GeneralView`] borrow a storage and address it by
//!   element, and [`ViewFactory`] builds them for the layer of a plan.

pub use combined::*;
pub use displs::*;
pub use mneme_buffer::{Aligned, Alignment, AllocStrategy, Natural};
pub use mneme_error::{MnemeError, MnemeResult};
pub use plan::*;
pub use storage::*;
pub use view::*;

mod combined;
mod displs;
mod plan;
pub mod storage;
pub mod view;
