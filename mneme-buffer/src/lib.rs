#![deny(missing_docs)]

//! Aligned, fixed-length buffers backing mneme storage.
//!
//! # Alignment
//!
//! Every buffer records the [`Alignment`] it was allocated with. Storage fields choose their
//! alignment through an [`AllocStrategy`]; the [`Aligned`] strategy rejects alignments that are
//! not a power of two or not a multiple of the pointer size at compile time.

pub use alignment::*;
pub use buffer_mut::*;
pub use bytes::*;
pub use strategy::*;

mod alignment;
mod buffer_mut;
mod bytes;
mod debug;
mod strategy;
