#![deny(missing_docs)]

//! Error handling for the mneme memory-layout crates.
//!
//! Fallible operations return [`MnemeResult`]. Broken invariants panic through
//! [`mneme_panic!`] so the message carries the same formatting as a returned error.

mod ext;

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

pub use ext::*;

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env_var_is_set("MNEME_PANIC_ON_ERR") {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

fn env_var_is_set(name: &str) -> bool {
    std::env::var_os(name).is_some_and(|v| !v.is_empty())
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for mneme.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum MnemeError {
    /// An index is out of bounds.
    #[error("index {0} out of bounds from {1} to {2}\nBacktrace:\n{3}")]
    OutOfBounds(usize, usize, usize, Backtrace),
    /// An invalid argument was provided.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, Backtrace),
    /// An empty or inverted element range was requested.
    #[error("'to' ({1}) must be larger than 'from' ({0})\nBacktrace:\n{2}")]
    InvalidRange(usize, usize, Backtrace),
    /// Elements in a range expected to share one stride do not.
    #[error(
        "Failed to construct strided view: stride {2} != {1} at element {0}\nBacktrace:\n{3}"
    )]
    NonUniformStride(usize, usize, usize, Backtrace),
    /// A layer was looked up that was never appended to the plan.
    #[error("{0}\nBacktrace:\n{1}")]
    MissingLayer(ErrString, Backtrace),
    /// Memory for a storage allocation could not be obtained.
    #[error("{0}\nBacktrace:\n{1}")]
    OutOfMemory(ErrString, Backtrace),
    /// An assertion failed.
    #[error("{0}\nBacktrace:\n{1}")]
    AssertionFailed(ErrString, Backtrace),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<MnemeError>),
}

impl MnemeError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        MnemeError::Context(msg.into(), Box::new(self))
    }
}

impl Debug for MnemeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return MnemeErrors as their error type.
pub type MnemeResult<T> = Result<T, MnemeError>;

/// A trait for unwrapping a MnemeResult.
pub trait MnemeUnwrap {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug (programmer error).
    fn mneme_unwrap(self) -> Self::Output;
}

impl<T, E> MnemeUnwrap for Result<T, E>
where
    E: Into<MnemeError>,
{
    type Output = T;

    #[inline(always)]
    fn mneme_unwrap(self) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|err| mneme_panic!(err))
    }
}

/// A trait for expect-ing a MnemeResult or an Option.
pub trait MnemeExpect {
    /// The type of the value being expected.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug (programmer error).
    fn mneme_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> MnemeExpect for Result<T, E>
where
    E: Into<MnemeError>,
{
    type Output = T;

    #[inline(always)]
    fn mneme_expect(self, msg: &str) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|e| mneme_panic!(e.with_context(msg.to_string())))
    }
}

impl<T> MnemeExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn mneme_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            let err = MnemeError::AssertionFailed(msg.to_string().into(), Backtrace::capture());
            mneme_panic!(err)
        })
    }
}

/// A convenient macro for creating a MnemeError.
#[macro_export]
macro_rules! mneme_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::MnemeError::OutOfBounds($idx, $start, $stop, Backtrace::capture())
        )
    }};
    (InvalidRange: $from:expr, $to:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::MnemeError::InvalidRange($from, $to, Backtrace::capture())
        )
    }};
    (NonUniformStride: $idx:expr, $expected:expr, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::MnemeError::NonUniformStride($idx, $expected, $actual, Backtrace::capture())
        )
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::MnemeError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($variant:ident: $err:expr $(,)?) => {
        $crate::__private::must_use(
            $crate::MnemeError::$variant($err)
        )
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::mneme_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a MnemeError.
#[macro_export]
macro_rules! mneme_bail {
    ($($tt:tt)+) => {
        return Err($crate::mneme_err!($($tt)+))
    };
}

/// A convenient macro for panicking with a MnemeError in the presence of a programmer error
/// (e.g., an invariant has been violated).
#[macro_export]
macro_rules! mneme_panic {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        $crate::mneme_panic!($crate::mneme_err!(OutOfBounds: $idx, $start, $stop))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::mneme_panic!($crate::mneme_err!($variant: $fmt, $($arg),*))
    };
    ($err:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err: $crate::MnemeError = $err;
        panic!("{}", err.with_context(format!($fmt, $($arg),*)))
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::mneme_panic!($crate::mneme_err!($fmt, $($arg),*))
    };
    ($err:expr) => {{
        let err: $crate::MnemeError = $err;
        panic!("{}", err)
    }};
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub const fn must_use(error: crate::MnemeError) -> crate::MnemeError {
        error
    }
}

#[cfg(test)]
mod test {
    use crate::{MnemeError, MnemeExpect, MnemeResult};

    fn bail_out_of_bounds(idx: usize) -> MnemeResult<()> {
        mneme_bail!(OutOfBounds: idx, 0, 4)
    }

    #[test]
    fn out_of_bounds_fields() {
        let err = bail_out_of_bounds(7).err();
        assert!(matches!(err, Some(MnemeError::OutOfBounds(7, 0, 4, _))));
    }

    #[test]
    fn stride_message_names_index_and_strides() {
        let err = mneme_err!(NonUniformStride: 3, 4, 10);
        assert!(
            err.to_string()
                .starts_with("Failed to construct strided view: stride 10 != 4 at element 3")
        );
    }

    #[test]
    fn context_wraps_message() {
        let err = mneme_err!(MissingLayer: "layer {} was never added", "Ghost")
            .with_context("looking up partition 2");
        let msg = err.to_string();
        assert!(msg.starts_with("looking up partition 2: layer Ghost was never added"));
    }

    #[test]
    #[should_panic(expected = "missing value")]
    fn expect_none_panics() {
        let value: Option<u8> = None;
        value.mneme_expect("missing value");
    }
}
