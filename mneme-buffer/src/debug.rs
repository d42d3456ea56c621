use std::fmt::{Debug, Formatter};

/// A wrapper around a slice that truncates the debug output if it is too long, noting how many
/// items were left out.
pub(crate) struct TruncatedDebug<'a, T>(pub(crate) &'a [T]);

impl<T: Debug> Debug for TruncatedDebug<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const TRUNC_SIZE: usize = 16;
        if self.0.len() <= TRUNC_SIZE {
            return write!(f, "{:?}", self.0);
        }
        write!(f, "[")?;
        for elem in &self.0[..TRUNC_SIZE] {
            write!(f, "{:?}, ", elem)?;
        }
        write!(f, "... {} more]", self.0.len() - TRUNC_SIZE)
    }
}
