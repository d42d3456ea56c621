use crate::MnemeResult;

/// Extension trait for MnemeResult
pub trait ResultExt<T>: private::Sealed {
    /// Flatten a nested [`MnemeResult`]. Helper function until <https://github.com/rust-lang/rust/issues/70142> is stabilized.
    fn flatten(self) -> MnemeResult<T>;
}

mod private {
    use crate::MnemeResult;

    pub trait Sealed {}

    impl<T> Sealed for MnemeResult<MnemeResult<T>> {}
}

impl<T> ResultExt<T> for MnemeResult<MnemeResult<T>> {
    fn flatten(self) -> MnemeResult<T> {
        match self {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) | Err(e) => Err(e),
        }
    }
}
