use std::mem::MaybeUninit;

use bytes::{Buf, BytesMut};
use mneme_error::{MnemeExpect, mneme_panic};

use crate::Alignment;

/// An extension to the [`BytesMut`] type that allows positioning an empty buffer on an aligned
/// address.
pub trait AlignedBytesMut {
    /// Align an empty `BytesMut` to the specified alignment.
    ///
    /// ## Panics
    ///
    /// Panics if the buffer is not empty, or if there is not enough capacity to align the buffer.
    fn align_empty(&mut self, alignment: Alignment);
}

impl AlignedBytesMut for BytesMut {
    fn align_empty(&mut self, alignment: Alignment) {
        if !self.is_empty() {
            mneme_panic!("BytesMut must be empty before it can be aligned");
        }

        let padding = self.as_ptr().align_offset(*alignment);
        self.capacity()
            .checked_sub(padding)
            .mneme_expect("Not enough capacity to align buffer");

        self.spare_capacity_mut()[..padding].fill(MaybeUninit::new(0));
        // SAFETY: the first `padding` bytes of capacity were zeroed above.
        unsafe { self.set_len(padding) };
        self.advance(padding);
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::AlignedBytesMut;
    use crate::Alignment;

    #[test]
    fn aligns_start_of_buffer() {
        let alignment = Alignment::new(256);
        let mut bytes = BytesMut::with_capacity(64 + *alignment);
        bytes.align_empty(alignment);
        assert!(bytes.is_empty());
        assert!(alignment.is_ptr_aligned(bytes.as_ptr()));
        assert!(bytes.capacity() >= 64);
    }

    #[test]
    #[should_panic]
    fn non_empty_panics() {
        let mut bytes = BytesMut::from(&b"abc"[..]);
        bytes.align_empty(Alignment::new(8));
    }
}
