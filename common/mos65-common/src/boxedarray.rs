//! Wrapper around `Box<[u8; LEN]>` with a custom `bincode::Decode` implementation that
//! deserializes directly into heap memory.
//!
//! The implementation that `#[derive(Decode)]` generates for `Box<[u8; LEN]>` deserializes into
//! stack memory and then moves to the heap, which is a poor fit for a full 64KB address space.

use bincode::de::read::Reader;
use bincode::de::{BorrowDecoder, Decoder};
use bincode::error::DecodeError;
use bincode::{BorrowDecode, Decode, Encode};
use std::ops::{Deref, DerefMut};

fn zeroed_box<const LEN: usize>() -> Box<[u8; LEN]> {
    match vec![0; LEN].into_boxed_slice().try_into() {
        Ok(array) => array,
        Err(_) => unreachable!("boxed slice was allocated with length {LEN}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode)]
pub struct BoxedByteArray<const LEN: usize>(Box<[u8; LEN]>);

impl<const LEN: usize> BoxedByteArray<LEN> {
    #[must_use]
    pub fn new() -> Self {
        Self(zeroed_box())
    }
}

impl<const LEN: usize> Default for BoxedByteArray<LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LEN: usize> Deref for BoxedByteArray<LEN> {
    type Target = Box<[u8; LEN]>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const LEN: usize> DerefMut for BoxedByteArray<LEN> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const LEN: usize, Context> Decode<Context> for BoxedByteArray<LEN> {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let mut array: Box<[u8; LEN]> = zeroed_box();
        decoder.reader().read(array.as_mut())?;
        Ok(Self(array))
    }
}

impl<'de, const LEN: usize, Context> BorrowDecode<'de, Context> for BoxedByteArray<LEN> {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        let mut array: Box<[u8; LEN]> = zeroed_box();
        decoder.reader().read(array.as_mut())?;
        Ok(Self(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_preserves_contents() {
        let mut array = BoxedByteArray::<256>::new();
        for (i, byte) in array.iter_mut().enumerate() {
            *byte = (i * 7) as u8;
        }

        let config = bincode::config::standard();
        let serialized = bincode::encode_to_vec(&array, config).unwrap();
        let (deserialized, _): (BoxedByteArray<256>, _) =
            bincode::decode_from_slice(&serialized, config).unwrap();

        assert_eq!(array, deserialized);
    }
}
