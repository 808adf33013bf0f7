//! SSZ implementations for basic types and smart pointers.

use byteorder::{ByteOrder as _, LittleEndian};
use ethereum_types::{H160, H256};
use typenum::{U1, U32, U4};

use crate::{
    error::{ReadError, WriteError},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

impl SszSize for bool {
    const SIZE: Size = Size::Fixed { size: 1 };
}

impl<C> SszRead<C> for bool {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        check_size(bytes, 1)?;

        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(ReadError::BooleanInvalid { byte }),
        }
    }
}

impl SszWrite for bool {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes[0] = u8::from(*self);
    }
}

impl SszHash for bool {
    type PackingFactor = U32;

    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[0] = u8::from(*self);
        chunk
    }
}

impl SszSize for u8 {
    const SIZE: Size = Size::Fixed { size: 1 };
}

impl<C> SszRead<C> for u8 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        check_size(bytes, 1)?;
        Ok(bytes[0])
    }
}

impl SszWrite for u8 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes[0] = *self;
    }
}

impl SszHash for u8 {
    type PackingFactor = U32;

    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[0] = *self;
        chunk
    }
}

impl SszSize for u64 {
    const SIZE: Size = Size::Fixed { size: 8 };
}

impl<C> SszRead<C> for u64 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        check_size(bytes, 8)?;
        Ok(LittleEndian::read_u64(bytes))
    }
}

impl SszWrite for u64 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        LittleEndian::write_u64(bytes, *self);
    }
}

impl SszHash for u64 {
    type PackingFactor = U4;

    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..8].copy_from_slice(&self.to_le_bytes());
        chunk
    }
}

impl SszSize for H256 {
    const SIZE: Size = Size::Fixed { size: 32 };
}

impl<C> SszRead<C> for H256 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        check_size(bytes, 32)?;
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for H256 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for H256 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszSize for H160 {
    const SIZE: Size = Size::Fixed { size: 20 };
}

impl<C> SszRead<C> for H160 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        check_size(bytes, 20)?;
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for H160 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for H160 {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..20].copy_from_slice(self.as_bytes());
        chunk
    }
}

impl<T: SszSize> SszSize for std::sync::Arc<T> {
    const SIZE: Size = T::SIZE;
}

impl<C, T: SszRead<C>> SszRead<C> for std::sync::Arc<T> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        T::from_ssz_unchecked(context, bytes).map(Self::new)
    }
}

impl<T: SszWrite> SszWrite for std::sync::Arc<T> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.as_ref().write_fixed(bytes)
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        self.as_ref().write_variable(bytes)
    }
}

impl<T: SszHash> SszHash for std::sync::Arc<T> {
    type PackingFactor = T::PackingFactor;

    fn hash_tree_root(&self) -> H256 {
        self.as_ref().hash_tree_root()
    }
}

fn check_size(bytes: &[u8], expected: usize) -> Result<(), ReadError> {
    if bytes.len() != expected {
        return Err(ReadError::WrongSize {
            expected,
            actual: bytes.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn u64_round_trips_little_endian() {
        let bytes = 0x0807_0605_0403_0201_u64.to_ssz().expect("fixed size");
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(u64::from_ssz_default(bytes).expect("valid"), 0x0807_0605_0403_0201);
    }

    #[test]
    fn bool_rejects_invalid_bytes() {
        assert_eq!(
            bool::from_ssz_default([2]),
            Err(ReadError::BooleanInvalid { byte: 2 }),
        );
    }
}
