use core::fmt;

use ethereum_types::H256;
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::ReadError,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// 256-bit unsigned integer with little-endian SSZ encoding
/// and decimal-string serde, as in configuration files.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub struct Uint256(pub U256);

impl Uint256 {
    pub const ZERO: Self = Self(U256::zero());

    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    #[must_use]
    pub fn from_dec_str(digits: &str) -> Option<Self> {
        U256::from_dec_str(digits).ok().map(Self)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

impl SszSize for Uint256 {
    const SIZE: Size = Size::Fixed { size: 32 };
}

impl<C> SszRead<C> for Uint256 {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() != 32 {
            return Err(ReadError::WrongSize {
                expected: 32,
                actual: bytes.len(),
            });
        }

        Ok(Self(U256::from_little_endian(bytes)))
    }
}

impl SszWrite for Uint256 {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.0.to_little_endian(bytes);
    }
}

impl SszHash for Uint256 {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        self.0.to_little_endian(chunk.as_bytes_mut());
        chunk
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        U256::from_dec_str(&string)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn encoding_is_little_endian() {
        let value = Uint256::from_u64(0x1234);
        let bytes = value.to_ssz().expect("fixed size");

        assert_eq!(bytes[0], 0x34);
        assert_eq!(bytes[1], 0x12);
        assert_eq!(bytes[2..], [0; 30]);
        assert_eq!(Uint256::from_ssz_default(bytes).expect("valid"), value);
    }
}
