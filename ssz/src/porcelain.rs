use ethereum_types::H256;
use typenum::{NonZero, Unsigned};

use crate::{
    error::{ReadError, WriteError},
    size::Size,
};

pub trait SszSize {
    const SIZE: Size;
}

/// Deserialization from SSZ bytes.
///
/// The context parameter `C` exists for types whose schema depends on
/// runtime configuration. Most types are context-independent and implement
/// `SszRead<C>` for all `C`, making them decodable through [`SszReadDefault`].
pub trait SszRead<C>: SszSize + Sized {
    /// `bytes` must be the exact span of the value as delimited by the caller.
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError>;
}

pub trait SszReadDefault: SszRead<()> {
    fn from_ssz_default(bytes: impl AsRef<[u8]>) -> Result<Self, ReadError> {
        Self::from_ssz_unchecked(&(), bytes.as_ref())
    }
}

impl<T: SszRead<()>> SszReadDefault for T {}

pub trait SszWrite: SszSize {
    /// Writes `self` into `bytes`, which must be exactly `Self::SIZE.fixed_part()` long.
    fn write_fixed(&self, bytes: &mut [u8]) {
        let _ = bytes;
        unreachable!("SszWrite::write_fixed must only be called on fixed-size types")
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let _ = bytes;
        unreachable!("SszWrite::write_variable must only be called on variable-size types")
    }

    fn to_ssz(&self) -> Result<Vec<u8>, WriteError> {
        match Self::SIZE {
            Size::Fixed { size } => {
                let mut bytes = vec![0; size];
                self.write_fixed(&mut bytes);
                Ok(bytes)
            }
            Size::Variable { minimum_size } => {
                let mut bytes = Vec::with_capacity(minimum_size);
                self.write_variable(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

pub trait SszHash {
    /// Number of values that fit in a single 32-byte chunk.
    ///
    /// 1 for composite types and 32-byte roots, more for small basic types.
    type PackingFactor: Unsigned + NonZero;

    fn hash_tree_root(&self) -> H256;
}
