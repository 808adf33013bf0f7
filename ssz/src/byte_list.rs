use core::marker::PhantomData;

use arithmetic::U64Ext as _;
use ethereum_types::H256;
use typenum::Unsigned;

use crate::{
    error::ReadError,
    merkle::{merkleize_bytes, mix_in_length, BYTES_PER_CHUNK},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// `ByteList[N]`, as used for transactions and extra data.
pub struct ByteList<N> {
    bytes: Box<[u8]>,
    phantom: PhantomData<N>,
}

impl<N> Default for ByteList<N> {
    fn default() -> Self {
        Self {
            bytes: Box::default(),
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for ByteList<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            phantom: PhantomData,
        }
    }
}

impl<N> core::fmt::Debug for ByteList<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(formatter, "ByteList(0x")?;
        for byte in self.bytes.iter() {
            write!(formatter, "{byte:02x}")?;
        }
        write!(formatter, ")")
    }
}

impl<N> PartialEq for ByteList<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<N> Eq for ByteList<N> {}

impl<N> core::ops::Deref for ByteList<N> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: Unsigned> ByteList<N> {
    pub fn try_from_bytes(bytes: impl Into<Box<[u8]>>) -> Result<Self, ReadError> {
        let bytes = bytes.into();

        if bytes.len() as u64 > N::U64 {
            return Err(ReadError::TooLong {
                maximum: usize::try_from(N::U64).unwrap_or(usize::MAX),
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes,
            phantom: PhantomData,
        })
    }
}

impl<N> SszSize for ByteList<N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<C, N: Unsigned> SszRead<C> for ByteList<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Self::try_from_bytes(bytes)
    }
}

impl<N> SszWrite for ByteList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), crate::error::WriteError> {
        bytes.extend_from_slice(&self.bytes);
        Ok(())
    }
}

impl<N: Unsigned> SszHash for ByteList<N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let chunk_limit = N::U64.div_round_up(BYTES_PER_CHUNK as u64);
        mix_in_length(
            merkleize_bytes(&self.bytes, chunk_limit.ilog2_ceil()),
            self.bytes.len() as u64,
        )
    }
}
