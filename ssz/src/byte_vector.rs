use core::marker::PhantomData;

use arithmetic::UsizeExt as _;
use ethereum_types::H256;
use typenum::{NonZero, Unsigned};

use crate::{
    error::ReadError,
    merkle::{merkleize_bytes, BYTES_PER_CHUNK},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// `ByteVector[N]`, as used for logs blooms.
pub struct ByteVector<N> {
    bytes: Box<[u8]>,
    phantom: PhantomData<N>,
}

impl<N: Unsigned> Default for ByteVector<N> {
    fn default() -> Self {
        Self {
            bytes: vec![0; N::USIZE].into(),
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for ByteVector<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            phantom: PhantomData,
        }
    }
}

impl<N> core::fmt::Debug for ByteVector<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(formatter, "ByteVector(0x")?;
        for byte in self.bytes.iter() {
            write!(formatter, "{byte:02x}")?;
        }
        write!(formatter, ")")
    }
}

impl<N> PartialEq for ByteVector<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<N> Eq for ByteVector<N> {}

impl<N> core::ops::Deref for ByteVector<N> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: Unsigned + NonZero> SszSize for ByteVector<N> {
    const SIZE: Size = Size::Fixed { size: N::USIZE };
}

impl<C, N: Unsigned + NonZero> SszRead<C> for ByteVector<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() != N::USIZE {
            return Err(ReadError::WrongSize {
                expected: N::USIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes: bytes.into(),
            phantom: PhantomData,
        })
    }
}

impl<N: Unsigned + NonZero> SszWrite for ByteVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.bytes);
    }
}

impl<N: Unsigned + NonZero> SszHash for ByteVector<N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let chunk_count = N::USIZE.div_round_up(BYTES_PER_CHUNK);
        merkleize_bytes(&self.bytes, chunk_count.ilog2_ceil())
    }
}
