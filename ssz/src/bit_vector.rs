use core::marker::PhantomData;

use arithmetic::UsizeExt as _;
use bit_field::BitField as _;
use ethereum_types::H256;
use typenum::{NonZero, Unsigned};

use crate::{
    error::ReadError,
    merkle::{merkleize_bytes, BYTES_PER_CHUNK},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// `Bitvector[N]`.
pub struct BitVector<N> {
    bytes: Box<[u8]>,
    phantom: PhantomData<N>,
}

impl<N: Unsigned> Default for BitVector<N> {
    fn default() -> Self {
        Self {
            bytes: vec![0; Self::BYTE_COUNT].into(),
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for BitVector<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            phantom: PhantomData,
        }
    }
}

impl<N: Unsigned> core::fmt::Debug for BitVector<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<N> PartialEq for BitVector<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<N> Eq for BitVector<N> {}

impl<N: Unsigned> BitVector<N> {
    const BYTE_COUNT: usize = (N::USIZE + 7) / 8;

    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < N::USIZE);
        self.bytes[index / 8].get_bit(index % 8)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < N::USIZE);
        self.bytes[index / 8].set_bit(index % 8, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..N::USIZE).map(|index| self.get(index))
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.bytes.iter().any(|byte| *byte != 0)
    }
}

impl<N: Unsigned + NonZero> SszSize for BitVector<N> {
    const SIZE: Size = Size::Fixed {
        size: (N::USIZE + 7) / 8,
    };
}

impl<C, N: Unsigned + NonZero> SszRead<C> for BitVector<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() != Self::BYTE_COUNT {
            return Err(ReadError::WrongSize {
                expected: Self::BYTE_COUNT,
                actual: bytes.len(),
            });
        }

        let padding_bits = Self::BYTE_COUNT * 8 - N::USIZE;

        if padding_bits > 0 {
            let last = bytes[Self::BYTE_COUNT - 1];
            if last >> (8 - padding_bits) != 0 {
                return Err(ReadError::BitVectorPaddingNotZero);
            }
        }

        Ok(Self {
            bytes: bytes.into(),
            phantom: PhantomData,
        })
    }
}

impl<N: Unsigned + NonZero> SszWrite for BitVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.bytes);
    }
}

impl<N: Unsigned + NonZero> SszHash for BitVector<N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let chunk_count = N::USIZE.div_round_up(BYTES_PER_CHUNK * 8);
        merkleize_bytes(&self.bytes, chunk_count.ilog2_ceil())
    }
}

#[cfg(test)]
mod tests {
    use typenum::{U4, U512};

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn four_bit_vector_occupies_one_byte() {
        let mut bits = BitVector::<U4>::default();
        bits.set(0, true);
        bits.set(3, true);

        assert_eq!(bits.to_ssz().expect("fixed size"), [0b1001]);
        assert_eq!(bits.count_ones(), 2);
        assert!(bits.get(0));
        assert!(!bits.get(1));
    }

    #[test]
    fn nonzero_padding_is_rejected() {
        assert_eq!(
            BitVector::<U4>::from_ssz_default([0b1_0000]),
            Err(ReadError::BitVectorPaddingNotZero),
        );
    }

    #[test]
    fn large_vector_round_trips() {
        let mut bits = BitVector::<U512>::default();
        bits.set(511, true);
        bits.set(0, true);

        let bytes = bits.to_ssz().expect("fixed size");
        assert_eq!(bytes.len(), 64);
        assert_eq!(BitVector::<U512>::from_ssz_default(bytes).expect("valid"), bits);
    }
}
