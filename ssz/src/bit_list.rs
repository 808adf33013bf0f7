use core::marker::PhantomData;

use arithmetic::{U64Ext as _, UsizeExt as _};
use bit_field::BitField as _;
use ethereum_types::H256;
use typenum::Unsigned;

use crate::{
    error::ReadError,
    merkle::{merkleize_bytes, mix_in_length, BYTES_PER_CHUNK},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// `Bitlist[N]`. Stores the data bits without the delimiter.
pub struct BitList<N> {
    bytes: Box<[u8]>,
    length: usize,
    phantom: PhantomData<N>,
}

impl<N> Default for BitList<N> {
    fn default() -> Self {
        Self {
            bytes: Box::default(),
            length: 0,
            phantom: PhantomData,
        }
    }
}

impl<N> Clone for BitList<N> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            length: self.length,
            phantom: PhantomData,
        }
    }
}

impl<N> core::fmt::Debug for BitList<N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<N> PartialEq for BitList<N> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.bytes == other.bytes
    }
}

impl<N> Eq for BitList<N> {}

impl<N: Unsigned> BitList<N> {
    /// An all-zero bitlist of `length` bits.
    #[must_use]
    pub fn with_length(length: usize) -> Self {
        assert!(length as u64 <= N::U64);

        Self {
            bytes: vec![0; length.div_round_up(8)].into(),
            length,
            phantom: PhantomData,
        }
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.length);
        self.bytes[index / 8].get_bit(index % 8)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.length);
        self.bytes[index / 8].set_bit(index % 8, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.length).map(|index| self.get(index))
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.iter().filter(|bit| *bit).count()
    }
}

impl<N> SszSize for BitList<N> {
    const SIZE: Size = Size::Variable { minimum_size: 1 };
}

impl<C, N: Unsigned> SszRead<C> for BitList<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let Some(last) = bytes.last().copied() else {
            return Err(ReadError::BitlistDelimiterMissing);
        };

        if last == 0 {
            return Err(ReadError::BitlistDelimiterMissing);
        }

        let delimiter_position = 7 - last.leading_zeros() as usize;
        let length = (bytes.len() - 1) * 8 + delimiter_position;

        if length as u64 > N::U64 {
            return Err(ReadError::TooLong {
                maximum: usize::try_from(N::U64).unwrap_or(usize::MAX),
                actual: length,
            });
        }

        let mut data = bytes[..length.div_round_up(8)].to_vec();

        if let Some(last_data_byte) = data.last_mut() {
            // Clear the delimiter if it landed inside the final data byte.
            if length % 8 != 0 && length / 8 == bytes.len() - 1 {
                last_data_byte.set_bit(delimiter_position, false);
            }
        }

        Ok(Self {
            bytes: data.into(),
            length,
            phantom: PhantomData,
        })
    }
}

impl<N> SszWrite for BitList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), crate::error::WriteError> {
        let mut serialized = vec![0; self.length / 8 + 1];
        serialized[..self.bytes.len()].copy_from_slice(&self.bytes);
        serialized[self.length / 8].set_bit(self.length % 8, true);
        bytes.append(&mut serialized);
        Ok(())
    }
}

impl<N: Unsigned> SszHash for BitList<N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let chunk_limit = N::U64.div_round_up(BYTES_PER_CHUNK as u64 * 8);
        mix_in_length(
            merkleize_bytes(&self.bytes, chunk_limit.ilog2_ceil()),
            self.length as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use typenum::U2048;

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn empty_bitlist_is_a_single_delimiter() {
        let bits = BitList::<U2048>::with_length(0);
        assert_eq!(bits.to_ssz().expect("nothing to overflow"), [1]);
    }

    #[test_case(0; "empty")]
    #[test_case(5; "partial byte")]
    #[test_case(8; "exact byte")]
    #[test_case(21; "multiple bytes")]
    fn round_trips_at_length(length: usize) {
        let mut bits = BitList::<U2048>::with_length(length);
        for index in (0..length).step_by(3) {
            bits.set(index, true);
        }

        let bytes = bits.to_ssz().expect("nothing to overflow");
        let decoded = BitList::<U2048>::from_ssz_default(bytes).expect("valid");

        assert_eq!(decoded, bits);
        assert_eq!(decoded.len(), length);
    }

    #[test]
    fn delimiter_bit_is_not_part_of_the_data() {
        // Three data bits, all set: 0b0111 plus delimiter at position 3.
        let decoded = BitList::<U2048>::from_ssz_default([0b1111]).expect("valid");

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.count_ones(), 3);

        let mut expected = BitList::<U2048>::with_length(3);
        expected.set(0, true);
        expected.set(1, true);
        expected.set(2, true);
        assert_eq!(decoded, expected);
    }

    #[test]
    fn missing_delimiter_is_rejected() {
        assert_eq!(
            BitList::<U2048>::from_ssz_default([0b0101, 0]),
            Err(ReadError::BitlistDelimiterMissing),
        );
    }
}
