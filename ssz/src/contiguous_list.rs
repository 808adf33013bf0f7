use core::marker::PhantomData;

use arithmetic::U64Ext as _;
use ethereum_types::H256;
use typenum::Unsigned;

use try_from_iterator::TryFromIterator;

use crate::{
    error::{PushError, ReadError, WriteError},
    merkle::{merkleize_bytes, merkleize_chunks, mix_in_length},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared::{read_elements, write_elements},
    size::Size,
};

/// Flat analogue of `List[T, N]` for block-scale collections.
///
/// Operations lists in block bodies are small and read-only once decoded,
/// so they do not justify a tree-backed representation.
pub struct ContiguousList<T, N> {
    elements: Vec<T>,
    phantom: PhantomData<N>,
}

impl<T, N> Default for ContiguousList<T, N> {
    fn default() -> Self {
        Self {
            elements: vec![],
            phantom: PhantomData,
        }
    }
}

impl<T: Clone, N> Clone for ContiguousList<T, N> {
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            phantom: PhantomData,
        }
    }
}

impl<T: core::fmt::Debug, N> core::fmt::Debug for ContiguousList<T, N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.elements.fmt(formatter)
    }
}

impl<T: PartialEq, N> PartialEq for ContiguousList<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq, N> Eq for ContiguousList<T, N> {}

impl<T, N> core::ops::Deref for ContiguousList<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.elements
    }
}

impl<'list, T, N> IntoIterator for &'list ContiguousList<T, N> {
    type Item = &'list T;
    type IntoIter = core::slice::Iter<'list, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T, N: Unsigned> TryFromIterator<T> for ContiguousList<T, N> {
    type Error = PushError;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let mut list = Self::default();

        for item in items {
            list.push(item)?;
        }

        Ok(list)
    }
}

impl<T, N: Unsigned> ContiguousList<T, N> {
    pub fn push(&mut self, element: T) -> Result<(), PushError> {
        if self.elements.len() as u64 >= N::U64 {
            return Err(PushError::Full { maximum: N::U64 });
        }

        self.elements.push(element);
        Ok(())
    }
}

impl<T, N> SszSize for ContiguousList<T, N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<C, T: SszRead<C>, N: Unsigned> SszRead<C> for ContiguousList<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let maximum = usize::try_from(N::U64).unwrap_or(usize::MAX);
        let elements = read_elements(context, bytes, None, maximum)?;

        Ok(Self {
            elements,
            phantom: PhantomData,
        })
    }
}

impl<T: SszWrite, N> SszWrite for ContiguousList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        write_elements(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for ContiguousList<T, N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        mix_in_length(
            merkleize_list_elements::<T>(&self.elements, N::U64),
            self.elements.len() as u64,
        )
    }
}

/// Merkleizes list elements against the chunk limit implied by `maximum`.
pub(crate) fn merkleize_list_elements<T: SszHash + SszWrite>(
    elements: &[T],
    maximum: u64,
) -> H256 {
    let pack = T::PackingFactor::U64;
    let depth = maximum.div_round_up(pack).ilog2_ceil();

    if pack == 1 {
        let roots = elements
            .iter()
            .map(SszHash::hash_tree_root)
            .collect::<Vec<_>>();

        merkleize_chunks(&roots, depth)
    } else {
        let Size::Fixed { size } = T::SIZE else {
            unreachable!("only fixed-size types have packing factors above 1")
        };

        let mut bytes = vec![0; elements.len() * size];
        for (index, element) in elements.iter().enumerate() {
            element.write_fixed(&mut bytes[index * size..(index + 1) * size]);
        }

        merkleize_bytes(&bytes, depth)
    }
}

#[cfg(test)]
mod tests {
    use typenum::{U16, U4};

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn list_of_variable_elements_uses_offset_table() {
        type Inner = ContiguousList<u64, U4>;
        type Outer = ContiguousList<Inner, U4>;

        let inner = Inner::try_from_iter([7, 8]).expect("below limit");
        let outer = Outer::try_from_iter([inner.clone(), Inner::default()]).expect("below limit");

        let bytes = outer.to_ssz().expect("offsets fit");
        // Two offsets, then the two `u64`s of the first inner list.
        assert_eq!(
            bytes,
            [8, 0, 0, 0, 24, 0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0],
        );

        assert_eq!(Outer::from_ssz_default(bytes).expect("valid"), outer);
    }

    #[test]
    fn decoding_rejects_lists_over_the_limit() {
        type Short = ContiguousList<u64, U4>;
        type Long = ContiguousList<u64, U16>;

        let bytes = Long::try_from_iter(0..5)
            .expect("below limit")
            .to_ssz()
            .expect("offsets fit");

        assert_eq!(
            Short::from_ssz_default(bytes),
            Err(ReadError::TooLong {
                maximum: 4,
                actual: 5,
            }),
        );
    }
}
