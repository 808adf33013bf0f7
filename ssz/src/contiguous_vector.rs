use core::marker::PhantomData;

use ethereum_types::H256;
use typenum::{NonZero, Unsigned};

use try_from_iterator::TryFromIterator;

use crate::{
    contiguous_list::merkleize_list_elements,
    error::{ReadError, WriteError},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared::{read_elements, write_elements},
    size::Size,
};

/// Flat analogue of `Vector[T, N]` for small fixed-length collections
/// like Merkle branches and sync committee pubkeys.
pub struct ContiguousVector<T, N> {
    elements: Box<[T]>,
    phantom: PhantomData<N>,
}

impl<T: Clone + Default, N: Unsigned> Default for ContiguousVector<T, N> {
    fn default() -> Self {
        Self {
            elements: vec![T::default(); N::USIZE].into(),
            phantom: PhantomData,
        }
    }
}

impl<T: Clone, N> Clone for ContiguousVector<T, N> {
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
            phantom: PhantomData,
        }
    }
}

impl<T: core::fmt::Debug, N> core::fmt::Debug for ContiguousVector<T, N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.elements.fmt(formatter)
    }
}

impl<T: PartialEq, N> PartialEq for ContiguousVector<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq, N> Eq for ContiguousVector<T, N> {}

impl<T, N> core::ops::Deref for ContiguousVector<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.elements
    }
}

impl<'vector, T, N> IntoIterator for &'vector ContiguousVector<T, N> {
    type Item = &'vector T;
    type IntoIter = core::slice::Iter<'vector, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T, N: Unsigned> TryFromIterator<T> for ContiguousVector<T, N> {
    type Error = ReadError;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let elements = items.into_iter().collect::<Box<[T]>>();

        if elements.len() != N::USIZE {
            return Err(ReadError::ElementCountMismatch {
                expected: N::USIZE,
                actual: elements.len(),
            });
        }

        Ok(Self {
            elements,
            phantom: PhantomData,
        })
    }
}

impl<T, N: Unsigned> ContiguousVector<T, N> {
    pub fn iter_mut(&mut self) -> core::slice::IterMut<T> {
        self.elements.iter_mut()
    }
}

impl<T: SszSize, N: Unsigned + NonZero> SszSize for ContiguousVector<T, N> {
    const SIZE: Size = Size::of_vector(T::SIZE, N::USIZE);
}

impl<C, T: SszRead<C>, N: Unsigned + NonZero> SszRead<C> for ContiguousVector<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let elements = read_elements(context, bytes, Some(N::USIZE), N::USIZE)?;

        Ok(Self {
            elements: elements.into(),
            phantom: PhantomData,
        })
    }
}

impl<T: SszWrite, N: Unsigned + NonZero> SszWrite for ContiguousVector<T, N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        let Size::Fixed { size } = T::SIZE else {
            unreachable!("write_fixed is only called when elements are fixed-size")
        };

        for (index, element) in self.elements.iter().enumerate() {
            element.write_fixed(&mut bytes[index * size..(index + 1) * size]);
        }
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        write_elements(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned + NonZero> SszHash for ContiguousVector<T, N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_list_elements::<T>(&self.elements, N::U64)
    }
}

#[cfg(test)]
mod tests {
    use typenum::U33;

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn merkle_branch_vector_round_trips() {
        let mut branch = ContiguousVector::<H256, U33>::default();
        for (index, node) in branch.iter_mut().enumerate() {
            *node = H256::repeat_byte(index as u8);
        }

        let bytes = branch.to_ssz().expect("fixed size");
        assert_eq!(bytes.len(), 33 * 32);
        assert_eq!(
            ContiguousVector::<H256, U33>::from_ssz_default(bytes).expect("valid"),
            branch,
        );
    }

    #[test]
    fn decoding_rejects_wrong_element_counts() {
        let bytes = [0; 32 * 32];
        assert_eq!(
            ContiguousVector::<H256, U33>::from_ssz_default(bytes),
            Err(ReadError::ElementCountMismatch {
                expected: 33,
                actual: 32,
            }),
        );
    }
}
