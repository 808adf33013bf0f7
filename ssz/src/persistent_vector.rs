use core::marker::PhantomData;

use arithmetic::U64Ext as _;
use ethereum_types::H256;
use triomphe::Arc;
use typenum::{NonZero, Unsigned};

use try_from_iterator::TryFromIterator;

use crate::{
    error::{IndexError, ReadError, WriteError},
    node::{node_get, node_get_mut, node_repeat, node_root, packing_factor, Node, NodeIter},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared::{read_elements, write_elements},
    size::Size,
};

/// Tree-backed analogue of `Vector[T, N]`.
///
/// Always fully materialized; default construction shares a single chain of
/// zeroed subtrees, so it stays cheap even for the long state vectors.
pub struct PersistentVector<T, N> {
    root: Arc<Node<T>>,
    depth: u8,
    phantom: PhantomData<N>,
}

impl<T, N> Clone for PersistentVector<T, N> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            depth: self.depth,
            phantom: PhantomData,
        }
    }
}

impl<T: core::fmt::Debug + SszHash, N: Unsigned> core::fmt::Debug for PersistentVector<T, N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.debug_list().entries(self).finish()
    }
}

impl<T: PartialEq + SszHash, N: Unsigned> PartialEq for PersistentVector<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.into_iter().eq(other)
    }
}

impl<T: Eq + SszHash, N: Unsigned> Eq for PersistentVector<T, N> {}

impl<T: SszHash + Clone + Default, N: Unsigned + NonZero> Default for PersistentVector<T, N> {
    fn default() -> Self {
        Self::repeat(T::default())
    }
}

impl<'vector, T: SszHash, N: Unsigned> IntoIterator for &'vector PersistentVector<T, N> {
    type Item = &'vector T;
    type IntoIter = NodeIter<'vector, T>;

    fn into_iter(self) -> Self::IntoIter {
        NodeIter::new(&self.root, N::U64)
    }
}

impl<T: SszHash + Clone, N: Unsigned + NonZero> TryFromIterator<T> for PersistentVector<T, N> {
    type Error = ReadError;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let elements = items.into_iter().collect::<Vec<_>>();

        if elements.len() as u64 != N::U64 {
            return Err(ReadError::ElementCountMismatch {
                expected: usize::try_from(N::U64).unwrap_or(usize::MAX),
                actual: elements.len(),
            });
        }

        let depth = Self::depth();
        let pack = packing_factor::<T>();
        let mut root = Arc::new(Node::Zero);

        for (index, element) in elements.into_iter().enumerate() {
            crate::node::node_push(&mut root, depth, index as u64, element);
        }

        debug_assert!(N::U64.div_round_up(pack) <= 1 << depth);

        Ok(Self {
            root,
            depth,
            phantom: PhantomData,
        })
    }
}

impl<T: SszHash, N: Unsigned> PersistentVector<T, N> {
    fn depth() -> u8 {
        N::U64.div_round_up(packing_factor::<T>()).ilog2_ceil()
    }

    pub fn get(&self, index: u64) -> Result<&T, IndexError> {
        if index >= N::U64 {
            return Err(IndexError::OutOfBounds {
                index,
                length: N::U64,
            });
        }

        node_get(&self.root, self.depth, index)
    }

    /// Indexes circularly, as with the slot- and epoch-indexed state vectors.
    pub fn mod_index(&self, index: u64) -> &T {
        self.get(index % N::U64)
            .expect("index is reduced modulo the length")
    }

    pub fn iter(&self) -> NodeIter<T> {
        self.into_iter()
    }
}

impl<T: SszHash + Clone, N: Unsigned> PersistentVector<T, N> {
    pub fn get_mut(&mut self, index: u64) -> Result<&mut T, IndexError> {
        if index >= N::U64 {
            return Err(IndexError::OutOfBounds {
                index,
                length: N::U64,
            });
        }

        node_get_mut(&mut self.root, self.depth, index)
    }

    pub fn mod_index_mut(&mut self, index: u64) -> &mut T {
        self.get_mut(index % N::U64)
            .expect("index is reduced modulo the length")
    }
}

impl<T: SszHash + Clone, N: Unsigned + NonZero> PersistentVector<T, N> {
    #[must_use]
    pub fn repeat(element: T) -> Self {
        let depth = Self::depth();

        Self {
            root: node_repeat(&element, depth, N::U64),
            depth,
            phantom: PhantomData,
        }
    }
}

impl<T: SszSize, N: Unsigned> SszSize for PersistentVector<T, N> {
    const SIZE: Size = Size::of_vector(T::SIZE, N::USIZE);
}

impl<C, T: SszRead<C> + SszHash + Clone, N: Unsigned + NonZero> SszRead<C>
    for PersistentVector<T, N>
{
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let expected = usize::try_from(N::U64).unwrap_or(usize::MAX);
        let elements = read_elements(context, bytes, Some(expected), expected)?;
        Self::try_from_iter(elements)
    }
}

impl<T: SszWrite + SszHash, N: Unsigned> SszWrite for PersistentVector<T, N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        let Size::Fixed { size } = T::SIZE else {
            unreachable!("state vectors hold fixed-size elements")
        };

        for (index, element) in self.into_iter().enumerate() {
            element.write_fixed(&mut bytes[index * size..(index + 1) * size]);
        }
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        write_elements(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for PersistentVector<T, N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        node_root(&self.root, self.depth)
    }
}

#[cfg(test)]
mod tests {
    use typenum::U64;

    use crate::{
        merkle::{merkleize_chunks, zero_subtree_root},
        porcelain::SszReadDefault as _,
    };

    use super::*;

    #[test]
    fn default_vector_hashes_like_zero_subtree() {
        let vector = PersistentVector::<H256, U64>::default();
        assert_eq!(vector.hash_tree_root(), zero_subtree_root(6));
    }

    #[test]
    fn mutation_changes_only_the_written_element() {
        let mut vector = PersistentVector::<H256, U64>::default();
        let snapshot = vector.clone();

        *vector.get_mut(13).expect("in bounds") = H256::repeat_byte(0xab);

        assert_eq!(snapshot.get(13), Ok(&H256::zero()));
        assert_eq!(vector.get(13), Ok(&H256::repeat_byte(0xab)));
        assert_eq!(vector.get(14), Ok(&H256::zero()));

        let mut chunks = vec![H256::zero(); 14];
        chunks[13] = H256::repeat_byte(0xab);
        assert_eq!(vector.hash_tree_root(), merkleize_chunks(&chunks, 6));
    }

    #[test]
    fn mod_index_wraps_around() {
        let mut vector = PersistentVector::<u64, U64>::default();
        *vector.mod_index_mut(64 + 7) = 99;
        assert_eq!(vector.get(7), Ok(&99));
    }

    #[test]
    fn serialization_round_trips() {
        let vector =
            PersistentVector::<u64, U64>::try_from_iter(0..64).expect("exact element count");
        let bytes = vector.to_ssz().expect("fixed size");

        assert_eq!(bytes.len(), 512);
        assert_eq!(
            PersistentVector::<u64, U64>::from_ssz_default(bytes).expect("valid"),
            vector,
        );
    }
}
