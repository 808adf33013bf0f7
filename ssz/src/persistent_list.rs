use core::marker::PhantomData;

use arithmetic::U64Ext as _;
use ethereum_types::H256;
use hashing::hash_256_256;
use triomphe::Arc;
use typenum::Unsigned;

use try_from_iterator::TryFromIterator;

use crate::{
    error::{IndexError, PushError, ReadError, WriteError},
    merkle::{mix_in_length, zero_subtree_root},
    node::{
        node_get, node_get_mut, node_push, node_repeat, node_root, packing_factor, Node, NodeIter,
    },
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared::{read_elements, write_elements},
    size::Size,
};

/// Tree-backed analogue of `List[T, N]`.
///
/// Successive versions of a list share all unchanged subtrees,
/// so cloning is O(1) and mutating an element is O(log N).
pub struct PersistentList<T, N> {
    root: Arc<Node<T>>,
    length: u64,
    /// Levels of internal nodes in the materialized tree.
    /// The capacity of the tree doubles with each level and grows on demand;
    /// hashing extends the root to the full depth implied by `N` with
    /// zero subtrees.
    depth: u8,
    phantom: PhantomData<N>,
}

impl<T, N> Default for PersistentList<T, N> {
    fn default() -> Self {
        Self {
            root: Arc::new(Node::Zero),
            length: 0,
            depth: 0,
            phantom: PhantomData,
        }
    }
}

impl<T, N> Clone for PersistentList<T, N> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
            depth: self.depth,
            phantom: PhantomData,
        }
    }
}

impl<T: core::fmt::Debug, N> core::fmt::Debug for PersistentList<T, N> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.debug_list().entries(self).finish()
    }
}

impl<T: PartialEq, N> PartialEq for PersistentList<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.into_iter().eq(other)
    }
}

impl<T: Eq, N> Eq for PersistentList<T, N> {}

impl<'list, T, N> IntoIterator for &'list PersistentList<T, N> {
    type Item = &'list T;
    type IntoIter = NodeIter<'list, T>;

    fn into_iter(self) -> Self::IntoIter {
        NodeIter::new(&self.root, self.length)
    }
}

impl<T: SszHash + SszWrite + Clone, N: Unsigned> TryFromIterator<T> for PersistentList<T, N> {
    type Error = PushError;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let mut list = Self::default();

        for item in items {
            list.push(item)?;
        }

        Ok(list)
    }
}

impl<T: SszHash, N: Unsigned> PersistentList<T, N> {
    #[must_use]
    pub const fn len_u64(&self) -> u64 {
        self.length
    }

    #[must_use]
    pub fn len_usize(&self) -> usize {
        usize::try_from(self.length).expect("collection lengths fit in usize")
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get(&self, index: u64) -> Result<&T, IndexError> {
        if index >= self.length {
            return Err(IndexError::OutOfBounds {
                index,
                length: self.length,
            });
        }

        node_get(&self.root, self.depth, index)
    }

    pub fn iter(&self) -> NodeIter<T> {
        self.into_iter()
    }

    fn capacity(&self) -> u64 {
        (1_u64 << self.depth) * packing_factor::<T>()
    }

    /// Number of chunk levels in the Merkle tree implied by the limit `N`.
    fn full_depth() -> u8 {
        N::U64.div_round_up(packing_factor::<T>()).ilog2_ceil()
    }
}

impl<T: SszHash + Clone, N: Unsigned> PersistentList<T, N> {
    pub fn get_mut(&mut self, index: u64) -> Result<&mut T, IndexError> {
        if index >= self.length {
            return Err(IndexError::OutOfBounds {
                index,
                length: self.length,
            });
        }

        node_get_mut(&mut self.root, self.depth, index)
    }

    pub fn push(&mut self, element: T) -> Result<(), PushError> {
        if self.length >= N::U64 {
            return Err(PushError::Full { maximum: N::U64 });
        }

        if self.length == self.capacity() {
            let left = core::mem::replace(&mut self.root, Arc::new(Node::Zero));
            self.root = Arc::new(Node::internal(left, Arc::new(Node::Zero)));
            self.depth += 1;
        }

        node_push(&mut self.root, self.depth, self.length, element);
        self.length += 1;

        Ok(())
    }
}

impl<T: SszHash + Clone + Default, N: Unsigned> PersistentList<T, N> {
    /// A list of `length` default elements.
    ///
    /// Zeroed chunks are shared, so this allocates O(log `length`) nodes.
    #[must_use]
    pub fn repeat_default(length: u64) -> Self {
        assert!(length <= N::U64);

        let pack = packing_factor::<T>();
        let depth = length.div_round_up(pack).ilog2_ceil();

        Self {
            root: node_repeat(&T::default(), depth, length),
            length,
            depth,
            phantom: PhantomData,
        }
    }

    /// A list of default elements with the same length as `other`.
    #[must_use]
    pub fn repeat_zero_with_length_of<U: SszHash, M: Unsigned>(
        other: &PersistentList<U, M>,
    ) -> Self {
        Self::repeat_default(other.len_u64())
    }
}

impl<T, N> SszSize for PersistentList<T, N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<C, T: SszRead<C> + SszHash + SszWrite + Clone, N: Unsigned> SszRead<C>
    for PersistentList<T, N>
{
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let maximum = usize::try_from(N::U64).unwrap_or(usize::MAX);
        let elements = read_elements(context, bytes, None, maximum)?;

        Self::try_from_iter(elements).map_err(|PushError::Full { maximum }| ReadError::TooLong {
            maximum: usize::try_from(maximum).unwrap_or(usize::MAX),
            actual: bytes.len(),
        })
    }
}

impl<T: SszWrite + SszHash, N: Unsigned> SszWrite for PersistentList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        write_elements(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for PersistentList<T, N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let mut root = node_root(&self.root, self.depth);

        for depth in self.depth..Self::full_depth() {
            root = hash_256_256(root, zero_subtree_root(depth));
        }

        mix_in_length(root, self.length)
    }
}

#[cfg(test)]
mod tests {
    use typenum::{U1024, U4};

    use crate::{merkle::merkleize_chunks, porcelain::SszReadDefault as _};

    use super::*;

    #[test]
    fn push_and_get_round_trip() {
        let mut list = PersistentList::<u64, U1024>::default();

        for value in 0..100 {
            list.push(value).expect("below limit");
        }

        assert_eq!(list.len_u64(), 100);
        assert_eq!(list.get(0), Ok(&0));
        assert_eq!(list.get(99), Ok(&99));
        assert_eq!(
            list.get(100),
            Err(IndexError::OutOfBounds {
                index: 100,
                length: 100,
            }),
        );
    }

    #[test]
    fn push_past_the_limit_fails() {
        let mut list = PersistentList::<u64, U4>::default();

        for value in 0..4 {
            list.push(value).expect("below limit");
        }

        assert_eq!(list.push(4), Err(PushError::Full { maximum: 4 }));
    }

    #[test]
    fn clones_share_structure_and_diverge_on_write() {
        let mut list = PersistentList::<u64, U1024>::try_from_iter(0..100).expect("below limit");
        let snapshot = list.clone();
        let root_before = list.hash_tree_root();

        assert_eq!(snapshot.hash_tree_root(), root_before);

        *list.get_mut(42).expect("in bounds") = u64::MAX;

        assert_eq!(snapshot.get(42), Ok(&42));
        assert_eq!(snapshot.hash_tree_root(), root_before);
        assert_eq!(list.get(42), Ok(&u64::MAX));
        assert_ne!(list.hash_tree_root(), root_before);
    }

    #[test]
    fn hash_tree_root_matches_direct_merkleization() {
        let list = PersistentList::<u64, U1024>::try_from_iter(1..=5).expect("below limit");

        let mut bytes = [0; 64];
        for (index, value) in (1..=5_u64).enumerate() {
            bytes[index * 8..(index + 1) * 8].copy_from_slice(&value.to_le_bytes());
        }

        let chunks = [
            H256::from_slice(&{
                let mut chunk = [0; 32];
                chunk.copy_from_slice(&bytes[..32]);
                chunk
            }),
            H256::from_slice(&{
                let mut chunk = [0; 32];
                chunk.copy_from_slice(&bytes[32..]);
                chunk
            }),
        ];

        // 1024 / 4 chunks -> depth 8.
        let expected = mix_in_length(merkleize_chunks(&chunks, 8), 5);

        assert_eq!(list.hash_tree_root(), expected);
    }

    #[test]
    fn repeat_default_equals_pushed_defaults() {
        let repeated = PersistentList::<u64, U1024>::repeat_default(77);
        let pushed = PersistentList::<u64, U1024>::try_from_iter(core::iter::repeat(0).take(77))
            .expect("below limit");

        assert_eq!(repeated, pushed);
        assert_eq!(repeated.hash_tree_root(), pushed.hash_tree_root());
    }

    #[test]
    fn serialization_round_trips() {
        let list = PersistentList::<u64, U1024>::try_from_iter(10..20).expect("below limit");
        let bytes = list.to_ssz().expect("offsets fit");

        assert_eq!(bytes.len(), 80);
        assert_eq!(
            PersistentList::<u64, U1024>::from_ssz_default(bytes).expect("valid"),
            list,
        );
    }
}
