use core::ops::{Deref, DerefMut};
use std::sync::OnceLock;

use ethereum_types::H256;

use crate::{
    error::{ReadError, WriteError},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// Hash cache. Wraps a value and memoizes its `hash_tree_root`.
///
/// The cached root is invalidated on any mutable access and carried
/// across clones, so repeated root computations between mutations are free.
#[derive(Clone, Default, Debug)]
pub struct Hc<T> {
    value: T,
    root: OnceLock<H256>,
}

impl<T> Hc<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    #[must_use]
    pub fn cached_root(&self) -> Option<H256> {
        self.root.get().copied()
    }
}

impl<T> From<T> for Hc<T> {
    fn from(value: T) -> Self {
        Self {
            value,
            root: OnceLock::new(),
        }
    }
}

impl<T> Deref for Hc<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Hc<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.root = OnceLock::new();
        &mut self.value
    }
}

impl<T: PartialEq> PartialEq for Hc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Hc<T> {}

impl<T: SszSize> SszSize for Hc<T> {
    const SIZE: Size = T::SIZE;
}

impl<C, T: SszRead<C>> SszRead<C> for Hc<T> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        T::from_ssz_unchecked(context, bytes).map(Self::from)
    }
}

impl<T: SszWrite> SszWrite for Hc<T> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.value.write_fixed(bytes)
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        self.value.write_variable(bytes)
    }
}

impl<T: SszHash> SszHash for Hc<T> {
    type PackingFactor = T::PackingFactor;

    fn hash_tree_root(&self) -> H256 {
        *self.root.get_or_init(|| self.value.hash_tree_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutable_access_invalidates_the_cached_root() {
        let mut value = Hc::from(1_u64);

        let before = value.hash_tree_root();
        assert_eq!(value.cached_root(), Some(before));

        *value = 2;
        assert_eq!(value.cached_root(), None);
        assert_ne!(value.hash_tree_root(), before);
    }

    #[test]
    fn clones_keep_the_cache() {
        let value = Hc::from(7_u64);
        let root = value.hash_tree_root();

        assert_eq!(value.clone().cached_root(), Some(root));
    }
}
