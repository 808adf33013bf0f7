//! SHA-256 as used by SSZ Merkleization and seed derivation.

use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> H256 {
    H256(Sha256::digest(bytes).into())
}

/// Hashes the concatenation of two 32-byte chunks without copying them into a buffer.
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    H256(hasher.finalize().into())
}

/// Hashes a 32-byte chunk followed by a little-endian `u64`, as in seed derivation.
#[must_use]
pub fn hash_256_64(chunk: H256, number: u64) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(chunk);
    hasher.update(number.to_le_bytes());
    H256(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn hash_bytes_matches_known_digest() {
        // SHA-256 of the empty string.
        assert_eq!(
            hash_bytes(&[]),
            H256(hex!(
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
            )),
        );
    }

    #[test]
    fn concatenating_hashers_agree_with_hash_bytes() {
        let left = H256::repeat_byte(0xaa);
        let right = H256::repeat_byte(0xbb);

        let mut concatenated = [0; 64];
        concatenated[..32].copy_from_slice(left.as_bytes());
        concatenated[32..].copy_from_slice(right.as_bytes());

        assert_eq!(hash_256_256(left, right), hash_bytes(&concatenated));

        let mut with_number = [0; 40];
        with_number[..32].copy_from_slice(left.as_bytes());
        with_number[32..].copy_from_slice(&42_u64.to_le_bytes());

        assert_eq!(hash_256_64(left, 42), hash_bytes(&with_number));
    }
}
