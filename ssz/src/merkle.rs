//! Merkleization primitives shared by all SSZ types.

use arithmetic::UsizeExt as _;
use ethereum_types::H256;
use hashing::hash_256_256;
use once_cell::sync::Lazy;

pub const BYTES_PER_CHUNK: usize = 32;

/// Deep enough for every collection in the consensus types,
/// including the validator registry with its limit of 2⁴⁰.
const MAX_DEPTH: usize = 64;

/// `ZERO_SUBTREE_ROOTS[depth]` is the root of an all-zero subtree of the given depth.
static ZERO_SUBTREE_ROOTS: Lazy<[H256; MAX_DEPTH]> = Lazy::new(|| {
    let mut roots = [H256::zero(); MAX_DEPTH];
    for depth in 1..MAX_DEPTH {
        roots[depth] = hash_256_256(roots[depth - 1], roots[depth - 1]);
    }
    roots
});

#[must_use]
pub fn zero_subtree_root(depth: u8) -> H256 {
    ZERO_SUBTREE_ROOTS[usize::from(depth)]
}

/// Root of the Merkle tree of the given depth whose leftmost leaves are
/// `chunks` and whose remaining leaves are zero.
#[must_use]
pub fn merkleize_chunks(chunks: &[H256], depth: u8) -> H256 {
    if depth == 0 {
        return chunks.first().copied().unwrap_or_else(H256::zero);
    }

    if chunks.is_empty() {
        return zero_subtree_root(depth);
    }

    let half = 1_usize << (depth - 1);

    if chunks.len() <= half {
        hash_256_256(
            merkleize_chunks(chunks, depth - 1),
            zero_subtree_root(depth - 1),
        )
    } else {
        let (left, right) = chunks.split_at(half);
        hash_256_256(
            merkleize_chunks(left, depth - 1),
            merkleize_chunks(right, depth - 1),
        )
    }
}

/// Like [`merkleize_chunks`], but with leaves formed by
/// splitting `bytes` into zero-padded 32-byte chunks.
#[must_use]
pub fn merkleize_bytes(bytes: &[u8], depth: u8) -> H256 {
    let chunks = bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|chunk| {
            let mut padded = H256::zero();
            padded[..chunk.len()].copy_from_slice(chunk);
            padded
        })
        .collect::<Vec<_>>();

    merkleize_chunks(&chunks, depth)
}

/// The length mix-in hashes the root against the length as a full 256-bit
/// little-endian chunk, not as a bare `u64`.
#[must_use]
pub fn mix_in_length(root: H256, length: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk[..8].copy_from_slice(&length.to_le_bytes());
    hash_256_256(root, chunk)
}

#[must_use]
pub fn chunk_count_for_bytes(byte_count: usize) -> usize {
    byte_count.div_round_up(BYTES_PER_CHUNK)
}

#[cfg(test)]
mod tests {
    use hashing::hash_256_256;

    use super::*;

    #[test]
    fn merkleize_chunks_pads_with_zero_subtrees() {
        let chunk = H256::repeat_byte(1);

        assert_eq!(merkleize_chunks(&[], 0), H256::zero());
        assert_eq!(merkleize_chunks(&[chunk], 0), chunk);
        assert_eq!(
            merkleize_chunks(&[chunk], 1),
            hash_256_256(chunk, H256::zero()),
        );
        assert_eq!(
            merkleize_chunks(&[chunk], 2),
            hash_256_256(
                hash_256_256(chunk, H256::zero()),
                hash_256_256(H256::zero(), H256::zero()),
            ),
        );
    }

    #[test]
    fn merkleize_chunks_agrees_with_explicit_tree() {
        let chunks = [
            H256::repeat_byte(1),
            H256::repeat_byte(2),
            H256::repeat_byte(3),
        ];

        let expected = hash_256_256(
            hash_256_256(chunks[0], chunks[1]),
            hash_256_256(chunks[2], H256::zero()),
        );

        assert_eq!(merkleize_chunks(&chunks, 2), expected);
    }

    #[test]
    fn merkleize_bytes_pads_the_final_chunk() {
        let root = merkleize_bytes(&[0xff; 40], 1);

        let mut second = H256::zero();
        second[..8].copy_from_slice(&[0xff; 8]);

        assert_eq!(root, hash_256_256(H256::repeat_byte(0xff), second));
    }
}
