//! The swap-or-not shuffle.
//!
//! Committee assignment shuffles whole index lists at once, which is much
//! faster than computing each position independently. Proposer and sync
//! committee sampling need the position-at-a-time form because their seeds
//! change per slot or per candidate, so both are provided.

use bit_field::BitField as _;
use hashing::hash_bytes;
use types::{phase0::primitives::H256, preset::Preset};

/// `compute_shuffled_index` from the consensus specification:
/// the position `index` maps to after `P::SHUFFLE_ROUND_COUNT` rounds.
#[must_use]
pub fn shuffled_index<P: Preset>(index: u64, index_count: u64, seed: H256) -> u64 {
    assert!(index < index_count);

    let mut index = index;

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = pivot(seed, round) % index_count;
        let flip = (pivot + index_count - index) % index_count;
        let position = index.max(flip);

        let source = hash_source(seed, round, position);
        let byte = source[(position % 256 / 8) as usize];

        if byte.get_bit((position % 8) as usize) {
            index = flip;
        }
    }

    index
}

/// Shuffles `indices` in place so that position `i` ends up holding
/// `indices[shuffled_index(i)]`, the convention committee slicing expects.
pub fn shuffle_slice<P: Preset, T>(indices: &mut [T], seed: H256) {
    let index_count = indices.len() as u64;

    if index_count <= 1 {
        return;
    }

    // Applying the swap rounds in reverse order inverts the per-index
    // permutation, which is exactly the `input[shuffled_index(i)]` order.
    for round in (0..P::SHUFFLE_ROUND_COUNT).rev() {
        let pivot = pivot(seed, round) % index_count;

        // Positions are swapped symmetrically around `(pivot + 1) / 2` and
        // `pivot + 1 + (index_count - pivot - 1) / 2`, never crossing them.
        let mirror = (pivot + 1) / 2;

        for index in 0..mirror {
            let flip = pivot - index;
            let source = hash_source(seed, round, flip);
            let byte = source[(flip % 256 / 8) as usize];

            if byte.get_bit((flip % 8) as usize) {
                indices.swap(index as usize, flip as usize);
            }
        }

        let mirror = (pivot + index_count + 1) / 2;

        for index in pivot + 1..mirror {
            let flip = pivot + index_count - index;
            let source = hash_source(seed, round, flip);
            let byte = source[(flip % 256 / 8) as usize];

            if byte.get_bit((flip % 8) as usize) {
                indices.swap(index as usize, flip as usize);
            }
        }
    }
}

fn pivot(seed: H256, round: u8) -> u64 {
    let mut bytes = [0; 33];
    bytes[..32].copy_from_slice(seed.as_bytes());
    bytes[32] = round;

    let digest = hash_bytes(&bytes);
    u64::from_le_bytes(
        digest.as_bytes()[..8]
            .try_into()
            .expect("the slice is exactly 8 bytes"),
    )
}

fn hash_source(seed: H256, round: u8, position: u64) -> H256 {
    let mut bytes = [0; 37];
    bytes[..32].copy_from_slice(seed.as_bytes());
    bytes[32] = round;
    bytes[33..].copy_from_slice(&u32::try_from(position / 256).expect("position fits in u32").to_le_bytes());

    hash_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use test_case::test_case;
    use types::preset::Minimal;

    use super::*;

    #[test_case(1)]
    #[test_case(8)]
    #[test_case(33)]
    #[test_case(1000)]
    fn shuffle_is_a_permutation(count: u64) {
        let seed = H256::repeat_byte(0x2a);
        let mut indices = (0..count).collect_vec();

        shuffle_slice::<Minimal, _>(&mut indices, seed);

        assert_eq!(indices.iter().copied().sorted().collect_vec(), (0..count).collect_vec());
    }

    #[test]
    fn slice_shuffle_agrees_with_single_index_form() {
        let seed = H256::repeat_byte(0x07);
        let count = 100;

        let mut shuffled = (0..count).collect_vec();
        shuffle_slice::<Minimal, _>(&mut shuffled, seed);

        for position in 0..count {
            let original = shuffled_index::<Minimal>(position, count, seed);
            assert_eq!(shuffled[position as usize], original);
        }
    }

    #[test]
    fn different_seeds_give_different_orders() {
        let mut first = (0_u64..64).collect_vec();
        let mut second = first.clone();

        shuffle_slice::<Minimal, _>(&mut first, H256::repeat_byte(1));
        shuffle_slice::<Minimal, _>(&mut second, H256::repeat_byte(2));

        assert_ne!(first, second);
    }
}
