use ssz::{SszHash, H256};
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        containers::{ForkData, SigningData},
        primitives::{DomainType, Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, Version},
    },
    preset::Preset,
};

#[must_use]
pub fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::slots_per_epoch()
}

#[must_use]
pub fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch * P::slots_per_epoch()
}

#[must_use]
pub fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slot % P::slots_per_epoch() == 0
}

/// Earliest epoch a validator entering the activation queue now can be
/// activated in, accounting for the seed lookahead.
#[must_use]
pub fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    epoch + 1 + P::MAX_SEED_LOOKAHEAD
}

/// Number of committees in each slot of an epoch with `active_count`
/// active validators.
#[must_use]
pub fn compute_committee_count<P: Preset>(active_count: u64) -> u64 {
    let per_slot = active_count / P::slots_per_epoch() / P::TARGET_COMMITTEE_SIZE;
    per_slot.clamp(1, P::MAX_COMMITTEES_PER_SLOT)
}

/// `compute_domain`. `fork_version` and `genesis_validators_root` default to
/// the genesis values, which is what deposits use: they must remain valid
/// across forks.
#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> H256 {
    let fork_data_root = ForkData {
        current_version: fork_version.unwrap_or(config.genesis_fork_version),
        genesis_validators_root: genesis_validators_root.unwrap_or_else(H256::zero),
    }
    .hash_tree_root();

    let mut domain = H256::zero();
    domain[..4].copy_from_slice(domain_type.as_bytes());
    domain[4..].copy_from_slice(&fork_data_root.as_bytes()[..28]);
    domain
}

#[must_use]
pub fn compute_signing_root(object: &impl SszHash, domain: H256) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_timestamp_at_slot(config: &Config, genesis_time: UnixSeconds, slot: Slot) -> UnixSeconds {
    genesis_time + (slot - GENESIS_SLOT) * config.seconds_per_slot
}

/// `compute_proposer_index`: hash-over-seed candidate selection weighted by
/// effective balance. `active_indices` must be nonempty.
#[must_use]
pub fn compute_proposer_index<P: Preset, F: Fn(ValidatorIndex) -> Gwei>(
    seed: H256,
    active_indices: &[ValidatorIndex],
    effective_balance: F,
) -> ValidatorIndex {
    assert!(!active_indices.is_empty());

    let total = active_indices.len() as u64;
    let max_random_byte = u64::from(u8::MAX);

    for attempt in 0.. {
        let shuffled = shuffling::shuffled_index::<P>(attempt % total, total, seed);
        let candidate = active_indices[usize::try_from(shuffled).expect("index fits in usize")];

        let random_byte = u64::from(
            hashing::hash_256_64(seed, attempt / 32)[usize::try_from(attempt % 32)
                .expect("index fits in usize")],
        );

        if effective_balance(candidate) * max_random_byte
            >= P::MAX_EFFECTIVE_BALANCE * random_byte
        {
            return candidate;
        }
    }

    unreachable!("the selection loop always terminates: some candidate has a full balance or the random byte eventually falls below the acceptance threshold")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::preset::{Mainnet, Minimal};

    use super::*;

    #[test]
    fn epoch_and_slot_conversions_are_inverse() {
        assert_eq!(compute_epoch_at_slot::<Minimal>(0), 0);
        assert_eq!(compute_epoch_at_slot::<Minimal>(7), 0);
        assert_eq!(compute_epoch_at_slot::<Minimal>(8), 1);
        assert_eq!(compute_start_slot_at_epoch::<Minimal>(1), 8);
        assert!(is_epoch_start::<Minimal>(16));
        assert!(!is_epoch_start::<Minimal>(17));
    }

    #[test_case(0, 4 ; "no validators still gives one committee")]
    #[test_case(32, 4 ; "at target size")]
    #[test_case(1_000_000, 4 ; "capped at the maximum")]
    fn committee_counts_are_clamped(active_count: u64, _max: u64) {
        let count = compute_committee_count::<Minimal>(active_count);
        assert!(1 <= count);
        assert!(count <= Minimal::MAX_COMMITTEES_PER_SLOT);
    }

    #[test]
    fn domains_embed_the_domain_type_and_fork_data() {
        let config = Config::minimal();
        let domain = compute_domain(
            &config,
            types::phase0::consts::DOMAIN_DEPOSIT,
            None,
            None,
        );

        assert_eq!(&domain[..4], [0x03, 0x00, 0x00, 0x00]);
        assert_eq!(
            &domain[4..],
            &types::config::compute_fork_data_root(
                config.genesis_fork_version,
                H256::zero(),
            )[..28],
        );
    }

    #[test]
    fn proposer_selection_prefers_full_balances() {
        let seed = H256::repeat_byte(3);
        let indices = (0..64).collect::<Vec<_>>();

        let full = compute_proposer_index::<Mainnet, _>(seed, &indices, |_| {
            Mainnet::MAX_EFFECTIVE_BALANCE
        });

        // With all balances full the first candidate is always accepted.
        assert_eq!(full, indices[shuffling::shuffled_index::<Mainnet>(0, 64, seed) as usize]);
    }
}
