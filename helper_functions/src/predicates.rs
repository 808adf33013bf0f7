use anyhow::Result;
use itertools::Itertools as _;
use types::{
    altair::primitives::ParticipationFlags,
    config::Config,
    phase0::{
        consts::{DOMAIN_BEACON_ATTESTER, FAR_FUTURE_EPOCH},
        containers::{AttestationData, IndexedAttestation, Validator},
        primitives::{Epoch, H256},
    },
    preset::Preset,
    traits::BeaconState,
};

use crate::{
    accessors, error::Error, misc,
    verifier::{SignatureKind, Verifier},
};

#[must_use]
pub fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

/// Eligibility to join the activation queue,
/// checked during epoch-boundary registry updates.
#[must_use]
pub fn is_eligible_for_activation_queue<P: Preset>(validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
}

#[must_use]
pub fn is_eligible_for_activation<P: Preset>(
    state: &impl BeaconState<P>,
    validator: &Validator,
) -> bool {
    validator.activation_eligibility_epoch <= state.finalized_checkpoint().epoch
        && validator.activation_epoch == FAR_FUTURE_EPOCH
}

#[must_use]
pub fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch <= epoch
        && epoch < validator.withdrawable_epoch
}

/// Double vote or surround vote.
#[must_use]
pub fn is_slashable_attestation_data(data_1: &AttestationData, data_2: &AttestationData) -> bool {
    let double_vote = data_1 != data_2 && data_1.target.epoch == data_2.target.epoch;
    let surround_vote = data_1.source.epoch < data_2.source.epoch
        && data_2.target.epoch < data_1.target.epoch;

    double_vote || surround_vote
}

#[must_use]
pub const fn has_flag(flags: ParticipationFlags, flag: ParticipationFlags) -> bool {
    flags & flag == flag
}

#[must_use]
pub fn is_in_inactivity_leak<P: Preset>(state: &impl BeaconState<P>) -> bool {
    let previous_epoch = accessors::get_previous_epoch(state);
    let finality_delay = previous_epoch - state.finalized_checkpoint().epoch;

    finality_delay > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY
}

#[must_use]
pub fn is_valid_merkle_branch(
    leaf: H256,
    branch: impl IntoIterator<Item = H256>,
    depth: u64,
    index: u64,
    root: H256,
) -> bool {
    let mut node = leaf;

    for (height, sibling) in branch.into_iter().enumerate().take(
        usize::try_from(depth).expect("merkle branch depths fit in usize"),
    ) {
        if index >> height & 1 == 1 {
            node = hashing::hash_256_256(sibling, node);
        } else {
            node = hashing::hash_256_256(node, sibling);
        }
    }

    node == root
}

/// Structural and cryptographic validation of an indexed attestation.
/// The signature check goes through `verifier`, so it can be skipped
/// for trusted blocks.
pub fn validate_indexed_attestation<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    indexed_attestation: &IndexedAttestation<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    anyhow::ensure!(
        !indices.is_empty()
            && indices
                .iter()
                .tuple_windows()
                .all(|(first, second)| first < second),
        Error::AttestingIndicesNotSortedAndUnique,
    );

    let domain = accessors::get_domain(
        config,
        state,
        DOMAIN_BEACON_ATTESTER,
        Some(indexed_attestation.data.target.epoch),
    );
    let signing_root = misc::compute_signing_root(&indexed_attestation.data, domain);

    let mut public_keys = Vec::with_capacity(indices.len());

    for validator_index in indices {
        let validator = state.validators().get(*validator_index).map_err(|_| {
            Error::ValidatorIndexOutOfBounds {
                validator_index: *validator_index,
            }
        })?;

        public_keys.push(&validator.pubkey);
    }

    verifier.verify_aggregate(
        signing_root,
        indexed_attestation.signature,
        public_keys,
        SignatureKind::Attestation,
    )
}

#[cfg(test)]
mod tests {
    use types::phase0::containers::Checkpoint;

    use super::*;

    fn validator_active_between(activation_epoch: Epoch, exit_epoch: Epoch) -> Validator {
        Validator {
            activation_epoch,
            exit_epoch,
            withdrawable_epoch: exit_epoch.saturating_add(256),
            ..Validator::default()
        }
    }

    #[test]
    fn activity_is_a_half_open_interval() {
        let validator = validator_active_between(2, 10);

        assert!(!is_active_validator(&validator, 1));
        assert!(is_active_validator(&validator, 2));
        assert!(is_active_validator(&validator, 9));
        assert!(!is_active_validator(&validator, 10));
    }

    #[test]
    fn surround_and_double_votes_are_slashable() {
        let checkpoint = |epoch| Checkpoint {
            epoch,
            ..Checkpoint::default()
        };

        let vote = |source, target, root: u8| AttestationData {
            source: checkpoint(source),
            target: checkpoint(target),
            beacon_block_root: H256::repeat_byte(root),
            ..AttestationData::default()
        };

        // Same target, different data.
        assert!(is_slashable_attestation_data(&vote(0, 4, 1), &vote(0, 4, 2)));
        // Surround vote.
        assert!(is_slashable_attestation_data(&vote(0, 5, 1), &vote(1, 4, 1)));
        // Identical votes and disjoint epochs are fine.
        assert!(!is_slashable_attestation_data(&vote(0, 4, 1), &vote(0, 4, 1)));
        assert!(!is_slashable_attestation_data(&vote(0, 4, 1), &vote(4, 5, 1)));
    }

    #[test]
    fn merkle_branch_verification_recomputes_the_root() {
        let leaf = H256::repeat_byte(1);
        let sibling = H256::repeat_byte(2);
        let uncle = H256::repeat_byte(3);

        // Leaf at index 1 of a depth-2 tree.
        let parent = hashing::hash_256_256(sibling, leaf);
        let root = hashing::hash_256_256(parent, uncle);

        assert!(is_valid_merkle_branch(leaf, [sibling, uncle], 2, 1, root));
        assert!(!is_valid_merkle_branch(leaf, [sibling, uncle], 2, 0, root));
        assert!(!is_valid_merkle_branch(leaf, [uncle, sibling], 2, 1, root));
    }
}
