use std::sync::Arc;

use anyhow::Result;
use integer_sqrt::IntegerSquareRoot as _;
use itertools::Itertools as _;
use ssz::BitList;
use try_from_iterator::TryFromIterator as _;
use typenum::Unsigned as _;
use types::{
    altair::{
        consts::{DOMAIN_SYNC_COMMITTEE, TIMELY_HEAD_FLAG, TIMELY_SOURCE_FLAG, TIMELY_TARGET_FLAG},
        containers::SyncCommittee,
        primitives::ParticipationFlags,
    },
    config::Config,
    phase0::{
        consts::GENESIS_EPOCH,
        containers::{AttestationData, Checkpoint, IndexedAttestation},
        primitives::{
            CommitteeIndex, DomainType, Epoch, Gwei, Slot, ValidatorIndex, H256,
        },
    },
    preset::Preset,
    traits::BeaconState,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_current_epoch<P: Preset>(state: &impl BeaconState<P>) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot())
}

/// The current epoch at genesis, where there is no previous epoch yet.
#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &impl BeaconState<P>) -> Epoch {
    let current_epoch = get_current_epoch(state);

    if current_epoch == GENESIS_EPOCH {
        GENESIS_EPOCH
    } else {
        current_epoch - 1
    }
}

pub fn get_block_root<P: Preset>(state: &impl BeaconState<P>, epoch: Epoch) -> Result<H256> {
    get_block_root_at_slot(state, misc::compute_start_slot_at_epoch::<P>(epoch))
}

pub fn get_block_root_at_slot<P: Preset>(state: &impl BeaconState<P>, slot: Slot) -> Result<H256> {
    anyhow::ensure!(
        slot < state.slot() && state.slot() <= slot + P::SlotsPerHistoricalRoot::U64,
        Error::SlotOutOfRange { slot },
    );

    Ok(*state.block_roots().mod_index(slot))
}

/// Root of the most recently processed block.
///
/// `latest_block_header.state_root` is zero between block and slot
/// processing; it must be filled in before hashing the header or the root
/// would not commit to the post-state.
#[must_use]
pub fn latest_block_root<P: Preset>(state: &impl BeaconState<P>) -> H256 {
    use ssz::SszHash as _;

    let mut header = state.latest_block_header();

    if header.state_root.is_zero() {
        header.state_root = state.hash_tree_root();
    }

    header.hash_tree_root()
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &impl BeaconState<P>, epoch: Epoch) -> H256 {
    *state.randao_mixes().mod_index(epoch)
}

/// Seed for duties of `epoch`, mixing in randomness that was fixed
/// `MIN_SEED_LOOKAHEAD` epochs before the epoch started.
#[must_use]
pub fn get_seed<P: Preset>(
    state: &impl BeaconState<P>,
    epoch: Epoch,
    domain_type: DomainType,
) -> H256 {
    let lookahead_epoch =
        epoch + P::EpochsPerHistoricalVector::U64 - P::MIN_SEED_LOOKAHEAD - 1;
    let mix = get_randao_mix(state, lookahead_epoch);

    let mut bytes = [0; 44];
    bytes[..4].copy_from_slice(domain_type.as_bytes());
    bytes[4..12].copy_from_slice(&epoch.to_le_bytes());
    bytes[12..].copy_from_slice(mix.as_bytes());

    hashing::hash_bytes(&bytes)
}

#[must_use]
pub fn get_active_validator_indices<P: Preset>(
    state: &impl BeaconState<P>,
    epoch: Epoch,
) -> Vec<ValidatorIndex> {
    state
        .validators()
        .iter()
        .zip(0..)
        .filter(|(validator, _)| predicates::is_active_validator(validator, epoch))
        .map(|(_, validator_index)| validator_index)
        .collect()
}

#[must_use]
pub fn get_validator_churn_limit(config: &Config, active_count: u64) -> u64 {
    config
        .min_per_epoch_churn_limit
        .max(active_count / config.churn_limit_quotient)
}

/// Total effective balance of the given validators,
/// floored at one effective balance increment.
pub fn get_total_balance<P: Preset>(
    state: &impl BeaconState<P>,
    validator_indices: impl IntoIterator<Item = ValidatorIndex>,
) -> Result<Gwei> {
    let mut total = 0;

    for validator_index in validator_indices {
        total += state
            .validators()
            .get(validator_index)
            .map_err(|_| Error::ValidatorIndexOutOfBounds { validator_index })?
            .effective_balance;
    }

    Ok(total.max(P::EFFECTIVE_BALANCE_INCREMENT))
}

pub fn get_total_active_balance<P: Preset>(state: &impl BeaconState<P>) -> Result<Gwei> {
    let current_epoch = get_current_epoch(state);
    get_total_balance(state, get_active_validator_indices(state, current_epoch))
}

/// Signing domain for messages of `epoch`, defaulting to the current epoch.
#[must_use]
pub fn get_domain<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    domain_type: DomainType,
    epoch: Option<Epoch>,
) -> H256 {
    let epoch = epoch.unwrap_or_else(|| get_current_epoch(state));
    let fork = state.fork();

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    misc::compute_domain(
        config,
        domain_type,
        Some(fork_version),
        Some(state.genesis_validators_root()),
    )
}

/// Participation flags earned by an attestation included
/// `inclusion_delay` slots after its own slot.
pub fn get_attestation_participation_flags<P: Preset>(
    state: &impl BeaconState<P>,
    data: AttestationData,
    inclusion_delay: u64,
) -> Result<ParticipationFlags> {
    let justified_checkpoint = if data.target.epoch == get_current_epoch(state) {
        state.current_justified_checkpoint()
    } else {
        state.previous_justified_checkpoint()
    };

    let is_matching_source = data.source == justified_checkpoint;
    let is_matching_target =
        is_matching_source && data.target.root == get_block_root(state, data.target.epoch)?;
    let is_matching_head = is_matching_target
        && data.beacon_block_root == get_block_root_at_slot(state, data.slot)?;

    anyhow::ensure!(
        is_matching_source,
        Error::SourceMismatch {
            in_attestation: data.source,
            justified: justified_checkpoint,
        },
    );

    let mut flags = 0;

    if is_matching_source && inclusion_delay <= P::slots_per_epoch().integer_sqrt() {
        flags |= TIMELY_SOURCE_FLAG;
    }

    if is_matching_target && inclusion_delay <= P::slots_per_epoch() {
        flags |= TIMELY_TARGET_FLAG;
    }

    if is_matching_head && inclusion_delay == P::MIN_ATTESTATION_INCLUSION_DELAY {
        flags |= TIMELY_HEAD_FLAG;
    }

    Ok(flags)
}

/// Indices of the committee members whose aggregation bits are set,
/// in ascending order.
pub fn get_attesting_indices<P: Preset>(
    committee: &[ValidatorIndex],
    aggregation_bits: &BitList<P::MaxValidatorsPerCommittee>,
) -> Result<Vec<ValidatorIndex>> {
    anyhow::ensure!(
        aggregation_bits.len() == committee.len(),
        Error::CommitteeSizeMismatch {
            bits: aggregation_bits.len(),
            committee_size: committee.len(),
        },
    );

    Ok(committee
        .iter()
        .copied()
        .zip(aggregation_bits.iter())
        .filter(|(_, bit)| *bit)
        .map(|(validator_index, _)| validator_index)
        .sorted_unstable()
        .collect())
}

pub fn get_indexed_attestation<P: Preset>(
    committee: &[ValidatorIndex],
    attestation: &types::phase0::containers::Attestation<P>,
) -> Result<IndexedAttestation<P>> {
    let attesting_indices = get_attesting_indices::<P>(committee, &attestation.aggregation_bits)?;

    Ok(IndexedAttestation {
        attesting_indices: ssz::ContiguousList::try_from_iter(attesting_indices)?,
        data: attestation.data,
        signature: attestation.signature,
    })
}

/// Committees of `slot`, computed directly from the state.
///
/// This recomputes the epoch's shuffling on every call. The epoch context
/// caches committees for the transition hot path; this form exists for the
/// fork upgrade, which needs committees before a context can be built.
pub fn beacon_committee<P: Preset>(
    state: &impl BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);
    let seed = get_seed(state, epoch, types::phase0::consts::DOMAIN_BEACON_ATTESTER);

    let mut shuffled = get_active_validator_indices(state, epoch);
    shuffling::shuffle_slice::<P, _>(&mut shuffled, seed);

    let committees_per_slot = misc::compute_committee_count::<P>(shuffled.len() as u64);

    anyhow::ensure!(
        committee_index < committees_per_slot,
        Error::EpochOutOfRange { epoch },
    );

    let committees_per_epoch = committees_per_slot * P::slots_per_epoch();
    let global_index = slot % P::slots_per_epoch() * committees_per_slot + committee_index;

    let start = shuffled.len() as u64 * global_index / committees_per_epoch;
    let end = shuffled.len() as u64 * (global_index + 1) / committees_per_epoch;

    Ok(shuffled[usize::try_from(start).expect("committee bounds fit in usize")
        ..usize::try_from(end).expect("committee bounds fit in usize")]
        .to_vec())
}

/// Derives the sync committee that becomes active in the next sync committee
/// period: effective-balance-weighted sampling with repetition, followed by
/// pubkey aggregation.
pub fn get_next_sync_committee<P: Preset>(
    state: &impl BeaconState<P>,
) -> Result<Arc<SyncCommittee<P>>> {
    let epoch = get_current_epoch(state) + 1;
    let active_indices = get_active_validator_indices(state, epoch);

    anyhow::ensure!(!active_indices.is_empty(), Error::NoActiveValidators);

    let seed = get_seed(state, epoch, DOMAIN_SYNC_COMMITTEE);
    let total = active_indices.len() as u64;
    let max_random_byte = u64::from(u8::MAX);

    let mut pubkeys = Vec::with_capacity(P::SyncCommitteeSize::USIZE);
    let mut attempt = 0;

    while pubkeys.len() < P::SyncCommitteeSize::USIZE {
        let shuffled = shuffling::shuffled_index::<P>(attempt % total, total, seed);
        let candidate =
            active_indices[usize::try_from(shuffled).expect("index fits in usize")];

        let random_byte = u64::from(
            hashing::hash_256_64(seed, attempt / 32)
                [usize::try_from(attempt % 32).expect("index fits in usize")],
        );

        let validator = state
            .validators()
            .get(candidate)
            .map_err(|_| Error::ValidatorIndexOutOfBounds {
                validator_index: candidate,
            })?;

        if validator.effective_balance * max_random_byte >= P::MAX_EFFECTIVE_BALANCE * random_byte
        {
            pubkeys.push(validator.pubkey.clone());
        }

        attempt += 1;
    }

    let decompressed = pubkeys
        .iter()
        .map(bls::CachedPublicKey::decompress)
        .collect::<Result<Vec<_>, _>>()?;

    let aggregate_pubkey = bls::AggregatePublicKey::aggregate(decompressed.iter().copied())?
        .to_public_key()
        .to_bytes();

    Ok(Arc::new(SyncCommittee {
        pubkeys: ssz::ContiguousVector::try_from_iter(
            pubkeys.iter().map(bls::CachedPublicKey::to_bytes),
        )?,
        aggregate_pubkey,
    }))
}

/// Checkpoint naming the first block of `epoch`'s chain tip.
pub fn epoch_boundary_checkpoint<P: Preset>(
    state: &impl BeaconState<P>,
    epoch: Epoch,
) -> Result<Checkpoint> {
    let root = if misc::compute_start_slot_at_epoch::<P>(epoch) == state.slot() {
        latest_block_root(state)
    } else {
        get_block_root(state, epoch)?
    };

    Ok(Checkpoint { epoch, root })
}
