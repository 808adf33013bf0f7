use anyhow::Result;
use core::ops::BitOrAssign as _;
use epoch_context::EpochContext;
use helper_functions::{
    accessors, misc, mutators, predicates,
    verifier::{SignatureKind, Verifier},
};
use typenum::Unsigned as _;
use types::{
    altair::{
        beacon_state::BeaconState,
        consts::{
            DOMAIN_SYNC_COMMITTEE, PARTICIPATION_FLAG_WEIGHTS, PROPOSER_WEIGHT,
            SYNC_REWARD_WEIGHT, WEIGHT_DENOMINATOR,
        },
        containers::{SignedBeaconBlock, SyncAggregate},
    },
    config::Config,
    nonstandard::{AttestationEpoch, Phase},
    phase0::{containers::Attestation, primitives::Gwei},
    preset::Preset,
    traits::{
        BeaconBlock as _, BeaconState as _, PostAltairBeaconBlockBody, PostAltairBeaconState,
        SignedBeaconBlock as _,
    },
};

use bls::SignatureBytes;

use crate::{interrupt::Interrupt, unphased, unphased::Error};

pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    epoch_context: &mut EpochContext<P>,
    block: &SignedBeaconBlock<P>,
    verifier: &mut impl Verifier,
    interrupt: &Interrupt,
) -> Result<()> {
    unphased::verify_block_signature(config, state, block, verifier)?;

    let message = block.message();
    let body = message.body();

    unphased::process_block_header(state, epoch_context, message)?;
    unphased::process_randao(config, state, epoch_context, body, verifier)?;
    unphased::process_eth1_data(state, body)?;

    process_operations(config, state, epoch_context, body, verifier, interrupt, Phase::Altair)
}

/// Shared by altair and bellatrix blocks; the phase decides slashing math.
pub(crate) fn process_operations<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    epoch_context: &mut EpochContext<P>,
    body: &impl PostAltairBeaconBlockBody<P>,
    verifier: &mut impl Verifier,
    interrupt: &Interrupt,
    phase: Phase,
) -> Result<()> {
    use types::traits::BeaconBlockBody as _;

    // > Verify that outstanding deposits are processed up to the maximum number of deposits
    unphased::validate_deposit_count(state, body.deposits().len())?;

    for proposer_slashing in body.proposer_slashings() {
        interrupt.check()?;
        unphased::process_proposer_slashing(
            config,
            state,
            epoch_context,
            proposer_slashing,
            verifier,
            phase,
        )?;
    }

    for attester_slashing in body.attester_slashings() {
        interrupt.check()?;
        unphased::process_attester_slashing(
            config,
            state,
            epoch_context,
            attester_slashing,
            verifier,
            phase,
        )?;
    }

    for attestation in body.attestations() {
        interrupt.check()?;
        process_attestation(config, state, epoch_context, attestation, verifier)?;
    }

    for deposit in body.deposits() {
        interrupt.check()?;
        unphased::process_deposit(config, state, epoch_context, deposit)?;
    }

    for voluntary_exit in body.voluntary_exits() {
        interrupt.check()?;
        unphased::process_voluntary_exit(config, state, voluntary_exit, verifier)?;
    }

    interrupt.check()?;

    process_sync_aggregate(config, state, epoch_context, body.sync_aggregate(), verifier)
}

/// Updates participation flags and pays the proposer for the flags it is
/// the first to include.
pub fn process_attestation<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    epoch_context: &EpochContext<P>,
    attestation: &Attestation<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let data = attestation.data;

    anyhow::ensure!(
        data.target.epoch == misc::compute_epoch_at_slot::<P>(data.slot),
        Error::AttestationTargetsWrongEpoch {
            slot: data.slot,
            target_epoch: data.target.epoch,
        },
    );

    let attestation_epoch = epoch_context.attestation_epoch(data.target.epoch)?;

    anyhow::ensure!(
        data.slot + P::MIN_ATTESTATION_INCLUSION_DELAY <= state.slot()
            && state.slot() <= data.slot + P::slots_per_epoch(),
        Error::AttestationOutsideInclusionRange {
            state_slot: state.slot(),
            attestation_slot: data.slot,
        },
    );

    let inclusion_delay = state.slot() - data.slot;

    // Also checks that the source matches the justified checkpoint.
    let participation_flags =
        accessors::get_attestation_participation_flags(state, data, inclusion_delay)?;

    let committee = epoch_context.beacon_committee(data.slot, data.index)?;

    // > Verify signature
    let indexed_attestation = accessors::get_indexed_attestation(committee, attestation)?;
    predicates::validate_indexed_attestation(config, state, &indexed_attestation, verifier)?;

    // > Update epoch participation flags
    let base_reward_per_increment =
        unphased::base_reward_per_increment::<P>(epoch_context.total_active_balance_sqrt());

    let mut proposer_reward_numerator = 0;

    for validator_index in &indexed_attestation.attesting_indices {
        let effective_balance = state
            .validators()
            .get(*validator_index)?
            .effective_balance;

        let participation = match attestation_epoch {
            AttestationEpoch::Previous => state.previous_epoch_participation_mut(),
            AttestationEpoch::Current => state.current_epoch_participation_mut(),
        };

        let flags = participation.get_mut(*validator_index)?;

        for (flag, weight) in PARTICIPATION_FLAG_WEIGHTS {
            if predicates::has_flag(participation_flags, flag)
                && !predicates::has_flag(*flags, flag)
            {
                flags.bitor_assign(flag);

                let increments = effective_balance / P::EFFECTIVE_BALANCE_INCREMENT;
                proposer_reward_numerator += increments * base_reward_per_increment * weight;
            }
        }
    }

    // > Reward proposer
    let proposer_reward_denominator =
        (WEIGHT_DENOMINATOR - PROPOSER_WEIGHT) * WEIGHT_DENOMINATOR / PROPOSER_WEIGHT;
    let proposer_reward = proposer_reward_numerator / proposer_reward_denominator;

    let proposer_index = epoch_context.proposer_index(state.slot())?;
    mutators::increase_balance(mutators::balance(state, proposer_index)?, proposer_reward);

    Ok(())
}

/// Verifies the aggregated signature over the previous slot's block root and
/// settles the symmetric participation rewards.
pub fn process_sync_aggregate<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    epoch_context: &EpochContext<P>,
    sync_aggregate: &SyncAggregate<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let SyncAggregate {
        sync_committee_bits,
        sync_committee_signature,
    } = sync_aggregate;

    let committee_indices = epoch_context.current_sync_committee_indices()?.to_vec();

    // > Verify sync committee aggregate signature signing over the previous slot block root
    let previous_slot = state.slot().max(1) - 1;
    let block_root = accessors::get_block_root_at_slot(state, previous_slot)?;

    let domain = accessors::get_domain(
        config,
        state,
        DOMAIN_SYNC_COMMITTEE,
        Some(misc::compute_epoch_at_slot::<P>(previous_slot)),
    );
    let signing_root = misc::compute_signing_root(&block_root, domain);

    let no_participants = sync_committee_bits.count_ones() == 0;

    // An aggregate with no participants carries the point at infinity,
    // which no set of public keys can verify against.
    if !(no_participants && *sync_committee_signature == SignatureBytes::empty()) {
        let mut participant_pubkeys = Vec::with_capacity(sync_committee_bits.count_ones());

        for (participant_index, bit) in committee_indices.iter().zip(sync_committee_bits.iter()) {
            if bit {
                participant_pubkeys.push(
                    &state.validators().get(*participant_index)?.pubkey,
                );
            }
        }

        verifier.verify_aggregate(
            signing_root,
            *sync_committee_signature,
            participant_pubkeys,
            SignatureKind::SyncAggregate,
        )?;
    }

    // > Compute participant and proposer rewards
    let total_active_increments =
        epoch_context.total_active_balance() / P::EFFECTIVE_BALANCE_INCREMENT;
    let total_base_rewards =
        unphased::base_reward_per_increment::<P>(epoch_context.total_active_balance_sqrt())
            * total_active_increments;
    let max_participant_rewards =
        total_base_rewards * SYNC_REWARD_WEIGHT / WEIGHT_DENOMINATOR / P::slots_per_epoch();
    let participant_reward = max_participant_rewards / P::SyncCommitteeSize::U64;
    let proposer_reward =
        participant_reward * PROPOSER_WEIGHT / (WEIGHT_DENOMINATOR - PROPOSER_WEIGHT);

    // > Apply participant and proposer rewards
    let proposer_index = epoch_context.proposer_index(state.slot())?;
    let mut total_proposer_reward: Gwei = 0;

    for (participant_index, bit) in committee_indices.iter().zip(sync_committee_bits.iter()) {
        if bit {
            mutators::increase_balance(
                mutators::balance(state, *participant_index)?,
                participant_reward,
            );
            total_proposer_reward += proposer_reward;
        } else {
            mutators::decrease_balance(
                mutators::balance(state, *participant_index)?,
                participant_reward,
            );
        }
    }

    mutators::increase_balance(
        mutators::balance(state, proposer_index)?,
        total_proposer_reward,
    );

    Ok(())
}
