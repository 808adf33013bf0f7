use anyhow::Result;
use epoch_context::EpochContext;
use helper_functions::{accessors, misc, verifier::Verifier};
use types::{
    nonstandard::{AttestationEpoch, Phase},
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, PendingAttestation, SignedBeaconBlock},
    },
    preset::Preset,
    traits::BeaconBlock as _,
    traits::BeaconBlockBody as _,
    traits::SignedBeaconBlock as _,
};

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

    process_operations(config, state, epoch_context, body, verifier, interrupt)
}

fn process_operations<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    epoch_context: &mut EpochContext<P>,
    body: &types::phase0::containers::BeaconBlockBody<P>,
    verifier: &mut impl Verifier,
    interrupt: &Interrupt,
) -> Result<()> {
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
            Phase::Phase0,
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
            Phase::Phase0,
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

    Ok(())
}

pub fn process_attestation<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
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

    // Fails unless the target is the previous or current epoch.
    let attestation_epoch = epoch_context.attestation_epoch(data.target.epoch)?;

    anyhow::ensure!(
        data.slot + P::MIN_ATTESTATION_INCLUSION_DELAY <= state.slot
            && state.slot <= data.slot + P::slots_per_epoch(),
        Error::AttestationOutsideInclusionRange {
            state_slot: state.slot,
            attestation_slot: data.slot,
        },
    );

    let justified = match attestation_epoch {
        AttestationEpoch::Current => state.current_justified_checkpoint,
        AttestationEpoch::Previous => state.previous_justified_checkpoint,
    };

    anyhow::ensure!(
        data.source == justified,
        Error::AttestationSourceMismatch {
            justified,
            in_attestation: data.source,
        },
    );

    let committee = epoch_context.beacon_committee(data.slot, data.index)?;

    // > Verify signature
    let indexed_attestation = accessors::get_indexed_attestation(committee, attestation)?;
    helper_functions::predicates::validate_indexed_attestation(
        config,
        state,
        &indexed_attestation,
        verifier,
    )?;

    let pending_attestation = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data,
        inclusion_delay: state.slot - data.slot,
        proposer_index: epoch_context.proposer_index(state.slot)?,
    };

    match attestation_epoch {
        AttestationEpoch::Current => state.current_epoch_attestations.push(pending_attestation)?,
        AttestationEpoch::Previous => {
            state.previous_epoch_attestations.push(pending_attestation)?
        }
    }

    Ok(())
}
