use anyhow::Result;
use epoch_context::EpochContext;
use execution_engine::{ExecutionEngine, PayloadStatus};
use helper_functions::{accessors, misc, verifier::Verifier};
use std_ext::DefaultExt as _;
use types::{
    bellatrix::{
        beacon_state::BeaconState,
        containers::{ExecutionPayload, SignedBeaconBlock},
    },
    config::Config,
    nonstandard::Phase,
    preset::Preset,
    traits::{BeaconBlock as _, PostBellatrixBeaconBlockBody, SignedBeaconBlock as _},
};

use crate::{altair, interrupt::Interrupt, unphased, unphased::Error};

pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    epoch_context: &mut EpochContext<P>,
    block: &SignedBeaconBlock<P>,
    verifier: &mut impl Verifier,
    engine: &impl ExecutionEngine<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    unphased::verify_block_signature(config, state, block, verifier)?;

    let message = block.message();
    let body = message.body();

    unphased::process_block_header(state, epoch_context, message)?;
    unphased::process_randao(config, state, epoch_context, body, verifier)?;
    unphased::process_eth1_data(state, body)?;

    altair::block_processing::process_operations(
        config,
        state,
        epoch_context,
        body,
        verifier,
        interrupt,
        Phase::Bellatrix,
    )?;

    interrupt.check()?;

    // > [New in Bellatrix]
    if is_execution_enabled(state, body) {
        process_execution_payload(config, state, body.execution_payload(), engine)?;
    }

    Ok(())
}

/// The state has a real payload header, or this block carries the
/// first nonempty payload of the merge transition.
#[must_use]
pub fn is_execution_enabled<P: Preset>(
    state: &BeaconState<P>,
    body: &impl PostBellatrixBeaconBlockBody<P>,
) -> bool {
    is_merge_transition_complete(state) || !body.execution_payload().is_default()
}

#[must_use]
pub fn is_merge_transition_complete<P: Preset>(state: &BeaconState<P>) -> bool {
    !state.latest_execution_payload_header.is_default()
}

pub fn process_execution_payload<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    payload: &ExecutionPayload<P>,
    engine: &impl ExecutionEngine<P>,
) -> Result<()> {
    // > Verify consistency of the parent hash with respect to the previous execution payload header
    if is_merge_transition_complete(state) {
        let in_state = state.latest_execution_payload_header.block_hash;

        anyhow::ensure!(
            payload.parent_hash == in_state,
            Error::ExecutionPayloadParentHashMismatch {
                in_state,
                in_payload: payload.parent_hash,
            },
        );
    }

    // > Verify prev_randao
    let in_state = accessors::get_randao_mix(state, accessors::get_current_epoch(state));

    anyhow::ensure!(
        payload.prev_randao == in_state,
        Error::ExecutionPayloadPrevRandaoMismatch {
            in_state,
            in_payload: payload.prev_randao,
        },
    );

    // > Verify timestamp
    let computed = misc::compute_timestamp_at_slot(config, state.genesis_time, state.slot);

    anyhow::ensure!(
        payload.timestamp == computed,
        Error::ExecutionPayloadTimestampMismatch {
            computed,
            in_payload: payload.timestamp,
        },
    );

    // > Verify the execution payload is valid
    // An optimistic verdict is accepted; fork choice is responsible for
    // reverting if the execution layer later invalidates the block.
    let status = engine.notify_new_payload(payload)?;

    anyhow::ensure!(
        status != PayloadStatus::Invalid,
        Error::ExecutionPayloadInvalid,
    );

    // > Cache execution payload header
    state.latest_execution_payload_header = payload.to_header();

    Ok(())
}
