//! The fork-dispatched state transition.
//!
//! Slot advancement, in-place fork upgrades at activation slots, and block
//! application over the combined (tagged-sum) state and block types.

use anyhow::Result;
use epoch_context::EpochContext;
use execution_engine::{ExecutionEngine, NullExecutionEngine};
use helper_functions::{
    fork,
    verifier::{NullVerifier, SingleVerifier, Verifier},
};
use ssz::SszHash as _;
use types::{
    combined::{BeaconState, SignedBeaconBlock},
    config::Config,
    nonstandard::Phase,
    phase0::primitives::Slot,
    preset::Preset,
};

use crate::{altair, bellatrix, interrupt::Interrupt, phase0, unphased::Error};

/// Whether the post-state root embedded in the block must be checked.
///
/// Skipping it (together with [`NullVerifier`]) is only sound for blocks
/// whose validity was already established, like finalized ones.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

/// Builds the epoch context for a combined state, including sync committee
/// resolution where the fork has one.
pub fn epoch_context<P: Preset>(state: &BeaconState<P>) -> Result<EpochContext<P>> {
    let mut epoch_context = match state {
        BeaconState::Phase0(state) => EpochContext::new(&**state)?,
        BeaconState::Altair(state) => EpochContext::new(&**state)?,
        BeaconState::Bellatrix(state) => EpochContext::new(&**state)?,
    };

    match state {
        BeaconState::Phase0(_) => {}
        BeaconState::Altair(state) => {
            epoch_context.load_sync_committee(state.current_sync_committee.as_ref())?;
        }
        BeaconState::Bellatrix(state) => {
            epoch_context.load_sync_committee(state.current_sync_committee.as_ref())?;
        }
    }

    Ok(epoch_context)
}

/// The full state transition with every check enabled.
pub fn untrusted_state_transition<P: Preset>(
    config: &Config,
    epoch_context: &mut EpochContext<P>,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    engine: &impl ExecutionEngine<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    state_transition(
        config,
        epoch_context,
        state,
        block,
        &mut SingleVerifier,
        StateRootPolicy::Verify,
        engine,
        interrupt,
    )
}

/// Replays a block that is already known to be valid:
/// no signature checks, no state root check, no execution engine.
pub fn trusted_state_transition<P: Preset>(
    config: &Config,
    epoch_context: &mut EpochContext<P>,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    state_transition(
        config,
        epoch_context,
        state,
        block,
        &mut NullVerifier,
        StateRootPolicy::Trust,
        &NullExecutionEngine,
        interrupt,
    )
}

#[allow(clippy::too_many_arguments, reason = "this is the top-level entry point; every parameter is a distinct policy")]
pub fn state_transition<P: Preset>(
    config: &Config,
    epoch_context: &mut EpochContext<P>,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    verifier: &mut impl Verifier,
    state_root_policy: StateRootPolicy,
    engine: &impl ExecutionEngine<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    // > Process slots (including those with no blocks) since block
    // A block for the state's current slot needs no slot processing.
    if state.slot() < block.slot() {
        process_slots(config, epoch_context, state, block.slot(), interrupt)?;
    }

    process_block(config, epoch_context, state, block, verifier, engine, interrupt)?;

    // > Validate state root
    if state_root_policy == StateRootPolicy::Verify {
        let computed = state.hash_tree_root();
        let in_block = match block {
            SignedBeaconBlock::Phase0(block) => block.message.state_root,
            SignedBeaconBlock::Altair(block) => block.message.state_root,
            SignedBeaconBlock::Bellatrix(block) => block.message.state_root,
        };

        anyhow::ensure!(
            computed == in_block,
            Error::StateRootMismatch { computed, in_block },
        );
    }

    Ok(())
}

pub fn process_slots<P: Preset>(
    config: &Config,
    epoch_context: &mut EpochContext<P>,
    state: &mut BeaconState<P>,
    slot: Slot,
    interrupt: &Interrupt,
) -> Result<()> {
    anyhow::ensure!(
        state.slot() < slot,
        Error::SlotNotLater {
            current: state.slot(),
            target: slot,
        },
    );

    while state.slot() < slot {
        advance_slot(config, epoch_context, state, interrupt)?;

        if upgrade_state(config, state)? {
            // Fork upgrades change the registry-derived tables,
            // so the context is rebuilt from scratch.
            *epoch_context = self::epoch_context(state)?;
        }
    }

    Ok(())
}

fn advance_slot<P: Preset>(
    config: &Config,
    epoch_context: &mut EpochContext<P>,
    state: &mut BeaconState<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    match state {
        BeaconState::Phase0(state) => {
            phase0::slot_processing::advance_slot(config, state, epoch_context, interrupt)
        }
        BeaconState::Altair(state) => {
            altair::slot_processing::advance_slot(config, state, epoch_context, interrupt)
        }
        BeaconState::Bellatrix(state) => {
            bellatrix::slot_processing::advance_slot(config, state, epoch_context, interrupt)
        }
    }
}

/// Replaces the state with its successor variant if the new slot is a
/// fork-activation slot. Returns whether an upgrade happened.
fn upgrade_state<P: Preset>(config: &Config, state: &mut BeaconState<P>) -> Result<bool> {
    let slot = state.slot();

    let Some((phase, _)) = config
        .upgrade_slots::<P>()
        .find(|(_, upgrade_slot)| *upgrade_slot == slot)
    else {
        return Ok(false);
    };

    match (phase, &mut *state) {
        (Phase::Altair, BeaconState::Phase0(pre)) => {
            log::info!("upgrading state to {phase} in slot {slot}");
            let pre = core::mem::take(pre).into_value();
            let post = fork::upgrade_to_altair(config, pre)?;
            *state = post.into();
            Ok(true)
        }
        (Phase::Bellatrix, BeaconState::Altair(pre)) => {
            log::info!("upgrading state to {phase} in slot {slot}");
            let pre = core::mem::take(pre).into_value();
            let post = fork::upgrade_to_bellatrix(config, pre);
            *state = post.into();
            Ok(true)
        }
        // The state is already at or past the fork. Nothing to do.
        _ => Ok(false),
    }
}

pub fn process_block<P: Preset>(
    config: &Config,
    epoch_context: &mut EpochContext<P>,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    verifier: &mut impl Verifier,
    engine: &impl ExecutionEngine<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    match (state, block) {
        (BeaconState::Phase0(state), SignedBeaconBlock::Phase0(block)) => {
            phase0::block_processing::process_block(
                config,
                state,
                epoch_context,
                block,
                verifier,
                interrupt,
            )
        }
        (BeaconState::Altair(state), SignedBeaconBlock::Altair(block)) => {
            altair::block_processing::process_block(
                config,
                state,
                epoch_context,
                block,
                verifier,
                interrupt,
            )
        }
        (BeaconState::Bellatrix(state), SignedBeaconBlock::Bellatrix(block)) => {
            bellatrix::block_processing::process_block(
                config,
                state,
                epoch_context,
                block,
                verifier,
                engine,
                interrupt,
            )
        }
        (state, block) => Err(Error::PhaseMismatch {
            state_phase: state.phase(),
            block_phase: block.phase(),
        }
        .into()),
    }
}
