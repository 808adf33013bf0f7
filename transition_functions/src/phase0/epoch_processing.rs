use anyhow::Result;
use epoch_context::EpochContext;
use helper_functions::{accessors, mutators};
use types::{
    config::Config,
    phase0::{beacon_state::BeaconState, consts::GENESIS_EPOCH},
    preset::Preset,
};

use crate::{
    interrupt::Interrupt,
    phase0::epoch_intermediates,
    unphased,
};

pub fn process_epoch<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    epoch_context: &EpochContext<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    interrupt.check()?;

    let current_epoch = accessors::get_current_epoch(state);
    let previous_epoch = accessors::get_previous_epoch(state);

    let (statuses, statistics) = epoch_intermediates::statistics(state, epoch_context)?;

    // > Skip if `current_epoch` is the epoch right after `GENESIS_EPOCH`:
    // > the previous epoch has no checkpoint to justify yet.
    if current_epoch > GENESIS_EPOCH + 1 {
        unphased::weigh_justification_and_finalization(
            state,
            statistics.total_active_balance,
            statistics.previous_epoch_target_balance,
            statistics.current_epoch_target_balance,
        )?;
    }

    interrupt.check()?;

    if current_epoch > GENESIS_EPOCH {
        let deltas = epoch_intermediates::attestation_deltas::<P>(
            &statuses,
            statistics,
            previous_epoch,
            state.finalized_checkpoint.epoch,
            interrupt,
        )?;

        apply_deltas(state, &deltas)?;
    }

    interrupt.check()?;

    unphased::process_registry_updates(config, state)?;

    interrupt.check()?;

    unphased::process_slashings(
        state,
        P::PROPORTIONAL_SLASHING_MULTIPLIER,
        statistics.total_active_balance,
    )?;

    interrupt.check()?;

    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state)?;
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;

    // > Rotate current/previous epoch attestations
    state.previous_epoch_attestations =
        core::mem::take(&mut state.current_epoch_attestations);

    Ok(())
}

fn apply_deltas<P: Preset>(
    state: &mut BeaconState<P>,
    deltas: &epoch_intermediates::Deltas,
) -> Result<()> {
    for (validator_index, (reward, penalty)) in deltas
        .rewards
        .iter()
        .zip(&deltas.penalties)
        .enumerate()
    {
        let balance = mutators::balance(state, validator_index as u64)?;
        mutators::increase_balance(balance, *reward);
        mutators::decrease_balance(balance, *penalty);
    }

    Ok(())
}
