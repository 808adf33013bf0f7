use anyhow::{ensure, Result};
use epoch_context::EpochContext;
use helper_functions::misc;
use ssz::Hc;
use types::{
    altair::beacon_state::BeaconState, config::Config, phase0::primitives::Slot, preset::Preset,
};

use crate::{interrupt::Interrupt, unphased, unphased::Error};

use super::epoch_processing;

pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut Hc<BeaconState<P>>,
    epoch_context: &mut EpochContext<P>,
    slot: Slot,
    interrupt: &Interrupt,
) -> Result<()> {
    ensure!(
        state.slot < slot,
        Error::SlotNotLater {
            current: state.slot,
            target: slot,
        },
    );

    while state.slot < slot {
        advance_slot(config, state, epoch_context, interrupt)?;
    }

    Ok(())
}

pub(crate) fn advance_slot<P: Preset>(
    config: &Config,
    state: &mut Hc<BeaconState<P>>,
    epoch_context: &mut EpochContext<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    unphased::process_slot(state);

    // > Process epoch on the start slot of the next epoch
    if misc::is_epoch_start::<P>(state.slot + 1) {
        epoch_processing::process_epoch(config, state, epoch_context, interrupt)?;
    }

    state.slot += 1;

    if misc::is_epoch_start::<P>(state.slot) {
        epoch_context.rotate_through_epoch(&**state)?;
        epoch_context.load_sync_committee(state.current_sync_committee.as_ref())?;
    }

    Ok(())
}
