use anyhow::Result;
use epoch_context::EpochContext;
use types::{bellatrix::beacon_state::BeaconState, config::Config, preset::Preset};

use crate::{altair, interrupt::Interrupt};

pub fn process_epoch<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    epoch_context: &EpochContext<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    // Identical to the altair transition apart from the penalty quotients.
    altair::epoch_processing::process_epoch_with_quotients(
        config,
        state,
        epoch_context,
        P::INACTIVITY_PENALTY_QUOTIENT_BELLATRIX,
        P::PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX,
        interrupt,
    )
}
