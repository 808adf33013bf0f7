use anyhow::Result;
use epoch_context::EpochContext;
use helper_functions::{accessors, mutators, predicates};
use ssz::PersistentList;
use std_ext::ArcExt as _;
use types::{
    altair::{
        beacon_state::BeaconState,
        consts::{
            TIMELY_HEAD_FLAG, TIMELY_HEAD_WEIGHT, TIMELY_SOURCE_FLAG, TIMELY_SOURCE_WEIGHT,
            TIMELY_TARGET_FLAG, TIMELY_TARGET_WEIGHT,
        },
    },
    config::Config,
    phase0::consts::GENESIS_EPOCH,
    preset::Preset,
    traits::{BeaconState as _, PostAltairBeaconState},
};

use crate::{
    altair::epoch_intermediates::{self, AttesterData, Deltas},
    interrupt::Interrupt,
    unphased,
};

pub fn process_epoch<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    epoch_context: &EpochContext<P>,
    interrupt: &Interrupt,
) -> Result<()> {
    process_epoch_with_quotients(
        config,
        state,
        epoch_context,
        P::INACTIVITY_PENALTY_QUOTIENT_ALTAIR,
        P::PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR,
        interrupt,
    )
}

/// Bellatrix re-runs the altair epoch transition with harsher quotients.
pub(crate) fn process_epoch_with_quotients<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    epoch_context: &EpochContext<P>,
    inactivity_penalty_quotient: u64,
    proportional_slashing_multiplier: u64,
    interrupt: &Interrupt,
) -> Result<()> {
    interrupt.check()?;

    let current_epoch = accessors::get_current_epoch(state);
    let data = epoch_intermediates::attester_data(state);
    let statistics = epoch_intermediates::statistics::<P>(&data);
    let total_active_balance = epoch_context.total_active_balance();

    // > Justification and finalization
    if current_epoch > GENESIS_EPOCH + 1 {
        unphased::weigh_justification_and_finalization(
            state,
            total_active_balance,
            statistics.previous_epoch_target_balance,
            statistics.current_epoch_target_balance,
        )?;
    }

    interrupt.check()?;

    process_inactivity_updates(config, state, &data, interrupt)?;

    interrupt.check()?;

    if current_epoch > GENESIS_EPOCH {
        let deltas = rewards_and_penalties(
            config,
            state,
            epoch_context,
            &data,
            inactivity_penalty_quotient,
            interrupt,
        )?;

        apply_deltas(state, &deltas)?;
    }

    interrupt.check()?;

    unphased::process_registry_updates(config, state)?;

    interrupt.check()?;

    unphased::process_slashings(state, proportional_slashing_multiplier, total_active_balance)?;

    interrupt.check()?;

    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state)?;
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;

    process_participation_flag_updates(state);
    process_sync_committee_updates(state)?;

    Ok(())
}

/// Moves inactivity scores toward their resting values: up while a validator
/// misses the target, down while it participates, and down again outside a
/// leak so that scores recover once finality returns.
pub fn process_inactivity_updates<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    data: &AttesterData,
    interrupt: &Interrupt,
) -> Result<()> {
    if accessors::get_current_epoch(state) == GENESIS_EPOCH {
        return Ok(());
    }

    let is_in_inactivity_leak = predicates::is_in_inactivity_leak(state);

    for (position, validator_index) in data.eligible_indices.iter().enumerate() {
        if position % crate::interrupt::VALIDATOR_CHECK_INTERVAL == 0 {
            interrupt.check()?;
        }

        let index = usize::try_from(*validator_index).expect("validator indices fit in usize");
        let flat = data.flats[index];

        let timely_target = !flat.slashed
            && predicates::has_flag(data.previous_participation[index], TIMELY_TARGET_FLAG);

        let score = state.inactivity_scores_mut().get_mut(*validator_index)?;

        // > Increase the inactivity score of inactive validators
        if timely_target {
            *score -= (*score).min(1);
        } else {
            *score += config.inactivity_score_bias;
        }

        // > Decrease the inactivity score of all eligible validators during a leak-free epoch
        if !is_in_inactivity_leak {
            *score -= (*score).min(config.inactivity_score_recovery_rate);
        }
    }

    Ok(())
}

fn rewards_and_penalties<P: Preset>(
    config: &Config,
    state: &impl PostAltairBeaconState<P>,
    epoch_context: &EpochContext<P>,
    data: &AttesterData,
    inactivity_penalty_quotient: u64,
    interrupt: &Interrupt,
) -> Result<Deltas> {
    let is_in_inactivity_leak = predicates::is_in_inactivity_leak(state);
    let total_active_balance = epoch_context.total_active_balance();
    let total_active_balance_sqrt = epoch_context.total_active_balance_sqrt();

    // Scores were just updated by `process_inactivity_updates`;
    // the penalties must see the new values.
    let inactivity_scores = state.inactivity_scores().iter().copied().collect::<Vec<_>>();

    let flag_deltas = |flag, weight| {
        epoch_intermediates::compute_flag_deltas::<P>(
            data,
            flag,
            weight,
            total_active_balance,
            total_active_balance_sqrt,
            is_in_inactivity_leak,
            interrupt,
        )
    };

    let ((source, target), (head, inactivity)) = rayon::join(
        || {
            rayon::join(
                || flag_deltas(TIMELY_SOURCE_FLAG, TIMELY_SOURCE_WEIGHT),
                || flag_deltas(TIMELY_TARGET_FLAG, TIMELY_TARGET_WEIGHT),
            )
        },
        || {
            rayon::join(
                || flag_deltas(TIMELY_HEAD_FLAG, TIMELY_HEAD_WEIGHT),
                || {
                    epoch_intermediates::compute_inactivity_penalty_deltas::<P>(
                        config,
                        data,
                        &inactivity_scores,
                        inactivity_penalty_quotient,
                        interrupt,
                    )
                },
            )
        },
    );

    let mut deltas = source?;
    deltas.add(&target?);
    deltas.add(&head?);
    deltas.add(&inactivity?);

    Ok(deltas)
}

fn apply_deltas<P: Preset>(
    state: &mut impl PostAltairBeaconState<P>,
    deltas: &Deltas,
) -> Result<()> {
    for (validator_index, (reward, penalty)) in
        deltas.rewards.iter().zip(&deltas.penalties).enumerate()
    {
        let balance = mutators::balance(state, validator_index as u64)?;
        mutators::increase_balance(balance, *reward);
        mutators::decrease_balance(balance, *penalty);
    }

    Ok(())
}

pub fn process_participation_flag_updates<P: Preset>(state: &mut impl PostAltairBeaconState<P>) {
    let zeroed = PersistentList::repeat_zero_with_length_of(state.validators());
    let current = core::mem::take(state.current_epoch_participation_mut());

    *state.previous_epoch_participation_mut() = current;
    *state.current_epoch_participation_mut() = zeroed;
}

pub fn process_sync_committee_updates<P: Preset>(
    state: &mut impl PostAltairBeaconState<P>,
) -> Result<()> {
    let next_epoch = accessors::get_current_epoch(state) + 1;

    if next_epoch % P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD == 0 {
        let new_next = accessors::get_next_sync_committee(state)?;
        let old_next = state.next_sync_committee().clone_arc();

        *state.current_sync_committee_mut() = old_next;
        *state.next_sync_committee_mut() = new_next;
    }

    Ok(())
}
