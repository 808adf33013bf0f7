//! Flag-based reward inputs for altair-style epoch processing.
//!
//! Everything the reward loops touch is snapshotted into dense vectors first;
//! the loops themselves then run over plain slices.

use anyhow::Result;
use types::{
    altair::{
        consts::{TIMELY_TARGET_FLAG, WEIGHT_DENOMINATOR},
        primitives::ParticipationFlags,
    },
    config::Config,
    phase0::primitives::{Epoch, Gwei, ValidatorIndex},
    preset::Preset,
    traits::{BeaconState as _, PostAltairBeaconState},
};

use helper_functions::{accessors, predicates};

use crate::{
    interrupt::{Interrupt, VALIDATOR_CHECK_INTERVAL},
    unphased,
};

#[derive(Clone, Copy, Debug)]
pub struct FlatValidator {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub active_previous: bool,
    pub active_current: bool,
}

#[derive(Clone, Debug)]
pub struct AttesterData {
    pub previous_epoch: Epoch,
    pub current_epoch: Epoch,
    pub flats: Vec<FlatValidator>,
    pub previous_participation: Vec<ParticipationFlags>,
    pub current_participation: Vec<ParticipationFlags>,
    pub eligible_indices: Vec<ValidatorIndex>,
}

pub fn attester_data<P: Preset>(state: &impl PostAltairBeaconState<P>) -> AttesterData {
    let previous_epoch = accessors::get_previous_epoch(state);
    let current_epoch = accessors::get_current_epoch(state);

    let flats = state
        .validators()
        .iter()
        .map(|validator| FlatValidator {
            effective_balance: validator.effective_balance,
            slashed: validator.slashed,
            active_previous: predicates::is_active_validator(validator, previous_epoch),
            active_current: predicates::is_active_validator(validator, current_epoch),
        })
        .collect::<Vec<_>>();

    let eligible_indices = state
        .validators()
        .iter()
        .zip(0..)
        .filter(|(validator, _)| {
            unphased::is_eligible_for_penalties(
                previous_epoch,
                validator.activation_epoch,
                validator.exit_epoch,
                validator.slashed,
                validator.withdrawable_epoch,
            )
        })
        .map(|(_, validator_index)| validator_index)
        .collect();

    AttesterData {
        previous_epoch,
        current_epoch,
        flats,
        previous_participation: state.previous_epoch_participation().iter().copied().collect(),
        current_participation: state.current_epoch_participation().iter().copied().collect(),
        eligible_indices,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Statistics {
    pub previous_epoch_target_balance: Gwei,
    pub current_epoch_target_balance: Gwei,
}

/// Stakes behind the timely-target flag, the justification inputs.
pub fn statistics<P: Preset>(data: &AttesterData) -> Statistics {
    let target_balance = |participation: &[ParticipationFlags], previous: bool| {
        data.flats
            .iter()
            .zip(participation)
            .filter(|(flat, flags)| {
                let active = if previous {
                    flat.active_previous
                } else {
                    flat.active_current
                };

                active && !flat.slashed && predicates::has_flag(**flags, TIMELY_TARGET_FLAG)
            })
            .map(|(flat, _)| flat.effective_balance)
            .sum::<Gwei>()
            .max(P::EFFECTIVE_BALANCE_INCREMENT)
    };

    Statistics {
        previous_epoch_target_balance: target_balance(&data.previous_participation, true),
        current_epoch_target_balance: target_balance(&data.current_participation, false),
    }
}

#[derive(Clone, Debug)]
pub struct Deltas {
    pub rewards: Vec<Gwei>,
    pub penalties: Vec<Gwei>,
}

impl Deltas {
    fn new(validator_count: usize) -> Self {
        Self {
            rewards: vec![0; validator_count],
            penalties: vec![0; validator_count],
        }
    }

    pub fn add(&mut self, other: &Self) {
        for (sum, addend) in self.rewards.iter_mut().zip(&other.rewards) {
            *sum += addend;
        }
        for (sum, addend) in self.penalties.iter_mut().zip(&other.penalties) {
            *sum += addend;
        }
    }
}

/// Rewards and penalties for a single participation flag.
///
/// Numerators are multiplied out in full before the final division,
/// matching the reference formulas exactly.
pub fn compute_flag_deltas<P: Preset>(
    data: &AttesterData,
    flag: ParticipationFlags,
    weight: u64,
    total_active_balance: Gwei,
    total_active_balance_sqrt: u64,
    is_inactivity_leak: bool,
    interrupt: &Interrupt,
) -> Result<Deltas> {
    let mut deltas = Deltas::new(data.flats.len());

    let unslashed_participating_balance = data
        .flats
        .iter()
        .zip(&data.previous_participation)
        .filter(|(flat, flags)| {
            flat.active_previous && !flat.slashed && predicates::has_flag(**flags, flag)
        })
        .map(|(flat, _)| flat.effective_balance)
        .sum::<Gwei>()
        .max(P::EFFECTIVE_BALANCE_INCREMENT);

    let unslashed_participating_increments =
        unslashed_participating_balance / P::EFFECTIVE_BALANCE_INCREMENT;
    let active_increments = total_active_balance / P::EFFECTIVE_BALANCE_INCREMENT;
    let base_reward_per_increment =
        unphased::base_reward_per_increment::<P>(total_active_balance_sqrt);

    for (position, validator_index) in data.eligible_indices.iter().enumerate() {
        if position % VALIDATOR_CHECK_INTERVAL == 0 {
            interrupt.check()?;
        }

        let index = usize::try_from(*validator_index).expect("validator indices fit in usize");
        let flat = data.flats[index];

        let increments = flat.effective_balance / P::EFFECTIVE_BALANCE_INCREMENT;
        let base_reward = increments * base_reward_per_increment;

        let participated =
            !flat.slashed && predicates::has_flag(data.previous_participation[index], flag);

        if participated {
            if !is_inactivity_leak {
                let reward_numerator =
                    base_reward * weight * unslashed_participating_increments;
                let reward_denominator = active_increments * WEIGHT_DENOMINATOR;
                deltas.rewards[index] += reward_numerator / reward_denominator;
            }
        } else {
            deltas.penalties[index] += base_reward * weight / WEIGHT_DENOMINATOR;
        }
    }

    Ok(deltas)
}

/// The separate inactivity pool: quadratic-leak penalties driven by the
/// accumulated inactivity scores.
pub fn compute_inactivity_penalty_deltas<P: Preset>(
    config: &Config,
    data: &AttesterData,
    inactivity_scores: &[u64],
    inactivity_penalty_quotient: u64,
    interrupt: &Interrupt,
) -> Result<Deltas> {
    let mut deltas = Deltas::new(data.flats.len());

    let penalty_denominator = config.inactivity_score_bias * inactivity_penalty_quotient;

    for (position, validator_index) in data.eligible_indices.iter().enumerate() {
        if position % VALIDATOR_CHECK_INTERVAL == 0 {
            interrupt.check()?;
        }

        let index = usize::try_from(*validator_index).expect("validator indices fit in usize");
        let flat = data.flats[index];

        let timely_target = !flat.slashed
            && predicates::has_flag(data.previous_participation[index], TIMELY_TARGET_FLAG);

        if !timely_target {
            let penalty_numerator = flat.effective_balance * inactivity_scores[index];
            deltas.penalties[index] += penalty_numerator / penalty_denominator;
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use integer_sqrt::IntegerSquareRoot as _;
    use types::{
        altair::consts::{TIMELY_SOURCE_FLAG, TIMELY_SOURCE_WEIGHT},
        preset::{Minimal, Preset as _},
    };

    use super::*;

    fn attester_data_with_flags(flags: &[ParticipationFlags]) -> AttesterData {
        AttesterData {
            previous_epoch: 1,
            current_epoch: 2,
            flats: flags
                .iter()
                .map(|_| FlatValidator {
                    effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
                    slashed: false,
                    active_previous: true,
                    active_current: true,
                })
                .collect(),
            previous_participation: flags.to_vec(),
            current_participation: vec![0; flags.len()],
            eligible_indices: (0..flags.len() as u64).collect(),
        }
    }

    #[test]
    fn participants_earn_the_specified_fraction_of_base_reward() {
        // 3 of 4 validators have the timely source flag.
        let data = attester_data_with_flags(&[
            TIMELY_SOURCE_FLAG,
            TIMELY_SOURCE_FLAG,
            TIMELY_SOURCE_FLAG,
            0,
        ]);

        let total_active_balance = 4 * Minimal::MAX_EFFECTIVE_BALANCE;
        let sqrt = total_active_balance.integer_sqrt();

        let deltas = compute_flag_deltas::<Minimal>(
            &data,
            TIMELY_SOURCE_FLAG,
            TIMELY_SOURCE_WEIGHT,
            total_active_balance,
            sqrt,
            false,
            &Interrupt::never(),
        )
        .expect("no interrupt is set");

        let increment = Minimal::EFFECTIVE_BALANCE_INCREMENT;
        let increments = Minimal::MAX_EFFECTIVE_BALANCE / increment;
        let base_reward =
            increments * (increment * Minimal::BASE_REWARD_FACTOR / sqrt);

        let participating_increments = 3 * increments;
        let active_increments = 4 * increments;

        let expected_reward = base_reward * TIMELY_SOURCE_WEIGHT * participating_increments
            / (active_increments * WEIGHT_DENOMINATOR);
        let expected_penalty = base_reward * TIMELY_SOURCE_WEIGHT / WEIGHT_DENOMINATOR;

        assert_eq!(deltas.rewards[0], expected_reward);
        assert_eq!(deltas.penalties[0], 0);
        assert_eq!(deltas.rewards[3], 0);
        assert_eq!(deltas.penalties[3], expected_penalty);
    }

    #[test]
    fn no_attestation_rewards_are_paid_during_a_leak() {
        let data = attester_data_with_flags(&[TIMELY_SOURCE_FLAG, 0]);

        let total_active_balance = 2 * Minimal::MAX_EFFECTIVE_BALANCE;

        let deltas = compute_flag_deltas::<Minimal>(
            &data,
            TIMELY_SOURCE_FLAG,
            TIMELY_SOURCE_WEIGHT,
            total_active_balance,
            total_active_balance.integer_sqrt(),
            true,
            &Interrupt::never(),
        )
        .expect("no interrupt is set");

        assert_eq!(deltas.rewards[0], 0);
        assert!(deltas.penalties[1] > 0);
    }

    #[test]
    fn slashed_validators_are_penalized_even_with_the_flag_set() {
        let mut data = attester_data_with_flags(&[TIMELY_TARGET_FLAG, TIMELY_TARGET_FLAG]);
        data.flats[1].slashed = true;

        let total_active_balance = 2 * Minimal::MAX_EFFECTIVE_BALANCE;

        let deltas = compute_flag_deltas::<Minimal>(
            &data,
            TIMELY_TARGET_FLAG,
            types::altair::consts::TIMELY_TARGET_WEIGHT,
            total_active_balance,
            total_active_balance.integer_sqrt(),
            false,
            &Interrupt::never(),
        )
        .expect("no interrupt is set");

        assert!(deltas.rewards[0] > 0);
        assert_eq!(deltas.rewards[1], 0);
        assert!(deltas.penalties[1] > 0);
    }

    #[test]
    fn inactivity_penalties_scale_with_the_score() {
        let config = Config::minimal();
        let data = attester_data_with_flags(&[0, 0]);

        let deltas = compute_inactivity_penalty_deltas::<Minimal>(
            &config,
            &data,
            &[8, 16],
            Minimal::INACTIVITY_PENALTY_QUOTIENT_ALTAIR,
            &Interrupt::never(),
        )
        .expect("no interrupt is set");

        let denominator =
            config.inactivity_score_bias * Minimal::INACTIVITY_PENALTY_QUOTIENT_ALTAIR;

        assert_eq!(
            deltas.penalties[0],
            Minimal::MAX_EFFECTIVE_BALANCE * 8 / denominator,
        );
        assert_eq!(deltas.penalties[1], deltas.penalties[0] * 2);

        // A validator with the timely target flag is not penalized.
        let participating = attester_data_with_flags(&[TIMELY_TARGET_FLAG]);
        let deltas = compute_inactivity_penalty_deltas::<Minimal>(
            &config,
            &participating,
            &[1000],
            Minimal::INACTIVITY_PENALTY_QUOTIENT_ALTAIR,
            &Interrupt::never(),
        )
        .expect("no interrupt is set");

        assert_eq!(deltas.penalties[0], 0);
    }
}
