use anyhow::Result;
use typenum::Unsigned as _;
use types::{
    config::Config,
    nonstandard::Phase,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
    traits::BeaconState,
};

use crate::{accessors, error::Error, misc};

pub fn increase_balance(balance: &mut Gwei, delta: Gwei) {
    *balance += delta;
}

pub fn decrease_balance(balance: &mut Gwei, delta: Gwei) {
    *balance = balance.saturating_sub(delta);
}

pub fn balance<'state, P: Preset>(
    state: &'state mut impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&'state mut Gwei> {
    state
        .balances_mut()
        .get_mut(validator_index)
        .map_err(|_| Error::ValidatorIndexOutOfBounds { validator_index }.into())
}

/// Places the validator in the exit queue, delaying its exit until the queue
/// has room under the churn limit.
pub fn initiate_validator_exit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<()> {
    let exit_epoch = state
        .validators()
        .get(validator_index)
        .map_err(|_| Error::ValidatorIndexOutOfBounds { validator_index })?
        .exit_epoch;

    if exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }

    let current_epoch = accessors::get_current_epoch(state);

    let mut exit_queue_epoch = misc::compute_activation_exit_epoch::<P>(current_epoch);
    let mut exit_queue_churn = 0;

    for validator in state.validators() {
        if validator.exit_epoch == FAR_FUTURE_EPOCH {
            continue;
        }

        if validator.exit_epoch > exit_queue_epoch {
            exit_queue_epoch = validator.exit_epoch;
            exit_queue_churn = 1;
        } else if validator.exit_epoch == exit_queue_epoch {
            exit_queue_churn += 1;
        }
    }

    let active_count = accessors::get_active_validator_indices(state, current_epoch).len() as u64;

    if exit_queue_churn >= accessors::get_validator_churn_limit(config, active_count) {
        exit_queue_epoch += 1;
    }

    let withdrawable_epoch = exit_queue_epoch + config.min_validator_withdrawability_delay;

    let validator = state
        .validators_mut()
        .get_mut(validator_index)
        .map_err(|_| Error::ValidatorIndexOutOfBounds { validator_index })?;

    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = withdrawable_epoch;

    Ok(())
}

/// Penalizes a slashed validator immediately and rewards the whistleblower
/// and the proposer. The remainder of the penalty is collected by the
/// slashings sweep at the halfway point of the withdrawability delay.
pub fn slash_validator<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    slashed_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
    proposer_index: ValidatorIndex,
    phase: Phase,
) -> Result<()> {
    initiate_validator_exit(config, state, slashed_index)?;

    let epoch = accessors::get_current_epoch(state);
    let epochs_per_slashings_vector = P::EpochsPerSlashingsVector::U64;

    let effective_balance = {
        let validator = state
            .validators_mut()
            .get_mut(slashed_index)
            .map_err(|_| Error::ValidatorIndexOutOfBounds {
                validator_index: slashed_index,
            })?;

        validator.slashed = true;
        validator.withdrawable_epoch = validator
            .withdrawable_epoch
            .max(epoch + epochs_per_slashings_vector);

        validator.effective_balance
    };

    *state.slashings_mut().mod_index_mut(epoch) += effective_balance;

    let min_slashing_penalty_quotient = match phase {
        Phase::Phase0 => P::MIN_SLASHING_PENALTY_QUOTIENT,
        Phase::Altair => P::MIN_SLASHING_PENALTY_QUOTIENT_ALTAIR,
        Phase::Bellatrix => P::MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX,
    };

    decrease_balance(
        balance(state, slashed_index)?,
        effective_balance / min_slashing_penalty_quotient,
    );

    // > Apply proposer and whistleblower rewards
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward = effective_balance / P::WHISTLEBLOWER_REWARD_QUOTIENT;

    let proposer_reward = match phase {
        Phase::Phase0 => whistleblower_reward / P::PROPOSER_REWARD_QUOTIENT,
        Phase::Altair | Phase::Bellatrix => {
            whistleblower_reward * types::altair::consts::PROPOSER_WEIGHT
                / types::altair::consts::WEIGHT_DENOMINATOR
        }
    };

    increase_balance(balance(state, proposer_index)?, proposer_reward);
    increase_balance(
        balance(state, whistleblower_index)?,
        whistleblower_reward - proposer_reward,
    );

    Ok(())
}
