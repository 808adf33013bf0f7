use anyhow::Result;
use helper_functions::{accessors, misc, mutators, predicates};
use itertools::Itertools as _;
use ssz::SszHash as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        containers::{Checkpoint, HistoricalBatch},
        primitives::{Epoch, Gwei, ValidatorIndex},
    },
    preset::Preset,
    traits::BeaconState,
};

/// Casper FFG vote accumulation over the 4-epoch justification window.
///
/// `previous_target_balance` and `current_target_balance` are the stakes that
/// attested to the respective epoch boundaries; how they are gathered differs
/// between phase0 and altair, so they are computed by the caller.
pub fn weigh_justification_and_finalization<P: Preset>(
    state: &mut impl BeaconState<P>,
    total_active_balance: Gwei,
    previous_target_balance: Gwei,
    current_target_balance: Gwei,
) -> Result<()> {
    let previous_epoch = accessors::get_previous_epoch(state);
    let current_epoch = accessors::get_current_epoch(state);

    let old_previous_justified = state.previous_justified_checkpoint();
    let old_current_justified = state.current_justified_checkpoint();

    // > Process justifications
    *state.previous_justified_checkpoint_mut() = old_current_justified;

    let bits = state.justification_bits_mut();
    for index in (1..4).rev() {
        let lower = bits.get(index - 1);
        bits.set(index, lower);
    }
    bits.set(0, false);

    if previous_target_balance * 3 >= total_active_balance * 2 {
        let root = accessors::get_block_root(state, previous_epoch)?;
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: previous_epoch,
            root,
        };
        state.justification_bits_mut().set(1, true);
    }

    if current_target_balance * 3 >= total_active_balance * 2 {
        let root = accessors::get_block_root(state, current_epoch)?;
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: current_epoch,
            root,
        };
        state.justification_bits_mut().set(0, true);
    }

    // > Process finalizations
    let bits = state.justification_bits();
    let all_set = |range: core::ops::Range<usize>| range.into_iter().all(|index| bits.get(index));

    // > The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    let finalized = if all_set(1..4) && old_previous_justified.epoch + 3 == current_epoch {
        Some(old_previous_justified)
    // > The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    } else if all_set(1..3) && old_previous_justified.epoch + 2 == current_epoch {
        Some(old_previous_justified)
    // > The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    } else if all_set(0..3) && old_current_justified.epoch + 2 == current_epoch {
        Some(old_current_justified)
    // > The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    } else if all_set(0..2) && old_current_justified.epoch + 1 == current_epoch {
        Some(old_current_justified)
    } else {
        None
    };

    if let Some(checkpoint) = finalized {
        *state.finalized_checkpoint_mut() = checkpoint;
    }

    Ok(())
}

pub fn process_registry_updates<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
) -> Result<()> {
    let current_epoch = accessors::get_current_epoch(state);

    // > Process activation eligibility and ejections
    let mut newly_eligible = vec![];
    let mut to_eject = vec![];

    for (validator, validator_index) in state.validators().iter().zip(0..) {
        if predicates::is_eligible_for_activation_queue::<P>(validator) {
            newly_eligible.push(validator_index);
        }

        if predicates::is_active_validator(validator, current_epoch)
            && validator.effective_balance <= config.ejection_balance
        {
            to_eject.push(validator_index);
        }
    }

    for validator_index in newly_eligible {
        state
            .validators_mut()
            .get_mut(validator_index)?
            .activation_eligibility_epoch = current_epoch + 1;
    }

    for validator_index in to_eject {
        mutators::initiate_validator_exit(config, state, validator_index)?;
    }

    // > Queue validators eligible for activation and not yet dequeued for activation
    let activation_queue = state
        .validators()
        .iter()
        .zip(0..)
        .filter(|(validator, _)| predicates::is_eligible_for_activation(state, validator))
        // > Order by the sequence of activation_eligibility_epoch setting and then index
        .sorted_by_key(|(validator, validator_index)| {
            (validator.activation_eligibility_epoch, *validator_index)
        })
        .map(|(_, validator_index)| validator_index)
        .collect::<Vec<ValidatorIndex>>();

    // > Dequeued validators for activation up to churn limit
    let active_count =
        accessors::get_active_validator_indices(state, current_epoch).len() as u64;
    let churn_limit = accessors::get_validator_churn_limit(config, active_count);
    let activation_epoch = misc::compute_activation_exit_epoch::<P>(current_epoch);

    for validator_index in activation_queue.into_iter().take(
        usize::try_from(churn_limit).expect("churn limits fit in usize"),
    ) {
        state
            .validators_mut()
            .get_mut(validator_index)?
            .activation_epoch = activation_epoch;
    }

    Ok(())
}

/// The slashing sweep: collects the proportional part of each slashed
/// validator's penalty halfway through its withdrawability delay.
pub fn process_slashings<P: Preset>(
    state: &mut impl BeaconState<P>,
    proportional_slashing_multiplier: u64,
    total_balance: Gwei,
) -> Result<()> {
    let current_epoch = accessors::get_current_epoch(state);
    let sweep_epoch = current_epoch + P::EpochsPerSlashingsVector::U64 / 2;

    let slashings_sum = state.slashings().iter().sum::<Gwei>();
    let adjusted_total_slashing_balance =
        (slashings_sum * proportional_slashing_multiplier).min(total_balance);

    let increment = P::EFFECTIVE_BALANCE_INCREMENT;

    let penalized = state
        .validators()
        .iter()
        .zip(0..)
        .filter(|(validator, _)| {
            validator.slashed && validator.withdrawable_epoch == sweep_epoch
        })
        .map(|(validator, validator_index)| {
            // > Factored out from penalty numerator to avoid uint64 overflow
            let penalty_numerator =
                validator.effective_balance / increment * adjusted_total_slashing_balance;
            let penalty = penalty_numerator / total_balance * increment;
            (validator_index, penalty)
        })
        .collect::<Vec<(ValidatorIndex, Gwei)>>();

    for (validator_index, penalty) in penalized {
        mutators::decrease_balance(mutators::balance(state, validator_index)?, penalty);
    }

    Ok(())
}

pub fn process_eth1_data_reset<P: Preset>(state: &mut impl BeaconState<P>) {
    let next_epoch = accessors::get_current_epoch(state) + 1;

    // > Reset eth1 data votes
    if next_epoch % P::EPOCHS_PER_ETH1_VOTING_PERIOD == 0 {
        *state.eth1_data_votes_mut() = Default::default();
    }
}

/// The hysteresis rule: effective balances only move when the actual balance
/// leaves a band around them, keeping the Merkle churn of the registry low.
pub fn process_effective_balance_updates<P: Preset>(state: &mut impl BeaconState<P>) -> Result<()> {
    let increment = P::EFFECTIVE_BALANCE_INCREMENT;
    let hysteresis_increment = increment / P::HYSTERESIS_QUOTIENT;
    let downward_threshold = hysteresis_increment * P::HYSTERESIS_DOWNWARD_MULTIPLIER;
    let upward_threshold = hysteresis_increment * P::HYSTERESIS_UPWARD_MULTIPLIER;

    let updates = state
        .balances()
        .iter()
        .copied()
        .zip(state.validators().iter())
        .zip(0..)
        .filter_map(|((balance, validator), validator_index)| {
            let effective_balance = validator.effective_balance;

            let out_of_band = balance + downward_threshold < effective_balance
                || effective_balance + upward_threshold < balance;

            out_of_band.then(|| {
                let new_effective_balance =
                    (balance - balance % increment).min(P::MAX_EFFECTIVE_BALANCE);
                (validator_index, new_effective_balance)
            })
        })
        .collect::<Vec<(ValidatorIndex, Gwei)>>();

    for (validator_index, new_effective_balance) in updates {
        state
            .validators_mut()
            .get_mut(validator_index)?
            .effective_balance = new_effective_balance;
    }

    Ok(())
}

pub fn process_slashings_reset<P: Preset>(state: &mut impl BeaconState<P>) {
    let next_epoch = accessors::get_current_epoch(state) + 1;

    // > Reset slashings
    *state.slashings_mut().mod_index_mut(next_epoch) = 0;
}

pub fn process_randao_mixes_reset<P: Preset>(state: &mut impl BeaconState<P>) {
    let current_epoch = accessors::get_current_epoch(state);
    let next_epoch = current_epoch + 1;

    // > Set randao mix
    let mix = accessors::get_randao_mix(state, current_epoch);
    *state.randao_mixes_mut().mod_index_mut(next_epoch) = mix;
}

pub fn process_historical_roots_update<P: Preset>(state: &mut impl BeaconState<P>) -> Result<()> {
    let next_epoch = accessors::get_current_epoch(state) + 1;

    // > Set historical root accumulator
    let epochs_per_historical_root =
        P::SlotsPerHistoricalRoot::U64 / P::slots_per_epoch();

    if next_epoch % epochs_per_historical_root == 0 {
        let historical_batch = HistoricalBatch::<P> {
            block_roots: state.block_roots().clone(),
            state_roots: state.state_roots().clone(),
        };

        state
            .historical_roots_mut()
            .push(historical_batch.hash_tree_root())?;
    }

    Ok(())
}

/// Validators counted by the reward and penalty machinery:
/// active in the previous epoch, or slashed but not yet withdrawable.
pub(crate) fn is_eligible_for_penalties(
    previous_epoch: Epoch,
    activation_epoch: Epoch,
    exit_epoch: Epoch,
    slashed: bool,
    withdrawable_epoch: Epoch,
) -> bool {
    let active_previous = activation_epoch <= previous_epoch && previous_epoch < exit_epoch;
    active_previous || (slashed && previous_epoch + 1 < withdrawable_epoch)
}

#[cfg(test)]
mod tests {
    use bls::PublicKeyBytes;
    use ssz::SszHash as _;
    use test_case::test_case;
    use types::{
        phase0::{
            beacon_state::BeaconState as Phase0BeaconState,
            consts::FAR_FUTURE_EPOCH,
            containers::Validator,
            primitives::H256,
        },
        preset::{Minimal, Preset as _},
    };

    use super::*;

    const EPOCHS_PER_SLASHINGS_VECTOR: u64 = 64;

    fn state_at_epoch(epoch: Epoch, validator_count: u64) -> Phase0BeaconState<Minimal> {
        let mut state = Phase0BeaconState::<Minimal>::default();

        state.slot = epoch * Minimal::slots_per_epoch() + Minimal::slots_per_epoch() - 1;

        for index in 0..validator_count {
            state
                .validators
                .push(Validator {
                    pubkey: PublicKeyBytes::from_low_u64_be(index + 1).into(),
                    effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
                    activation_epoch: 0,
                    exit_epoch: FAR_FUTURE_EPOCH,
                    withdrawable_epoch: FAR_FUTURE_EPOCH,
                    ..Validator::default()
                })
                .expect("the registry limit is far away");
            state
                .balances
                .push(Minimal::MAX_EFFECTIVE_BALANCE)
                .expect("the registry limit is far away");
        }

        state
    }

    #[test_case(0, false ; "one epoch early")]
    #[test_case(1, true ; "at the sweep epoch")]
    #[test_case(2, false ; "one epoch late")]
    fn slashing_sweep_fires_only_at_the_halfway_point(epoch_offset: u64, swept: bool) {
        let slashing_epoch = 10;
        let current_epoch = slashing_epoch + EPOCHS_PER_SLASHINGS_VECTOR / 2 - 1 + epoch_offset;

        let mut state = state_at_epoch(current_epoch, 4);

        {
            let validator = state.validators.get_mut(0).expect("index 0 exists");
            validator.slashed = true;
            validator.withdrawable_epoch = slashing_epoch + EPOCHS_PER_SLASHINGS_VECTOR;
        }

        *state.slashings.mod_index_mut(slashing_epoch) = Minimal::MAX_EFFECTIVE_BALANCE;

        let total_balance = 4 * Minimal::MAX_EFFECTIVE_BALANCE;

        process_slashings(
            &mut state,
            Minimal::PROPORTIONAL_SLASHING_MULTIPLIER,
            total_balance,
        )
        .expect("balances are in range");

        let balance = *state.balances.get(0).expect("index 0 exists");

        if swept {
            let adjusted = (Minimal::MAX_EFFECTIVE_BALANCE
                * Minimal::PROPORTIONAL_SLASHING_MULTIPLIER)
                .min(total_balance);
            let increment = Minimal::EFFECTIVE_BALANCE_INCREMENT;
            let expected_penalty = Minimal::MAX_EFFECTIVE_BALANCE / increment * adjusted
                / total_balance
                * increment;

            assert!(expected_penalty > 0);
            assert_eq!(balance, Minimal::MAX_EFFECTIVE_BALANCE - expected_penalty);
        } else {
            assert_eq!(balance, Minimal::MAX_EFFECTIVE_BALANCE);
        }
    }

    #[test]
    fn effective_balances_move_only_outside_the_hysteresis_band() {
        let mut state = state_at_epoch(1, 3);

        let increment = Minimal::EFFECTIVE_BALANCE_INCREMENT;

        // Within the band: a quarter increment below.
        *state.balances.get_mut(0).expect("index 0 exists") =
            Minimal::MAX_EFFECTIVE_BALANCE - increment / 4;
        // Below the downward threshold.
        *state.balances.get_mut(1).expect("index 1 exists") =
            Minimal::MAX_EFFECTIVE_BALANCE - increment;
        // Far above; effective balance is capped at the maximum.
        *state.balances.get_mut(2).expect("index 2 exists") =
            Minimal::MAX_EFFECTIVE_BALANCE + 10 * increment;

        process_effective_balance_updates(&mut state)
            .expect("balances are in range");

        let effective = |index| {
            state
                .validators
                .get(index)
                .expect("index exists")
                .effective_balance
        };

        assert_eq!(effective(0), Minimal::MAX_EFFECTIVE_BALANCE);
        assert_eq!(effective(1), Minimal::MAX_EFFECTIVE_BALANCE - increment);
        assert_eq!(effective(2), Minimal::MAX_EFFECTIVE_BALANCE);
    }

    #[test]
    fn supermajorities_justify_and_finalize() {
        let total = 64 * Minimal::MAX_EFFECTIVE_BALANCE;
        let supermajority = total * 2 / 3 + 1;

        let mut state = state_at_epoch(2, 64);

        weigh_justification_and_finalization(&mut state, total, supermajority, supermajority)
            .expect("block roots are in range");

        // Both the previous and current epochs were justified just now.
        assert_eq!(state.current_justified_checkpoint.epoch, 2);
        assert!(state.justification_bits.get(0));
        assert!(state.justification_bits.get(1));
        assert_eq!(state.finalized_checkpoint.epoch, 0);

        // Advance one epoch and justify again: epoch 2 finalizes through rule 4.
        state.slot += Minimal::slots_per_epoch();

        weigh_justification_and_finalization(&mut state, total, supermajority, supermajority)
            .expect("block roots are in range");

        assert_eq!(state.current_justified_checkpoint.epoch, 3);
        assert_eq!(state.finalized_checkpoint.epoch, 2);

        // The checkpoints stay monotonic.
        assert!(state.finalized_checkpoint.epoch <= state.previous_justified_checkpoint.epoch);
        assert!(
            state.previous_justified_checkpoint.epoch
                <= state.current_justified_checkpoint.epoch
        );
    }

    #[test]
    fn minorities_justify_nothing() {
        let total = 64 * Minimal::MAX_EFFECTIVE_BALANCE;

        let mut state = state_at_epoch(2, 64);

        weigh_justification_and_finalization(&mut state, total, total / 2, total / 2)
            .expect("block roots are in range");

        assert_eq!(state.current_justified_checkpoint.epoch, 0);
        assert!(!state.justification_bits.get(0));
        assert!(!state.justification_bits.get(1));
    }

    #[test]
    fn historical_roots_accumulate_once_per_wraparound() {
        // 64 slots per historical root / 8 slots per epoch = every 8 epochs.
        let mut state = state_at_epoch(7, 1);

        let batch_root = HistoricalBatch::<Minimal> {
            block_roots: state.block_roots.clone(),
            state_roots: state.state_roots.clone(),
        }
        .hash_tree_root();

        process_historical_roots_update(&mut state)
            .expect("the historical roots limit is far away");
        assert_eq!(state.historical_roots.get(0), Ok(&batch_root));

        let mut early = state_at_epoch(5, 1);
        process_historical_roots_update(&mut early)
            .expect("the historical roots limit is far away");
        assert!(early.historical_roots.is_empty());
    }

    #[test]
    fn randao_mixes_carry_over_into_the_next_epoch() {
        let mut state = state_at_epoch(3, 1);
        *state.randao_mixes.mod_index_mut(3) = H256::repeat_byte(0x5a);

        process_randao_mixes_reset(&mut state);

        assert_eq!(*state.randao_mixes.mod_index(4), H256::repeat_byte(0x5a));
    }
}
