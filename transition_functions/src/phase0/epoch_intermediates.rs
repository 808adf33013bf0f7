//! Per-validator attestation summaries for phase0 epoch processing.
//!
//! Pending attestations are unpacked once into flat per-validator statuses;
//! the justification balances and all reward components read from those.

use anyhow::Result;
use epoch_context::EpochContext;
use helper_functions::accessors;
use integer_sqrt::IntegerSquareRoot as _;
use types::{
    phase0::{
        beacon_state::BeaconState,
        consts::BASE_REWARDS_PER_EPOCH,
        containers::PendingAttestation,
        primitives::{Epoch, Gwei, ValidatorIndex},
    },
    preset::Preset,
};

use crate::{
    interrupt::{Interrupt, VALIDATOR_CHECK_INTERVAL},
    unphased,
};

#[derive(Clone, Copy, Debug)]
pub struct Inclusion {
    pub delay: u64,
    pub proposer_index: ValidatorIndex,
}

#[derive(Clone, Copy, Default, Debug)]
pub struct AttesterStatus {
    pub eligible: bool,
    pub slashed: bool,
    pub effective_balance: Gwei,
    pub previous_source: bool,
    pub previous_target: bool,
    pub previous_head: bool,
    pub current_target: bool,
    /// Fastest inclusion of this validator's previous-epoch attestation.
    pub inclusion: Option<Inclusion>,
}

#[derive(Clone, Copy, Debug)]
pub struct Statistics {
    pub total_active_balance: Gwei,
    pub previous_epoch_source_balance: Gwei,
    pub previous_epoch_target_balance: Gwei,
    pub previous_epoch_head_balance: Gwei,
    pub current_epoch_target_balance: Gwei,
}

pub fn statistics<P: Preset>(
    state: &BeaconState<P>,
    epoch_context: &EpochContext<P>,
) -> Result<(Vec<AttesterStatus>, Statistics)> {
    let previous_epoch = accessors::get_previous_epoch(state);
    let current_epoch = accessors::get_current_epoch(state);

    let mut statuses = state
        .validators
        .iter()
        .map(|validator| AttesterStatus {
            eligible: unphased::is_eligible_for_penalties(
                previous_epoch,
                validator.activation_epoch,
                validator.exit_epoch,
                validator.slashed,
                validator.withdrawable_epoch,
            ),
            slashed: validator.slashed,
            effective_balance: validator.effective_balance,
            ..AttesterStatus::default()
        })
        .collect::<Vec<_>>();

    unpack_attestations(
        state,
        epoch_context,
        &state.previous_epoch_attestations,
        previous_epoch,
        &mut statuses,
        true,
    )?;
    unpack_attestations(
        state,
        epoch_context,
        &state.current_epoch_attestations,
        current_epoch,
        &mut statuses,
        false,
    )?;

    let attesting_balance = |attested: fn(&AttesterStatus) -> bool| {
        statuses
            .iter()
            .filter(|status| !status.slashed && attested(status))
            .map(|status| status.effective_balance)
            .sum::<Gwei>()
            .max(P::EFFECTIVE_BALANCE_INCREMENT)
    };

    let statistics = Statistics {
        total_active_balance: epoch_context.total_active_balance(),
        previous_epoch_source_balance: attesting_balance(|status| status.previous_source),
        previous_epoch_target_balance: attesting_balance(|status| status.previous_target),
        previous_epoch_head_balance: attesting_balance(|status| status.previous_head),
        current_epoch_target_balance: attesting_balance(|status| status.current_target),
    };

    Ok((statuses, statistics))
}

fn unpack_attestations<P: Preset>(
    state: &BeaconState<P>,
    epoch_context: &EpochContext<P>,
    attestations: &ssz::PersistentList<PendingAttestation<P>, P::EpochAttestationsBound>,
    epoch: Epoch,
    statuses: &mut [AttesterStatus],
    previous: bool,
) -> Result<()> {
    let boundary_root = accessors::get_block_root(state, epoch)?;

    for attestation in attestations {
        let data = attestation.data;

        let matching_target = data.target.root == boundary_root;
        let matching_head = matching_target
            && data.beacon_block_root == accessors::get_block_root_at_slot(state, data.slot)?;

        let committee = epoch_context.beacon_committee(data.slot, data.index)?;

        for validator_index in
            accessors::get_attesting_indices::<P>(committee, &attestation.aggregation_bits)?
        {
            let status = &mut statuses
                [usize::try_from(validator_index).expect("validator indices fit in usize")];

            if previous {
                status.previous_source = true;
                status.previous_target |= matching_target;
                status.previous_head |= matching_head;

                let is_faster = status
                    .inclusion
                    .map(|inclusion| attestation.inclusion_delay < inclusion.delay)
                    .unwrap_or(true);

                if is_faster {
                    status.inclusion = Some(Inclusion {
                        delay: attestation.inclusion_delay,
                        proposer_index: attestation.proposer_index,
                    });
                }
            } else {
                status.current_target |= matching_target;
            }
        }
    }

    Ok(())
}

#[derive(Clone, Debug)]
pub struct Deltas {
    pub rewards: Vec<Gwei>,
    pub penalties: Vec<Gwei>,
}

/// The phase0 attestation reward computation: source, target, and head
/// components, inclusion-delay rewards, and inactivity penalties.
pub fn attestation_deltas<P: Preset>(
    statuses: &[AttesterStatus],
    statistics: Statistics,
    previous_epoch: Epoch,
    finalized_epoch: Epoch,
    interrupt: &Interrupt,
) -> Result<Deltas> {
    let mut deltas = Deltas {
        rewards: vec![0; statuses.len()],
        penalties: vec![0; statuses.len()],
    };

    let finality_delay = previous_epoch - finalized_epoch;
    let is_in_inactivity_leak = finality_delay > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY;

    let total_balance = statistics.total_active_balance;
    let balance_sqrt = total_balance.integer_sqrt();
    let total_increments = total_balance / P::EFFECTIVE_BALANCE_INCREMENT;

    let components = [
        |status: &AttesterStatus| status.previous_source,
        |status: &AttesterStatus| status.previous_target,
        |status: &AttesterStatus| status.previous_head,
    ];
    let component_balances = [
        statistics.previous_epoch_source_balance,
        statistics.previous_epoch_target_balance,
        statistics.previous_epoch_head_balance,
    ];

    for (index, status) in statuses.iter().enumerate() {
        if index % VALIDATOR_CHECK_INTERVAL == 0 {
            interrupt.check()?;
        }

        if !status.eligible {
            continue;
        }

        let base_reward = status.effective_balance * P::BASE_REWARD_FACTOR
            / balance_sqrt
            / BASE_REWARDS_PER_EPOCH;
        let proposer_reward = base_reward / P::PROPOSER_REWARD_QUOTIENT;

        // > Micro-incentives for matching FFG source, FFG target, and head
        for (attested, attesting_balance) in components.iter().zip(component_balances) {
            if !status.slashed && attested(status) {
                if is_in_inactivity_leak {
                    // > Since full base reward will be canceled out by inactivity penalty deltas,
                    // > optimal participation receives full base reward compensation here.
                    deltas.rewards[index] += base_reward;
                } else {
                    let attesting_increments =
                        attesting_balance / P::EFFECTIVE_BALANCE_INCREMENT;
                    deltas.rewards[index] +=
                        base_reward * attesting_increments / total_increments;
                }
            } else {
                deltas.penalties[index] += base_reward;
            }
        }

        // > Proposer and inclusion delay micro-rewards
        if !status.slashed && status.previous_source {
            if let Some(inclusion) = status.inclusion {
                let proposer =
                    usize::try_from(inclusion.proposer_index).expect("indices fit in usize");
                deltas.rewards[proposer] += proposer_reward;

                let max_attester_reward = base_reward - proposer_reward;
                deltas.rewards[index] += max_attester_reward / inclusion.delay;
            }
        }

        // > Inactivity penalty
        if is_in_inactivity_leak {
            deltas.penalties[index] += BASE_REWARDS_PER_EPOCH * base_reward - proposer_reward;

            if status.slashed || !status.previous_target {
                deltas.penalties[index] += status.effective_balance * finality_delay
                    / P::INACTIVITY_PENALTY_QUOTIENT;
            }
        }
    }

    Ok(deltas)
}
