//! The epoch context: per-epoch tables derived from the registry.
//!
//! Committees and proposer schedules are fixed by their epoch's seed, so they
//! are computed once per epoch and consulted on every attestation and block.
//! The context is owned by a single in-flight transition and rotated at epoch
//! boundaries; a fork upgrade discards it and starts fresh.

use core::marker::PhantomData;
use std::sync::Arc;

use anyhow::Result;
use integer_sqrt::IntegerSquareRoot as _;
use thiserror::Error;
use types::{
    altair::containers::SyncCommittee,
    nonstandard::AttestationEpoch,
    phase0::{
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER},
        containers::Validator,
        primitives::{CommitteeIndex, Epoch, Gwei, Slot, ValidatorIndex},
    },
    preset::Preset,
    traits::BeaconState,
};

use bls::PublicKeyBytes;
use helper_functions::{accessors, misc};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("epoch {epoch} is not covered by this context (current: {current_epoch})")]
    EpochNotCovered { epoch: Epoch, current_epoch: Epoch },
    #[error("committee index {committee_index} is out of bounds ({committees_per_slot} committees per slot)")]
    CommitteeIndexOutOfBounds {
        committee_index: CommitteeIndex,
        committees_per_slot: u64,
    },
    #[error("sync committee indices have not been loaded into this context")]
    SyncCommitteeNotLoaded,
    #[error("no validator has pubkey {pubkey:?}")]
    UnknownPubkey { pubkey: PublicKeyBytes },
}

/// Dense snapshot of the validator fields the hot loops need.
///
/// Refreshed separately from the committee tables: effective-balance updates
/// invalidate it, but never the committees, which are sealed by their seed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FlatValidator {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl From<&Validator> for FlatValidator {
    fn from(validator: &Validator) -> Self {
        Self {
            effective_balance: validator.effective_balance,
            slashed: validator.slashed,
            activation_eligibility_epoch: validator.activation_eligibility_epoch,
            activation_epoch: validator.activation_epoch,
            exit_epoch: validator.exit_epoch,
            withdrawable_epoch: validator.withdrawable_epoch,
        }
    }
}

#[derive(Clone, Debug)]
struct ShufflingEpoch {
    epoch: Epoch,
    active_indices: Arc<[ValidatorIndex]>,
    /// Active indices permuted by the epoch's attester seed.
    /// Committees are contiguous slices of this.
    shuffled_indices: Arc<[ValidatorIndex]>,
    committees_per_slot: u64,
}

impl ShufflingEpoch {
    fn new<P: Preset>(state: &impl BeaconState<P>, epoch: Epoch) -> Self {
        let active_indices: Arc<[ValidatorIndex]> =
            accessors::get_active_validator_indices(state, epoch).into();

        let seed = accessors::get_seed(state, epoch, DOMAIN_BEACON_ATTESTER);

        let mut shuffled_indices = active_indices.to_vec();
        shuffling::shuffle_slice::<P, _>(&mut shuffled_indices, seed);

        let committees_per_slot =
            misc::compute_committee_count::<P>(active_indices.len() as u64);

        Self {
            epoch,
            active_indices,
            shuffled_indices: shuffled_indices.into(),
            committees_per_slot,
        }
    }

    fn committee(&self, slot_in_epoch: u64, committee_index: CommitteeIndex, slots_per_epoch: u64) -> Result<&[ValidatorIndex], Error> {
        if committee_index >= self.committees_per_slot {
            return Err(Error::CommitteeIndexOutOfBounds {
                committee_index,
                committees_per_slot: self.committees_per_slot,
            });
        }

        let committees_per_epoch = self.committees_per_slot * slots_per_epoch;
        let global_index = slot_in_epoch * self.committees_per_slot + committee_index;
        let validator_count = self.shuffled_indices.len() as u64;

        let start = validator_count * global_index / committees_per_epoch;
        let end = validator_count * (global_index + 1) / committees_per_epoch;

        Ok(&self.shuffled_indices[usize::try_from(start).expect("committee bounds fit in usize")
            ..usize::try_from(end).expect("committee bounds fit in usize")])
    }
}

#[derive(Clone)]
pub struct EpochContext<P: Preset> {
    current_epoch: Epoch,
    previous: ShufflingEpoch,
    current: ShufflingEpoch,
    total_active_balance: Gwei,
    total_active_balance_sqrt: u64,
    /// One proposer per slot of the current epoch.
    proposer_indices: Box<[ValidatorIndex]>,
    /// Validator indices behind the current sync committee's pubkeys,
    /// with repetitions. Only present after `load_sync_committee`.
    sync_committee_indices: Option<Arc<[ValidatorIndex]>>,
    flats: Box<[FlatValidator]>,
    pubkey_to_index: im::HashMap<PublicKeyBytes, ValidatorIndex>,
    phantom: PhantomData<P>,
}

impl<P: Preset> EpochContext<P> {
    /// Computes a fresh context for the state's current epoch.
    pub fn new(state: &impl BeaconState<P>) -> Result<Self> {
        let current_epoch = accessors::get_current_epoch(state);
        let previous_epoch = accessors::get_previous_epoch(state);

        let current = ShufflingEpoch::new(state, current_epoch);
        let previous = if previous_epoch == current_epoch {
            current.clone()
        } else {
            ShufflingEpoch::new(state, previous_epoch)
        };

        let pubkey_to_index = state
            .validators()
            .iter()
            .zip(0..)
            .map(|(validator, index)| (validator.pubkey.to_bytes(), index))
            .collect();

        let mut context = Self {
            current_epoch,
            previous,
            current,
            total_active_balance: 0,
            total_active_balance_sqrt: 0,
            proposer_indices: Box::default(),
            sync_committee_indices: None,
            flats: Box::default(),
            pubkey_to_index,
            phantom: PhantomData,
        };

        context.refresh_flats(state);
        context.recompute_stake_and_proposers(state);

        Ok(context)
    }

    /// Advances the context across the epoch boundary the state has just
    /// passed. Must be called with the post-epoch-processing state, after its
    /// slot has been incremented into the new epoch.
    pub fn rotate_through_epoch(&mut self, state: &impl BeaconState<P>) -> Result<()> {
        let new_epoch = accessors::get_current_epoch(state);

        debug_assert_eq!(new_epoch, self.current_epoch + 1);

        self.previous = core::mem::replace(
            &mut self.current,
            ShufflingEpoch::new(state, new_epoch),
        );
        self.current_epoch = new_epoch;
        self.sync_committee_indices = None;

        self.refresh_flats(state);
        self.recompute_stake_and_proposers(state);

        Ok(())
    }

    /// Re-snapshots the flat validator table. Needed after registry changes
    /// and effective-balance updates; committee tables stay valid.
    pub fn refresh_flats(&mut self, state: &impl BeaconState<P>) {
        self.flats = state.validators().iter().map(FlatValidator::from).collect();
    }

    fn recompute_stake_and_proposers(&mut self, state: &impl BeaconState<P>) {
        let flats = &self.flats;

        self.total_active_balance = self
            .current
            .active_indices
            .iter()
            .map(|index| flats[usize::try_from(*index).expect("index fits in usize")].effective_balance)
            .sum::<Gwei>()
            .max(P::EFFECTIVE_BALANCE_INCREMENT);

        self.total_active_balance_sqrt = self.total_active_balance.integer_sqrt();

        let seed = accessors::get_seed(state, self.current_epoch, DOMAIN_BEACON_PROPOSER);
        let epoch_start = misc::compute_start_slot_at_epoch::<P>(self.current_epoch);

        self.proposer_indices = (epoch_start..epoch_start + P::slots_per_epoch())
            .map(|slot| {
                misc::compute_proposer_index::<P, _>(
                    hashing::hash_256_64(seed, slot),
                    &self.current.active_indices,
                    |index| flats[usize::try_from(index).expect("index fits in usize")].effective_balance,
                )
            })
            .collect();
    }

    /// Resolves the stored sync committee's pubkeys to validator indices.
    pub fn load_sync_committee(&mut self, committee: &SyncCommittee<P>) -> Result<()> {
        let indices = committee
            .pubkeys
            .iter()
            .map(|pubkey| self.validator_index(*pubkey))
            .collect::<Result<Arc<[_]>, _>>()?;

        self.sync_committee_indices = Some(indices);

        Ok(())
    }

    #[must_use]
    pub const fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }

    #[must_use]
    pub fn previous_epoch(&self) -> Epoch {
        self.previous.epoch
    }

    #[must_use]
    pub const fn total_active_balance(&self) -> Gwei {
        self.total_active_balance
    }

    #[must_use]
    pub const fn total_active_balance_sqrt(&self) -> u64 {
        self.total_active_balance_sqrt
    }

    #[must_use]
    pub fn flats(&self) -> &[FlatValidator] {
        &self.flats
    }

    pub fn attestation_epoch(&self, epoch: Epoch) -> Result<AttestationEpoch, Error> {
        if epoch == self.current_epoch {
            Ok(AttestationEpoch::Current)
        } else if epoch == self.previous.epoch {
            Ok(AttestationEpoch::Previous)
        } else {
            Err(Error::EpochNotCovered {
                epoch,
                current_epoch: self.current_epoch,
            })
        }
    }

    #[must_use]
    pub fn active_validator_indices(&self, attestation_epoch: AttestationEpoch) -> &[ValidatorIndex] {
        match attestation_epoch {
            AttestationEpoch::Previous => &self.previous.active_indices,
            AttestationEpoch::Current => &self.current.active_indices,
        }
    }

    pub fn committee_count_per_slot(&self, epoch: Epoch) -> Result<u64, Error> {
        Ok(match self.attestation_epoch(epoch)? {
            AttestationEpoch::Previous => self.previous.committees_per_slot,
            AttestationEpoch::Current => self.current.committees_per_slot,
        })
    }

    pub fn beacon_committee(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Result<&[ValidatorIndex], Error> {
        let epoch = misc::compute_epoch_at_slot::<P>(slot);

        let shuffling = match self.attestation_epoch(epoch)? {
            AttestationEpoch::Previous => &self.previous,
            AttestationEpoch::Current => &self.current,
        };

        shuffling.committee(
            slot % P::slots_per_epoch(),
            committee_index,
            P::slots_per_epoch(),
        )
    }

    pub fn proposer_index(&self, slot: Slot) -> Result<ValidatorIndex, Error> {
        let epoch = misc::compute_epoch_at_slot::<P>(slot);

        if epoch != self.current_epoch {
            return Err(Error::EpochNotCovered {
                epoch,
                current_epoch: self.current_epoch,
            });
        }

        let slot_in_epoch = slot % P::slots_per_epoch();

        Ok(self.proposer_indices[usize::try_from(slot_in_epoch).expect("slot index fits in usize")])
    }

    pub fn current_sync_committee_indices(&self) -> Result<&[ValidatorIndex], Error> {
        self.sync_committee_indices
            .as_deref()
            .ok_or(Error::SyncCommitteeNotLoaded)
    }

    pub fn validator_index(&self, pubkey: PublicKeyBytes) -> Result<ValidatorIndex, Error> {
        self.pubkey_to_index
            .get(&pubkey)
            .copied()
            .ok_or(Error::UnknownPubkey { pubkey })
    }

    /// Records a validator created by a deposit.
    pub fn register_validator(&mut self, pubkey: PublicKeyBytes, validator_index: ValidatorIndex) {
        self.pubkey_to_index.insert(pubkey, validator_index);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use types::{
        phase0::{beacon_state::BeaconState as Phase0BeaconState, consts::FAR_FUTURE_EPOCH,
            containers::Validator},
        preset::{Minimal, Preset as _},
    };

    use super::*;

    fn state_with_validators(count: u64) -> Phase0BeaconState<Minimal> {
        let mut state = Phase0BeaconState::<Minimal>::default();

        for index in 0..count {
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

    #[test]
    fn committees_partition_the_active_validators() {
        let state = state_with_validators(64);
        let context = EpochContext::new(&state).expect("the registry is well-formed");

        let mut seen = HashSet::new();

        for slot in 0..Minimal::slots_per_epoch() {
            let committees_per_slot = context
                .committee_count_per_slot(0)
                .expect("epoch 0 is the current epoch");

            for committee_index in 0..committees_per_slot {
                for validator_index in context
                    .beacon_committee(slot, committee_index)
                    .expect("committee exists")
                {
                    assert!(seen.insert(*validator_index), "validator assigned twice");
                }
            }
        }

        assert_eq!(seen.len(), 64);
    }

    #[test]
    fn proposers_are_scheduled_for_every_slot_of_the_current_epoch() {
        let state = state_with_validators(64);
        let context = EpochContext::new(&state).expect("the registry is well-formed");

        for slot in 0..Minimal::slots_per_epoch() {
            let proposer = context.proposer_index(slot).expect("slot is in the epoch");
            assert!(proposer < 64);
        }

        assert!(matches!(
            context.proposer_index(Minimal::slots_per_epoch()),
            Err(Error::EpochNotCovered { .. }),
        ));
    }

    #[test]
    fn rotation_matches_a_fresh_context() {
        let mut state = state_with_validators(64);
        let mut rotated = EpochContext::new(&state).expect("the registry is well-formed");

        state.slot = Minimal::slots_per_epoch();
        rotated
            .rotate_through_epoch(&state)
            .expect("rotating into epoch 1 succeeds");

        let fresh = EpochContext::new(&state).expect("the registry is well-formed");

        assert_eq!(rotated.current_epoch(), fresh.current_epoch());
        assert_eq!(rotated.previous_epoch(), fresh.previous_epoch());
        assert_eq!(rotated.total_active_balance(), fresh.total_active_balance());

        for slot in Minimal::slots_per_epoch()..Minimal::slots_per_epoch() * 2 {
            assert_eq!(
                rotated.proposer_index(slot).expect("slot is in the epoch"),
                fresh.proposer_index(slot).expect("slot is in the epoch"),
            );

            assert_eq!(
                rotated.beacon_committee(slot, 0).expect("committee exists"),
                fresh.beacon_committee(slot, 0).expect("committee exists"),
            );
        }

        // The rotated context still covers epoch 0 attestations.
        assert_eq!(
            rotated.attestation_epoch(0).expect("epoch 0 is previous"),
            AttestationEpoch::Previous,
        );
    }

    #[test]
    fn total_active_balance_counts_only_active_validators() {
        let mut state = state_with_validators(8);

        // Exit one validator before epoch 0.
        state.validators.get_mut(3).expect("index 3 exists").exit_epoch = 0;

        let context = EpochContext::new(&state).expect("the registry is well-formed");

        assert_eq!(
            context.total_active_balance(),
            7 * Minimal::MAX_EFFECTIVE_BALANCE,
        );
        assert_eq!(
            context.active_validator_indices(AttestationEpoch::Current).len(),
            7,
        );
    }

    #[test]
    fn pubkeys_resolve_to_indices() {
        let state = state_with_validators(4);
        let mut context = EpochContext::new(&state).expect("the registry is well-formed");

        let pubkey = state.validators.get(2).expect("index 2 exists").pubkey.to_bytes();
        assert_eq!(context.validator_index(pubkey), Ok(2));

        let unknown = PublicKeyBytes::from_low_u64_be(999);
        assert!(matches!(
            context.validator_index(unknown),
            Err(Error::UnknownPubkey { .. }),
        ));

        context.register_validator(unknown, 4);
        assert_eq!(context.validator_index(unknown), Ok(4));
    }
}
