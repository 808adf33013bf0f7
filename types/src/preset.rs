//! Compile-time presets and their serializable forms.
//!
//! Sizes that appear in SSZ schemas are associated `typenum` types so that
//! serialized lengths and Merkle tree shapes are fixed at compile time.
//! Everything else is a constant. The serializable structs at the bottom
//! mirror the preset files distributed with consensus configurations.

use core::fmt::Debug;

use serde::{Deserialize, Serialize};
use typenum::{
    op, NonZero, Unsigned, U1024, U128, U16, U2, U2048, U256, U32, U512, U64, U8, U8192, U65536,
};

use crate::phase0::primitives::{Epoch, Gwei, Slot};

// The large powers of two used as collection limits. `typenum` predefines
// constants only up to 1024, so the rest are spelled as products.
pub type TwoToThe40 = op!(U1024 * U1024 * U1024 * U1024);
pub type TwoToThe30 = op!(U1024 * U1024 * U1024);
pub type TwoToThe24 = op!(U1024 * U1024 * U16);
pub type TwoToThe20 = op!(U1024 * U1024);

pub trait Preset:
    Copy + Clone + PartialEq + Eq + Default + Debug + Send + Sync + 'static
{
    // Sizes that parameterize SSZ schemas.
    type SlotsPerEpoch: Unsigned + NonZero + PartialEq + Eq + Debug + Default + Send + Sync;
    type SlotsPerHistoricalRoot: Unsigned + NonZero + PartialEq + Eq + Debug + Default + Send + Sync;
    type EpochsPerHistoricalVector: Unsigned + NonZero + PartialEq + Eq + Debug + Default + Send + Sync;
    type EpochsPerSlashingsVector: Unsigned + NonZero + PartialEq + Eq + Debug + Default + Send + Sync;
    type HistoricalRootsLimit: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type ValidatorRegistryLimit: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    /// `EPOCHS_PER_ETH1_VOTING_PERIOD * SLOTS_PER_EPOCH`.
    type Eth1DataVotesBound: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    /// `MAX_ATTESTATIONS * SLOTS_PER_EPOCH`.
    type EpochAttestationsBound: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxValidatorsPerCommittee: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxProposerSlashings: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxAttesterSlashings: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxAttestations: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxDeposits: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxVoluntaryExits: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type SyncCommitteeSize: Unsigned + NonZero + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxBytesPerTransaction: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxTransactionsPerPayload: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;
    type BytesPerLogsBloom: Unsigned + NonZero + PartialEq + Eq + Debug + Default + Send + Sync;
    type MaxExtraDataBytes: Unsigned + PartialEq + Eq + Debug + Default + Send + Sync;

    const BASE: &'static str;

    // > Misc
    const MAX_COMMITTEES_PER_SLOT: u64 = 64;
    const TARGET_COMMITTEE_SIZE: u64 = 128;
    const SHUFFLE_ROUND_COUNT: u8 = 90;

    // > Balance math
    const HYSTERESIS_QUOTIENT: u64 = 4;
    const HYSTERESIS_DOWNWARD_MULTIPLIER: u64 = 1;
    const HYSTERESIS_UPWARD_MULTIPLIER: u64 = 5;

    // > Gwei values
    const MIN_DEPOSIT_AMOUNT: Gwei = 1_000_000_000;
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const EFFECTIVE_BALANCE_INCREMENT: Gwei = 1_000_000_000;

    // > Time parameters
    const MIN_ATTESTATION_INCLUSION_DELAY: Slot = 1;
    const MIN_SEED_LOOKAHEAD: Epoch = 1;
    const MAX_SEED_LOOKAHEAD: Epoch = 4;
    const EPOCHS_PER_ETH1_VOTING_PERIOD: Epoch = 64;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: Epoch = 4;

    // > Reward and penalty quotients
    const BASE_REWARD_FACTOR: u64 = 64;
    const WHISTLEBLOWER_REWARD_QUOTIENT: u64 = 512;
    const PROPOSER_REWARD_QUOTIENT: u64 = 8;
    const INACTIVITY_PENALTY_QUOTIENT: u64 = 1 << 26;
    const MIN_SLASHING_PENALTY_QUOTIENT: u64 = 128;
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 1;

    // > Altair
    const INACTIVITY_PENALTY_QUOTIENT_ALTAIR: u64 = 3 * (1 << 24);
    const MIN_SLASHING_PENALTY_QUOTIENT_ALTAIR: u64 = 64;
    const PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR: u64 = 2;
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: Epoch = 256;
    const MIN_SYNC_COMMITTEE_PARTICIPANTS: u64 = 1;

    // > Bellatrix
    const INACTIVITY_PENALTY_QUOTIENT_BELLATRIX: u64 = 1 << 24;
    const MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX: u64 = 32;
    const PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX: u64 = 3;

    // > Sharding (configuration data only; no sharding containers exist yet)
    const MAX_SHARDS: u64 = 1024;
    const INITIAL_ACTIVE_SHARDS: u64 = 64;
    const SAMPLE_PRICE_ADJUSTMENT_COEFFICIENT: u64 = 8;
    const MAX_SHARD_PROPOSER_SLASHINGS: u64 = 16;
    const MAX_SHARD_HEADERS_PER_SHARD: u64 = 4;
    const SHARD_STATE_MEMORY_SLOTS: Slot = 256;
    const BLOB_BUILDER_REGISTRY_LIMIT: u64 = 1 << 40;
    const MAX_SAMPLES_PER_BLOCK: u64 = 2048;
    const TARGET_SAMPLES_PER_BLOCK: u64 = 1024;
    const MAX_SAMPLE_PRICE: Gwei = 1 << 33;
    const MIN_SAMPLE_PRICE: Gwei = 8;

    #[must_use]
    fn slots_per_epoch() -> u64 {
        Self::SlotsPerEpoch::U64
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    type SlotsPerEpoch = U32;
    type SlotsPerHistoricalRoot = U8192;
    type EpochsPerHistoricalVector = U65536;
    type EpochsPerSlashingsVector = U8192;
    type HistoricalRootsLimit = TwoToThe24;
    type ValidatorRegistryLimit = TwoToThe40;
    type Eth1DataVotesBound = U2048;
    type EpochAttestationsBound = op!(U2048 * U2);
    type MaxValidatorsPerCommittee = U2048;
    type MaxProposerSlashings = U16;
    type MaxAttesterSlashings = U2;
    type MaxAttestations = U128;
    type MaxDeposits = U16;
    type MaxVoluntaryExits = U16;
    type SyncCommitteeSize = U512;
    type MaxBytesPerTransaction = TwoToThe30;
    type MaxTransactionsPerPayload = TwoToThe20;
    type BytesPerLogsBloom = U256;
    type MaxExtraDataBytes = U32;

    const BASE: &'static str = "mainnet";
}

static_assertions::assert_impl_all!(Mainnet: Preset);
static_assertions::assert_impl_all!(Minimal: Preset);

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    type SlotsPerEpoch = U8;
    type SlotsPerHistoricalRoot = U64;
    type EpochsPerHistoricalVector = U64;
    type EpochsPerSlashingsVector = U64;
    type HistoricalRootsLimit = TwoToThe24;
    type ValidatorRegistryLimit = TwoToThe40;
    type Eth1DataVotesBound = U32;
    type EpochAttestationsBound = U1024;
    type MaxValidatorsPerCommittee = U2048;
    type MaxProposerSlashings = U16;
    type MaxAttesterSlashings = U2;
    type MaxAttestations = U128;
    type MaxDeposits = U16;
    type MaxVoluntaryExits = U16;
    type SyncCommitteeSize = U32;
    type MaxBytesPerTransaction = TwoToThe30;
    type MaxTransactionsPerPayload = TwoToThe20;
    type BytesPerLogsBloom = U256;
    type MaxExtraDataBytes = U32;

    const BASE: &'static str = "minimal";

    const MAX_COMMITTEES_PER_SLOT: u64 = 4;
    const TARGET_COMMITTEE_SIZE: u64 = 4;
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const EPOCHS_PER_ETH1_VOTING_PERIOD: Epoch = 4;
    const INACTIVITY_PENALTY_QUOTIENT: u64 = 1 << 25;
    const MIN_SLASHING_PENALTY_QUOTIENT: u64 = 64;
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 2;
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: Epoch = 8;

    const MAX_SHARDS: u64 = 8;
    const INITIAL_ACTIVE_SHARDS: u64 = 2;
    const MAX_SHARD_PROPOSER_SLASHINGS: u64 = 4;
}

/// Serializable form of the phase0 preset, as found in preset files.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct Phase0Preset {
    #[serde(with = "serde_utils::string_or_native")]
    max_committees_per_slot: u64,
    #[serde(with = "serde_utils::string_or_native")]
    target_committee_size: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_validators_per_committee: u64,
    #[serde(with = "serde_utils::string_or_native")]
    shuffle_round_count: u64,
    #[serde(with = "serde_utils::string_or_native")]
    hysteresis_quotient: u64,
    #[serde(with = "serde_utils::string_or_native")]
    hysteresis_downward_multiplier: u64,
    #[serde(with = "serde_utils::string_or_native")]
    hysteresis_upward_multiplier: u64,
    #[serde(with = "serde_utils::string_or_native")]
    min_deposit_amount: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    max_effective_balance: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    effective_balance_increment: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    min_attestation_inclusion_delay: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    slots_per_epoch: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    min_seed_lookahead: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    max_seed_lookahead: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    epochs_per_eth1_voting_period: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    slots_per_historical_root: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    min_epochs_to_inactivity_penalty: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    epochs_per_historical_vector: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    epochs_per_slashings_vector: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    historical_roots_limit: u64,
    #[serde(with = "serde_utils::string_or_native")]
    validator_registry_limit: u64,
    #[serde(with = "serde_utils::string_or_native")]
    base_reward_factor: u64,
    #[serde(with = "serde_utils::string_or_native")]
    whistleblower_reward_quotient: u64,
    #[serde(with = "serde_utils::string_or_native")]
    proposer_reward_quotient: u64,
    #[serde(with = "serde_utils::string_or_native")]
    inactivity_penalty_quotient: u64,
    #[serde(with = "serde_utils::string_or_native")]
    min_slashing_penalty_quotient: u64,
    #[serde(with = "serde_utils::string_or_native")]
    proportional_slashing_multiplier: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_proposer_slashings: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_attester_slashings: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_attestations: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_deposits: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_voluntary_exits: u64,
}

impl Phase0Preset {
    #[must_use]
    pub fn new<P: Preset>() -> Self {
        Self {
            max_committees_per_slot: P::MAX_COMMITTEES_PER_SLOT,
            target_committee_size: P::TARGET_COMMITTEE_SIZE,
            max_validators_per_committee: P::MaxValidatorsPerCommittee::U64,
            shuffle_round_count: P::SHUFFLE_ROUND_COUNT.into(),
            hysteresis_quotient: P::HYSTERESIS_QUOTIENT,
            hysteresis_downward_multiplier: P::HYSTERESIS_DOWNWARD_MULTIPLIER,
            hysteresis_upward_multiplier: P::HYSTERESIS_UPWARD_MULTIPLIER,
            min_deposit_amount: P::MIN_DEPOSIT_AMOUNT,
            max_effective_balance: P::MAX_EFFECTIVE_BALANCE,
            effective_balance_increment: P::EFFECTIVE_BALANCE_INCREMENT,
            min_attestation_inclusion_delay: P::MIN_ATTESTATION_INCLUSION_DELAY,
            slots_per_epoch: P::slots_per_epoch(),
            min_seed_lookahead: P::MIN_SEED_LOOKAHEAD,
            max_seed_lookahead: P::MAX_SEED_LOOKAHEAD,
            epochs_per_eth1_voting_period: P::EPOCHS_PER_ETH1_VOTING_PERIOD,
            slots_per_historical_root: P::SlotsPerHistoricalRoot::U64,
            min_epochs_to_inactivity_penalty: P::MIN_EPOCHS_TO_INACTIVITY_PENALTY,
            epochs_per_historical_vector: P::EpochsPerHistoricalVector::U64,
            epochs_per_slashings_vector: P::EpochsPerSlashingsVector::U64,
            historical_roots_limit: P::HistoricalRootsLimit::U64,
            validator_registry_limit: P::ValidatorRegistryLimit::U64,
            base_reward_factor: P::BASE_REWARD_FACTOR,
            whistleblower_reward_quotient: P::WHISTLEBLOWER_REWARD_QUOTIENT,
            proposer_reward_quotient: P::PROPOSER_REWARD_QUOTIENT,
            inactivity_penalty_quotient: P::INACTIVITY_PENALTY_QUOTIENT,
            min_slashing_penalty_quotient: P::MIN_SLASHING_PENALTY_QUOTIENT,
            proportional_slashing_multiplier: P::PROPORTIONAL_SLASHING_MULTIPLIER,
            max_proposer_slashings: P::MaxProposerSlashings::U64,
            max_attester_slashings: P::MaxAttesterSlashings::U64,
            max_attestations: P::MaxAttestations::U64,
            max_deposits: P::MaxDeposits::U64,
            max_voluntary_exits: P::MaxVoluntaryExits::U64,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct AltairPreset {
    #[serde(with = "serde_utils::string_or_native")]
    inactivity_penalty_quotient_altair: u64,
    #[serde(with = "serde_utils::string_or_native")]
    min_slashing_penalty_quotient_altair: u64,
    #[serde(with = "serde_utils::string_or_native")]
    proportional_slashing_multiplier_altair: u64,
    #[serde(with = "serde_utils::string_or_native")]
    sync_committee_size: u64,
    #[serde(with = "serde_utils::string_or_native")]
    epochs_per_sync_committee_period: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    min_sync_committee_participants: u64,
}

impl AltairPreset {
    #[must_use]
    pub fn new<P: Preset>() -> Self {
        Self {
            inactivity_penalty_quotient_altair: P::INACTIVITY_PENALTY_QUOTIENT_ALTAIR,
            min_slashing_penalty_quotient_altair: P::MIN_SLASHING_PENALTY_QUOTIENT_ALTAIR,
            proportional_slashing_multiplier_altair: P::PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR,
            sync_committee_size: P::SyncCommitteeSize::U64,
            epochs_per_sync_committee_period: P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD,
            min_sync_committee_participants: P::MIN_SYNC_COMMITTEE_PARTICIPANTS,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct BellatrixPreset {
    #[serde(with = "serde_utils::string_or_native")]
    inactivity_penalty_quotient_bellatrix: u64,
    #[serde(with = "serde_utils::string_or_native")]
    min_slashing_penalty_quotient_bellatrix: u64,
    #[serde(with = "serde_utils::string_or_native")]
    proportional_slashing_multiplier_bellatrix: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_bytes_per_transaction: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_transactions_per_payload: u64,
    #[serde(with = "serde_utils::string_or_native")]
    bytes_per_logs_bloom: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_extra_data_bytes: u64,
}

impl BellatrixPreset {
    #[must_use]
    pub fn new<P: Preset>() -> Self {
        Self {
            inactivity_penalty_quotient_bellatrix: P::INACTIVITY_PENALTY_QUOTIENT_BELLATRIX,
            min_slashing_penalty_quotient_bellatrix: P::MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX,
            proportional_slashing_multiplier_bellatrix: P::PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX,
            max_bytes_per_transaction: P::MaxBytesPerTransaction::U64,
            max_transactions_per_payload: P::MaxTransactionsPerPayload::U64,
            bytes_per_logs_bloom: P::BytesPerLogsBloom::U64,
            max_extra_data_bytes: P::MaxExtraDataBytes::U64,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct ShardingPreset {
    #[serde(with = "serde_utils::string_or_native")]
    max_shards: u64,
    #[serde(with = "serde_utils::string_or_native")]
    initial_active_shards: u64,
    #[serde(with = "serde_utils::string_or_native")]
    sample_price_adjustment_coefficient: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_shard_proposer_slashings: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_shard_headers_per_shard: u64,
    #[serde(with = "serde_utils::string_or_native")]
    shard_state_memory_slots: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    blob_builder_registry_limit: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_samples_per_block: u64,
    #[serde(with = "serde_utils::string_or_native")]
    target_samples_per_block: u64,
    #[serde(with = "serde_utils::string_or_native")]
    max_sample_price: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    min_sample_price: Gwei,
}

impl ShardingPreset {
    #[must_use]
    pub fn new<P: Preset>() -> Self {
        Self {
            max_shards: P::MAX_SHARDS,
            initial_active_shards: P::INITIAL_ACTIVE_SHARDS,
            sample_price_adjustment_coefficient: P::SAMPLE_PRICE_ADJUSTMENT_COEFFICIENT,
            max_shard_proposer_slashings: P::MAX_SHARD_PROPOSER_SLASHINGS,
            max_shard_headers_per_shard: P::MAX_SHARD_HEADERS_PER_SHARD,
            shard_state_memory_slots: P::SHARD_STATE_MEMORY_SLOTS,
            blob_builder_registry_limit: P::BLOB_BUILDER_REGISTRY_LIMIT,
            max_samples_per_block: P::MAX_SAMPLES_PER_BLOCK,
            target_samples_per_block: P::TARGET_SAMPLES_PER_BLOCK,
            max_sample_price: P::MAX_SAMPLE_PRICE,
            min_sample_price: P::MIN_SAMPLE_PRICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_sizes_are_consistent() {
        assert_eq!(Mainnet::slots_per_epoch(), 32);
        assert_eq!(
            <Mainnet as Preset>::Eth1DataVotesBound::U64,
            Mainnet::EPOCHS_PER_ETH1_VOTING_PERIOD * Mainnet::slots_per_epoch(),
        );
        assert_eq!(
            <Mainnet as Preset>::EpochAttestationsBound::U64,
            <Mainnet as Preset>::MaxAttestations::U64 * Mainnet::slots_per_epoch(),
        );
        assert_eq!(<Mainnet as Preset>::ValidatorRegistryLimit::U64, 1 << 40);
    }

    #[test]
    fn minimal_sizes_are_consistent() {
        assert_eq!(Minimal::slots_per_epoch(), 8);
        assert_eq!(
            <Minimal as Preset>::Eth1DataVotesBound::U64,
            Minimal::EPOCHS_PER_ETH1_VOTING_PERIOD * Minimal::slots_per_epoch(),
        );
        assert_eq!(
            <Minimal as Preset>::EpochAttestationsBound::U64,
            <Minimal as Preset>::MaxAttestations::U64 * Minimal::slots_per_epoch(),
        );
    }

    #[test]
    fn preset_values_survive_serde() {
        let phase0 = Phase0Preset::new::<Minimal>();
        let yaml = serde_yaml::to_string(&phase0).expect("serializable");

        assert!(yaml.contains("SLOTS_PER_EPOCH: '8'"));
        assert_eq!(
            serde_yaml::from_str::<Phase0Preset>(&yaml).expect("deserializable"),
            phase0,
        );
    }

    #[test]
    fn unknown_preset_keys_are_rejected() {
        let mut yaml = serde_yaml::to_string(&AltairPreset::new::<Mainnet>()).expect("serializable");
        yaml.push_str("BOGUS_KEY: '1'\n");

        assert!(serde_yaml::from_str::<AltairPreset>(&yaml).is_err());
    }
}
