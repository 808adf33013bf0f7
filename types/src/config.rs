use serde::{Deserialize, Serialize};
use ssz::{SszHash as _, Uint256};
use thiserror::Error;

use crate::{
    nonstandard::Phase,
    phase0::{
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        containers::ForkData,
        primitives::{
            Epoch, ExecutionAddress, ForkDigest, Gwei, Slot, UnixSeconds, Version, H256,
        },
    },
    preset::Preset,
};

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ConfigError {
    #[error("fork epochs are not in activation order")]
    ForkEpochsNotOrdered,
    #[error("PRESET_BASE {actual:?} does not match the compiled preset {expected:?}")]
    PresetBaseMismatch {
        expected: &'static str,
        actual: String,
    },
}

/// Runtime configuration: genesis parameters, the fork schedule, and the
/// validator-cycle constants that vary between networks sharing a preset.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct Config {
    pub preset_base: String,

    // > Genesis
    #[serde(with = "serde_utils::string_or_native")]
    pub min_genesis_active_validator_count: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_genesis_time: UnixSeconds,
    pub genesis_fork_version: Version,
    #[serde(with = "serde_utils::string_or_native")]
    pub genesis_delay: UnixSeconds,

    // > Altair
    pub altair_fork_version: Version,
    #[serde(with = "serde_utils::string_or_native")]
    pub altair_fork_epoch: Epoch,

    // > Bellatrix
    pub bellatrix_fork_version: Version,
    #[serde(with = "serde_utils::string_or_native")]
    pub bellatrix_fork_epoch: Epoch,

    // > Sharding
    pub sharding_fork_version: Version,
    #[serde(with = "serde_utils::string_or_native")]
    pub sharding_fork_epoch: Epoch,

    // > Merge transition
    pub terminal_total_difficulty: Uint256,
    pub terminal_block_hash: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub terminal_block_hash_activation_epoch: Epoch,

    // > Time parameters
    #[serde(with = "serde_utils::string_or_native")]
    pub seconds_per_slot: UnixSeconds,
    #[serde(with = "serde_utils::string_or_native")]
    pub seconds_per_eth1_block: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_validator_withdrawability_delay: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub shard_committee_period: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub eth1_follow_distance: u64,

    // > Validator cycle
    #[serde(with = "serde_utils::string_or_native")]
    pub inactivity_score_bias: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub inactivity_score_recovery_rate: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub ejection_balance: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_per_epoch_churn_limit: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub churn_limit_quotient: u64,

    // > Fork choice
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_score_boost: u64,

    // > Deposit contract
    #[serde(with = "serde_utils::string_or_native")]
    pub deposit_chain_id: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub deposit_network_id: u64,
    pub deposit_contract_address: ExecutionAddress,
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            preset_base: "mainnet".into(),
            min_genesis_active_validator_count: 1 << 14,
            min_genesis_time: 1_606_824_000,
            genesis_fork_version: Version::zero(),
            genesis_delay: 604_800,
            altair_fork_version: Version::from_slice(&[0x01, 0x00, 0x00, 0x00]),
            altair_fork_epoch: 74_240,
            bellatrix_fork_version: Version::from_slice(&[0x02, 0x00, 0x00, 0x00]),
            bellatrix_fork_epoch: 144_896,
            sharding_fork_version: Version::from_slice(&[0x03, 0x00, 0x00, 0x00]),
            sharding_fork_epoch: FAR_FUTURE_EPOCH,
            terminal_total_difficulty: Uint256::from_dec_str("58750000000000000000000")
                .expect("the terminal total difficulty literal is valid"),
            terminal_block_hash: H256::zero(),
            terminal_block_hash_activation_epoch: FAR_FUTURE_EPOCH,
            seconds_per_slot: 12,
            seconds_per_eth1_block: 14,
            min_validator_withdrawability_delay: 256,
            shard_committee_period: 256,
            eth1_follow_distance: 2048,
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,
            ejection_balance: 16_000_000_000,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 1 << 16,
            proposer_score_boost: 40,
            deposit_chain_id: 1,
            deposit_network_id: 1,
            deposit_contract_address: ExecutionAddress::from_slice(&[
                0x00, 0x00, 0x00, 0x00, 0x21, 0x9a, 0xb5, 0x40, 0x35, 0x6c, 0xbb, 0x83, 0x9c,
                0xbe, 0x05, 0x30, 0x3d, 0x77, 0x05, 0xfa,
            ]),
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            preset_base: "minimal".into(),
            min_genesis_active_validator_count: 64,
            min_genesis_time: 1_578_009_600,
            genesis_fork_version: Version::from_slice(&[0x00, 0x00, 0x00, 0x01]),
            genesis_delay: 300,
            altair_fork_version: Version::from_slice(&[0x01, 0x00, 0x00, 0x01]),
            altair_fork_epoch: FAR_FUTURE_EPOCH,
            bellatrix_fork_version: Version::from_slice(&[0x02, 0x00, 0x00, 0x01]),
            bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
            sharding_fork_version: Version::from_slice(&[0x03, 0x00, 0x00, 0x01]),
            sharding_fork_epoch: FAR_FUTURE_EPOCH,
            terminal_total_difficulty: Uint256::ZERO,
            terminal_block_hash: H256::zero(),
            terminal_block_hash_activation_epoch: FAR_FUTURE_EPOCH,
            seconds_per_slot: 6,
            seconds_per_eth1_block: 14,
            min_validator_withdrawability_delay: 256,
            shard_committee_period: 64,
            eth1_follow_distance: 16,
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,
            ejection_balance: 16_000_000_000,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 1 << 16,
            proposer_score_boost: 40,
            deposit_chain_id: 5,
            deposit_network_id: 5,
            deposit_contract_address: ExecutionAddress::from_slice(&[
                0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56,
                0x78, 0x90, 0x12, 0x34, 0x56, 0x78, 0x90,
            ]),
        }
    }

    /// Configuration with every fork active from genesis.
    /// Convenient for exercising the newest transition logic.
    #[must_use]
    pub fn minimal_all_forks_at_genesis() -> Self {
        let mut config = Self::minimal();
        config.altair_fork_epoch = GENESIS_EPOCH;
        config.bellatrix_fork_epoch = GENESIS_EPOCH;
        config
    }

    pub fn validate<P: Preset>(&self) -> Result<(), ConfigError> {
        if self.preset_base != P::BASE {
            return Err(ConfigError::PresetBaseMismatch {
                expected: P::BASE,
                actual: self.preset_base.clone(),
            });
        }

        if self.altair_fork_epoch > self.bellatrix_fork_epoch
            || self.bellatrix_fork_epoch > self.sharding_fork_epoch
        {
            return Err(ConfigError::ForkEpochsNotOrdered);
        }

        Ok(())
    }

    #[must_use]
    pub fn phase_at_epoch(&self, epoch: Epoch) -> Phase {
        if epoch >= self.bellatrix_fork_epoch {
            Phase::Bellatrix
        } else if epoch >= self.altair_fork_epoch {
            Phase::Altair
        } else {
            Phase::Phase0
        }
    }

    #[must_use]
    pub fn phase_at_slot<P: Preset>(&self, slot: Slot) -> Phase {
        self.phase_at_epoch(slot / P::slots_per_epoch())
    }

    #[must_use]
    pub fn fork_version(&self, phase: Phase) -> Version {
        match phase {
            Phase::Phase0 => self.genesis_fork_version,
            Phase::Altair => self.altair_fork_version,
            Phase::Bellatrix => self.bellatrix_fork_version,
        }
    }

    #[must_use]
    pub fn fork_epoch(&self, phase: Phase) -> Epoch {
        match phase {
            Phase::Phase0 => GENESIS_EPOCH,
            Phase::Altair => self.altair_fork_epoch,
            Phase::Bellatrix => self.bellatrix_fork_epoch,
        }
    }

    /// Version in force at `epoch`, as in `compute_fork_version`.
    #[must_use]
    pub fn fork_version_at_epoch(&self, epoch: Epoch) -> Version {
        self.fork_version(self.phase_at_epoch(epoch))
    }

    /// Phases whose activation slot falls strictly after the genesis slot,
    /// paired with that slot. Used by the upgrade switch in slot processing.
    pub fn upgrade_slots<P: Preset>(&self) -> impl Iterator<Item = (Phase, Slot)> + '_ {
        [Phase::Altair, Phase::Bellatrix]
            .into_iter()
            .filter_map(|phase| {
                let epoch = self.fork_epoch(phase);

                if epoch == GENESIS_EPOCH || epoch == FAR_FUTURE_EPOCH {
                    return None;
                }

                epoch
                    .checked_mul(P::slots_per_epoch())
                    .map(|slot| (phase, slot))
            })
    }

    #[must_use]
    pub fn fork_digest(&self, phase: Phase, genesis_validators_root: H256) -> ForkDigest {
        compute_fork_digest(self.fork_version(phase), genesis_validators_root)
    }

    /// Maps a wire-level fork digest back to the phase whose block types
    /// it announces. Unknown digests belong to forks this build cannot decode.
    #[must_use]
    pub fn phase_by_fork_digest(
        &self,
        digest: ForkDigest,
        genesis_validators_root: H256,
    ) -> Option<Phase> {
        [Phase::Phase0, Phase::Altair, Phase::Bellatrix]
            .into_iter()
            .find(|phase| self.fork_digest(*phase, genesis_validators_root) == digest)
    }
}

/// `compute_fork_data_root` from the consensus specification.
#[must_use]
pub fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

/// First 4 bytes of the fork data root.
#[must_use]
pub fn compute_fork_digest(current_version: Version, genesis_validators_root: H256) -> ForkDigest {
    let root = compute_fork_data_root(current_version, genesis_validators_root);
    ForkDigest::from_slice(&root.as_bytes()[..4])
}

#[cfg(test)]
mod tests {
    use crate::preset::{Mainnet, Minimal};

    use super::*;

    #[test]
    fn configs_validate_against_their_presets() {
        Config::mainnet().validate::<Mainnet>().expect("valid");
        Config::minimal().validate::<Minimal>().expect("valid");

        assert!(Config::mainnet().validate::<Minimal>().is_err());
    }

    #[test]
    fn phases_follow_the_fork_schedule() {
        let config = Config::mainnet();

        assert_eq!(config.phase_at_epoch(0), Phase::Phase0);
        assert_eq!(config.phase_at_epoch(74_239), Phase::Phase0);
        assert_eq!(config.phase_at_epoch(74_240), Phase::Altair);
        assert_eq!(config.phase_at_epoch(144_896), Phase::Bellatrix);

        assert_eq!(
            config.fork_version_at_epoch(74_240),
            config.altair_fork_version,
        );
    }

    #[test]
    fn upgrade_slots_skip_unscheduled_forks() {
        let config = Config::minimal();
        assert_eq!(config.upgrade_slots::<Minimal>().count(), 0);

        let mut scheduled = Config::minimal();
        scheduled.altair_fork_epoch = 2;
        scheduled.bellatrix_fork_epoch = 4;

        assert_eq!(
            scheduled.upgrade_slots::<Minimal>().collect::<Vec<_>>(),
            vec![(Phase::Altair, 16), (Phase::Bellatrix, 32)],
        );
    }

    #[test]
    fn fork_digests_distinguish_forks() {
        let config = Config::minimal();
        let root = H256::repeat_byte(0x42);

        let digest = config.fork_digest(Phase::Altair, root);

        assert_eq!(
            config.phase_by_fork_digest(digest, root),
            Some(Phase::Altair),
        );
        assert_eq!(
            config.phase_by_fork_digest(digest, H256::zero()),
            None,
        );
    }

    #[test]
    fn yaml_round_trip_rejects_unknown_keys() {
        let config = Config::minimal();
        let yaml = serde_yaml::to_string(&config).expect("serializable");

        assert!(yaml.contains("PRESET_BASE: minimal"));
        assert!(yaml.contains("SECONDS_PER_SLOT: '6'"));

        assert_eq!(
            serde_yaml::from_str::<Config>(&yaml).expect("deserializable"),
            config,
        );

        let with_unknown = format!("{yaml}UNKNOWN_FIELD: '1'\n");
        assert!(serde_yaml::from_str::<Config>(&with_unknown).is_err());

        let missing_field = yaml.replace("DEPOSIT_CHAIN_ID: '5'\n", "");
        assert!(serde_yaml::from_str::<Config>(&missing_field).is_err());
    }
}
