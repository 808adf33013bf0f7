//! Genesis state construction from Eth1 deposits.

use std::collections::HashMap;

use anyhow::Result;
use ssz::{ContiguousList, Hc, SszHash as _};
use typenum::{op, U1024, U4096};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::GENESIS_EPOCH,
        containers::{BeaconBlockBody, BeaconBlockHeader, DepositData, Eth1Data, Fork},
        primitives::{UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use bls::PublicKeyBytes;
use helper_functions::accessors;
use transition_functions::unphased;

/// The deposit contract's Merkle tree has 2³² leaves.
type DepositDataList = ContiguousList<DepositData, op!(U1024 * U1024 * U4096)>;

/// `initialize_beacon_state_from_eth1`, with the deposit root recomputed
/// incrementally so that every deposit is applied against the root covering
/// it, exactly as on chain.
pub fn initialize_beacon_state_from_eth1<P: Preset>(
    config: &Config,
    eth1_block_hash: H256,
    eth1_timestamp: UnixSeconds,
    deposit_data: Vec<DepositData>,
) -> Result<Hc<BeaconState<P>>> {
    let mut state = BeaconState::<P> {
        genesis_time: eth1_timestamp + config.genesis_delay,
        fork: Fork {
            previous_version: config.genesis_fork_version,
            current_version: config.genesis_fork_version,
            epoch: GENESIS_EPOCH,
        },
        latest_block_header: BeaconBlockHeader {
            body_root: BeaconBlockBody::<P>::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        },
        // > Seed RANDAO with Eth1 entropy
        randao_mixes: ssz::PersistentVector::repeat(eth1_block_hash),
        ..BeaconState::default()
    };

    // > Process deposits
    let mut deposit_data_list = DepositDataList::default();
    let mut validator_index_by_pubkey = HashMap::<PublicKeyBytes, ValidatorIndex>::new();

    for data in deposit_data {
        deposit_data_list.push(data)?;

        state.eth1_data = Eth1Data {
            deposit_root: deposit_data_list.hash_tree_root(),
            deposit_count: deposit_data_list.len() as u64,
            block_hash: eth1_block_hash,
        };

        let existing_index = validator_index_by_pubkey.get(&data.pubkey).copied();

        if let Some(new_index) = unphased::apply_deposit_data(config, &mut state, existing_index, data)? {
            validator_index_by_pubkey.insert(data.pubkey, new_index);
        }

        state.eth1_deposit_index += 1;
    }

    // > Process activations
    let activations = state
        .balances
        .iter()
        .copied()
        .zip(0..)
        .map(|(balance, validator_index)| {
            let increment = P::EFFECTIVE_BALANCE_INCREMENT;
            let effective_balance =
                (balance - balance % increment).min(P::MAX_EFFECTIVE_BALANCE);
            (validator_index, effective_balance)
        })
        .collect::<Vec<(ValidatorIndex, _)>>();

    for (validator_index, effective_balance) in activations {
        let validator = state.validators.get_mut(validator_index)?;

        validator.effective_balance = effective_balance;

        if effective_balance == P::MAX_EFFECTIVE_BALANCE {
            validator.activation_eligibility_epoch = GENESIS_EPOCH;
            validator.activation_epoch = GENESIS_EPOCH;
        }
    }

    // > Set genesis validators root for domain separation and chain versioning
    state.genesis_validators_root = state.validators.hash_tree_root();

    Ok(state.into())
}

#[must_use]
pub fn is_valid_genesis_state<P: Preset>(config: &Config, state: &BeaconState<P>) -> bool {
    if state.genesis_time < config.min_genesis_time {
        return false;
    }

    let active = accessors::get_active_validator_indices(state, GENESIS_EPOCH).len() as u64;

    active >= config.min_genesis_active_validator_count
}

#[cfg(test)]
mod tests {
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn genesis_is_deterministic_and_activates_full_deposits() {
        let config = Config::minimal();

        let deposits = (0..8)
            .map(|index| interop::quick_start_deposit_data::<Minimal>(&config, index))
            .collect::<Vec<_>>();

        let state = initialize_beacon_state_from_eth1::<Minimal>(
            &config,
            H256::repeat_byte(0x42),
            1_578_009_600,
            deposits.clone(),
        )
        .expect("the deposits are well-formed");

        let again = initialize_beacon_state_from_eth1::<Minimal>(
            &config,
            H256::repeat_byte(0x42),
            1_578_009_600,
            deposits,
        )
        .expect("the deposits are well-formed");

        assert_eq!(state.hash_tree_root(), again.hash_tree_root());
        assert_eq!(*state, *again);

        assert_eq!(state.validators.len_u64(), 8);
        assert_eq!(state.balances.len_u64(), 8);
        assert_eq!(state.eth1_deposit_index, 8);
        assert_eq!(state.eth1_data.deposit_count, 8);
        assert!(!state.genesis_validators_root.is_zero());

        for validator in &state.validators {
            assert_eq!(validator.effective_balance, Minimal::MAX_EFFECTIVE_BALANCE);
            assert_eq!(validator.activation_epoch, GENESIS_EPOCH);
        }

        // 8 deposits are not enough for the minimal config's genesis.
        assert!(!is_valid_genesis_state(&config, &state));
    }
}
