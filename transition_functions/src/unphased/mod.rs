pub use error::Error;

pub use block_processing::{
    apply_deposit_data, process_attester_slashing, process_block_header, process_deposit,
    process_eth1_data, process_proposer_slashing, process_randao, process_voluntary_exit,
    validate_deposit_count, verify_block_signature,
};

pub(crate) use block_processing::base_reward_per_increment;
pub(crate) use epoch_processing::is_eligible_for_penalties;
pub use epoch_processing::{
    process_effective_balance_updates, process_eth1_data_reset, process_historical_roots_update,
    process_randao_mixes_reset, process_registry_updates, process_slashings,
    process_slashings_reset, weigh_justification_and_finalization,
};
pub use slot_processing::process_slot;

mod block_processing;
mod epoch_processing;
mod error;
mod slot_processing;
