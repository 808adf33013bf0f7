use typenum::{U33, U4};

use crate::phase0::primitives::{DomainType, Epoch, Slot, H32};

pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;
pub const FAR_FUTURE_EPOCH: Epoch = u64::MAX;

pub const BASE_REWARDS_PER_EPOCH: u64 = 4;
pub const DEPOSIT_CONTRACT_TREE_DEPTH: u64 = 32;

pub type DepositProofLength = U33;
pub type JustificationBitsLength = U4;

pub const DOMAIN_BEACON_PROPOSER: DomainType = H32([0x00, 0x00, 0x00, 0x00]);
pub const DOMAIN_BEACON_ATTESTER: DomainType = H32([0x01, 0x00, 0x00, 0x00]);
pub const DOMAIN_RANDAO: DomainType = H32([0x02, 0x00, 0x00, 0x00]);
pub const DOMAIN_DEPOSIT: DomainType = H32([0x03, 0x00, 0x00, 0x00]);
pub const DOMAIN_VOLUNTARY_EXIT: DomainType = H32([0x04, 0x00, 0x00, 0x00]);
pub const DOMAIN_SELECTION_PROOF: DomainType = H32([0x05, 0x00, 0x00, 0x00]);
pub const DOMAIN_AGGREGATE_AND_PROOF: DomainType = H32([0x06, 0x00, 0x00, 0x00]);
