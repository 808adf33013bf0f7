use ssz::{BitVector, PersistentList, PersistentVector, Ssz, H256};

use crate::{
    phase0::{
        consts::JustificationBitsLength,
        containers::{
            BeaconBlockHeader, Checkpoint, Eth1Data, Fork, PendingAttestation, Validator,
        },
        primitives::{DepositIndex, Gwei, Slot, UnixSeconds},
    },
    preset::Preset,
};

#[derive(Clone, PartialEq, Eq, Default, Debug, Ssz)]
pub struct BeaconState<P: Preset> {
    // > Versioning
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
    pub slot: Slot,
    pub fork: Fork,
    // > History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: PersistentVector<H256, P::SlotsPerHistoricalRoot>,
    pub state_roots: PersistentVector<H256, P::SlotsPerHistoricalRoot>,
    pub historical_roots: PersistentList<H256, P::HistoricalRootsLimit>,
    // > Eth1
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: PersistentList<Eth1Data, P::Eth1DataVotesBound>,
    pub eth1_deposit_index: DepositIndex,
    // > Registry
    pub validators: PersistentList<Validator, P::ValidatorRegistryLimit>,
    pub balances: PersistentList<Gwei, P::ValidatorRegistryLimit>,
    // > Randomness
    pub randao_mixes: PersistentVector<H256, P::EpochsPerHistoricalVector>,
    // > Slashings
    pub slashings: PersistentVector<Gwei, P::EpochsPerSlashingsVector>,
    // > Attestations
    pub previous_epoch_attestations: PersistentList<PendingAttestation<P>, P::EpochAttestationsBound>,
    pub current_epoch_attestations: PersistentList<PendingAttestation<P>, P::EpochAttestationsBound>,
    // > Finality
    pub justification_bits: BitVector<JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}
