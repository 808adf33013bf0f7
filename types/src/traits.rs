//! Capability traits over the fork variants of states and blocks.
//!
//! Fork-independent transition logic is generic over these instead of being
//! duplicated per variant. Accessors come in `get`/`get_mut` pairs; fields
//! that the transition never mutates only get the former.

use std::sync::Arc;

use bls::SignatureBytes;
use duplicate::duplicate_item;
use ssz::{BitVector, ContiguousList, PersistentList, PersistentVector, SszHash, H256};

use crate::{
    altair::{
        containers::{SyncAggregate, SyncCommittee},
        primitives::ParticipationFlags,
    },
    bellatrix::containers::ExecutionPayload,
    phase0::{
        consts::JustificationBitsLength,
        containers::{
            Attestation, AttesterSlashing, BeaconBlockHeader, Checkpoint, Deposit, Eth1Data, Fork,
            ProposerSlashing, SignedVoluntaryExit, Validator,
        },
        primitives::{DepositIndex, Gwei, Slot, UnixSeconds, ValidatorIndex},
    },
    preset::Preset,
};

pub trait BeaconState<P: Preset>: Clone + SszHash + Send + Sync {
    fn genesis_time(&self) -> UnixSeconds;
    fn genesis_validators_root(&self) -> H256;
    fn slot(&self) -> Slot;
    fn slot_mut(&mut self) -> &mut Slot;
    fn fork(&self) -> Fork;
    fn latest_block_header(&self) -> BeaconBlockHeader;
    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader;
    fn block_roots(&self) -> &PersistentVector<H256, P::SlotsPerHistoricalRoot>;
    fn block_roots_mut(&mut self) -> &mut PersistentVector<H256, P::SlotsPerHistoricalRoot>;
    fn state_roots(&self) -> &PersistentVector<H256, P::SlotsPerHistoricalRoot>;
    fn state_roots_mut(&mut self) -> &mut PersistentVector<H256, P::SlotsPerHistoricalRoot>;
    fn historical_roots_mut(&mut self) -> &mut PersistentList<H256, P::HistoricalRootsLimit>;
    fn eth1_data(&self) -> Eth1Data;
    fn eth1_data_mut(&mut self) -> &mut Eth1Data;
    fn eth1_data_votes(&self) -> &PersistentList<Eth1Data, P::Eth1DataVotesBound>;
    fn eth1_data_votes_mut(&mut self) -> &mut PersistentList<Eth1Data, P::Eth1DataVotesBound>;
    fn eth1_deposit_index(&self) -> DepositIndex;
    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex;
    fn validators(&self) -> &PersistentList<Validator, P::ValidatorRegistryLimit>;
    fn validators_mut(&mut self) -> &mut PersistentList<Validator, P::ValidatorRegistryLimit>;
    fn balances(&self) -> &PersistentList<Gwei, P::ValidatorRegistryLimit>;
    fn balances_mut(&mut self) -> &mut PersistentList<Gwei, P::ValidatorRegistryLimit>;
    fn randao_mixes(&self) -> &PersistentVector<H256, P::EpochsPerHistoricalVector>;
    fn randao_mixes_mut(&mut self) -> &mut PersistentVector<H256, P::EpochsPerHistoricalVector>;
    fn slashings(&self) -> &PersistentVector<Gwei, P::EpochsPerSlashingsVector>;
    fn slashings_mut(&mut self) -> &mut PersistentVector<Gwei, P::EpochsPerSlashingsVector>;
    fn justification_bits(&self) -> &BitVector<JustificationBitsLength>;
    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength>;
    fn previous_justified_checkpoint(&self) -> Checkpoint;
    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn current_justified_checkpoint(&self) -> Checkpoint;
    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn finalized_checkpoint(&self) -> Checkpoint;
    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint;
}

#[duplicate_item(
    state_type;
    [crate::phase0::beacon_state::BeaconState<P>];
    [crate::altair::beacon_state::BeaconState<P>];
    [crate::bellatrix::beacon_state::BeaconState<P>];
)]
impl<P: Preset> BeaconState<P> for state_type {
    fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    fn genesis_validators_root(&self) -> H256 {
        self.genesis_validators_root
    }

    fn slot(&self) -> Slot {
        self.slot
    }

    fn slot_mut(&mut self) -> &mut Slot {
        &mut self.slot
    }

    fn fork(&self) -> Fork {
        self.fork
    }

    fn latest_block_header(&self) -> BeaconBlockHeader {
        self.latest_block_header
    }

    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader {
        &mut self.latest_block_header
    }

    fn block_roots(&self) -> &PersistentVector<H256, P::SlotsPerHistoricalRoot> {
        &self.block_roots
    }

    fn block_roots_mut(&mut self) -> &mut PersistentVector<H256, P::SlotsPerHistoricalRoot> {
        &mut self.block_roots
    }

    fn state_roots(&self) -> &PersistentVector<H256, P::SlotsPerHistoricalRoot> {
        &self.state_roots
    }

    fn state_roots_mut(&mut self) -> &mut PersistentVector<H256, P::SlotsPerHistoricalRoot> {
        &mut self.state_roots
    }

    fn historical_roots_mut(&mut self) -> &mut PersistentList<H256, P::HistoricalRootsLimit> {
        &mut self.historical_roots
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn eth1_data_mut(&mut self) -> &mut Eth1Data {
        &mut self.eth1_data
    }

    fn eth1_data_votes(&self) -> &PersistentList<Eth1Data, P::Eth1DataVotesBound> {
        &self.eth1_data_votes
    }

    fn eth1_data_votes_mut(&mut self) -> &mut PersistentList<Eth1Data, P::Eth1DataVotesBound> {
        &mut self.eth1_data_votes
    }

    fn eth1_deposit_index(&self) -> DepositIndex {
        self.eth1_deposit_index
    }

    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex {
        &mut self.eth1_deposit_index
    }

    fn validators(&self) -> &PersistentList<Validator, P::ValidatorRegistryLimit> {
        &self.validators
    }

    fn validators_mut(&mut self) -> &mut PersistentList<Validator, P::ValidatorRegistryLimit> {
        &mut self.validators
    }

    fn balances(&self) -> &PersistentList<Gwei, P::ValidatorRegistryLimit> {
        &self.balances
    }

    fn balances_mut(&mut self) -> &mut PersistentList<Gwei, P::ValidatorRegistryLimit> {
        &mut self.balances
    }

    fn randao_mixes(&self) -> &PersistentVector<H256, P::EpochsPerHistoricalVector> {
        &self.randao_mixes
    }

    fn randao_mixes_mut(&mut self) -> &mut PersistentVector<H256, P::EpochsPerHistoricalVector> {
        &mut self.randao_mixes
    }

    fn slashings(&self) -> &PersistentVector<Gwei, P::EpochsPerSlashingsVector> {
        &self.slashings
    }

    fn slashings_mut(&mut self) -> &mut PersistentVector<Gwei, P::EpochsPerSlashingsVector> {
        &mut self.slashings
    }

    fn justification_bits(&self) -> &BitVector<JustificationBitsLength> {
        &self.justification_bits
    }

    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength> {
        &mut self.justification_bits
    }

    fn previous_justified_checkpoint(&self) -> Checkpoint {
        self.previous_justified_checkpoint
    }

    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.previous_justified_checkpoint
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        self.current_justified_checkpoint
    }

    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.current_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.finalized_checkpoint
    }
}

pub trait PostAltairBeaconState<P: Preset>: BeaconState<P> {
    fn previous_epoch_participation(
        &self,
    ) -> &PersistentList<ParticipationFlags, P::ValidatorRegistryLimit>;
    fn previous_epoch_participation_mut(
        &mut self,
    ) -> &mut PersistentList<ParticipationFlags, P::ValidatorRegistryLimit>;
    fn current_epoch_participation(
        &self,
    ) -> &PersistentList<ParticipationFlags, P::ValidatorRegistryLimit>;
    fn current_epoch_participation_mut(
        &mut self,
    ) -> &mut PersistentList<ParticipationFlags, P::ValidatorRegistryLimit>;
    fn inactivity_scores(&self) -> &PersistentList<u64, P::ValidatorRegistryLimit>;
    fn inactivity_scores_mut(&mut self) -> &mut PersistentList<u64, P::ValidatorRegistryLimit>;
    fn current_sync_committee(&self) -> &Arc<SyncCommittee<P>>;
    fn current_sync_committee_mut(&mut self) -> &mut Arc<SyncCommittee<P>>;
    fn next_sync_committee(&self) -> &Arc<SyncCommittee<P>>;
    fn next_sync_committee_mut(&mut self) -> &mut Arc<SyncCommittee<P>>;
}

#[duplicate_item(
    state_type;
    [crate::altair::beacon_state::BeaconState<P>];
    [crate::bellatrix::beacon_state::BeaconState<P>];
)]
impl<P: Preset> PostAltairBeaconState<P> for state_type {
    fn previous_epoch_participation(
        &self,
    ) -> &PersistentList<ParticipationFlags, P::ValidatorRegistryLimit> {
        &self.previous_epoch_participation
    }

    fn previous_epoch_participation_mut(
        &mut self,
    ) -> &mut PersistentList<ParticipationFlags, P::ValidatorRegistryLimit> {
        &mut self.previous_epoch_participation
    }

    fn current_epoch_participation(
        &self,
    ) -> &PersistentList<ParticipationFlags, P::ValidatorRegistryLimit> {
        &self.current_epoch_participation
    }

    fn current_epoch_participation_mut(
        &mut self,
    ) -> &mut PersistentList<ParticipationFlags, P::ValidatorRegistryLimit> {
        &mut self.current_epoch_participation
    }

    fn inactivity_scores(&self) -> &PersistentList<u64, P::ValidatorRegistryLimit> {
        &self.inactivity_scores
    }

    fn inactivity_scores_mut(&mut self) -> &mut PersistentList<u64, P::ValidatorRegistryLimit> {
        &mut self.inactivity_scores
    }

    fn current_sync_committee(&self) -> &Arc<SyncCommittee<P>> {
        &self.current_sync_committee
    }

    fn current_sync_committee_mut(&mut self) -> &mut Arc<SyncCommittee<P>> {
        &mut self.current_sync_committee
    }

    fn next_sync_committee(&self) -> &Arc<SyncCommittee<P>> {
        &self.next_sync_committee
    }

    fn next_sync_committee_mut(&mut self) -> &mut Arc<SyncCommittee<P>> {
        &mut self.next_sync_committee
    }
}

pub trait BeaconBlockBody<P: Preset>: SszHash {
    fn randao_reveal(&self) -> SignatureBytes;
    fn eth1_data(&self) -> Eth1Data;
    fn graffiti(&self) -> H256;
    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings>;
    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>;
    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations>;
    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits>;
    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>;
}

#[duplicate_item(
    body_type;
    [crate::phase0::containers::BeaconBlockBody<P>];
    [crate::altair::containers::BeaconBlockBody<P>];
    [crate::bellatrix::containers::BeaconBlockBody<P>];
)]
impl<P: Preset> BeaconBlockBody<P> for body_type {
    fn randao_reveal(&self) -> SignatureBytes {
        self.randao_reveal
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn graffiti(&self) -> H256 {
        self.graffiti
    }

    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings> {
        &self.proposer_slashings
    }

    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings> {
        &self.attester_slashings
    }

    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations> {
        &self.attestations
    }

    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits> {
        &self.deposits
    }

    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits> {
        &self.voluntary_exits
    }
}

pub trait PostAltairBeaconBlockBody<P: Preset>: BeaconBlockBody<P> {
    fn sync_aggregate(&self) -> &SyncAggregate<P>;
}

#[duplicate_item(
    body_type;
    [crate::altair::containers::BeaconBlockBody<P>];
    [crate::bellatrix::containers::BeaconBlockBody<P>];
)]
impl<P: Preset> PostAltairBeaconBlockBody<P> for body_type {
    fn sync_aggregate(&self) -> &SyncAggregate<P> {
        &self.sync_aggregate
    }
}

pub trait PostBellatrixBeaconBlockBody<P: Preset>: PostAltairBeaconBlockBody<P> {
    fn execution_payload(&self) -> &ExecutionPayload<P>;
}

impl<P: Preset> PostBellatrixBeaconBlockBody<P> for crate::bellatrix::containers::BeaconBlockBody<P> {
    fn execution_payload(&self) -> &ExecutionPayload<P> {
        &self.execution_payload
    }
}

pub trait BeaconBlock<P: Preset>: SszHash {
    type Body: BeaconBlockBody<P>;

    fn slot(&self) -> Slot;
    fn proposer_index(&self) -> ValidatorIndex;
    fn parent_root(&self) -> H256;
    fn state_root(&self) -> H256;
    fn body(&self) -> &Self::Body;
}

#[duplicate_item(
    block_type                                      body_type;
    [crate::phase0::containers::BeaconBlock<P>]     [crate::phase0::containers::BeaconBlockBody<P>];
    [crate::altair::containers::BeaconBlock<P>]     [crate::altair::containers::BeaconBlockBody<P>];
    [crate::bellatrix::containers::BeaconBlock<P>]  [crate::bellatrix::containers::BeaconBlockBody<P>];
)]
impl<P: Preset> BeaconBlock<P> for block_type {
    type Body = body_type;

    fn slot(&self) -> Slot {
        self.slot
    }

    fn proposer_index(&self) -> ValidatorIndex {
        self.proposer_index
    }

    fn parent_root(&self) -> H256 {
        self.parent_root
    }

    fn state_root(&self) -> H256 {
        self.state_root
    }

    fn body(&self) -> &Self::Body {
        &self.body
    }
}

pub trait SignedBeaconBlock<P: Preset> {
    type Message: BeaconBlock<P>;

    fn message(&self) -> &Self::Message;
    fn signature(&self) -> SignatureBytes;
}

#[duplicate_item(
    signed_type                                           message_type;
    [crate::phase0::containers::SignedBeaconBlock<P>]     [crate::phase0::containers::BeaconBlock<P>];
    [crate::altair::containers::SignedBeaconBlock<P>]     [crate::altair::containers::BeaconBlock<P>];
    [crate::bellatrix::containers::SignedBeaconBlock<P>]  [crate::bellatrix::containers::BeaconBlock<P>];
)]
impl<P: Preset> SignedBeaconBlock<P> for signed_type {
    type Message = message_type;

    fn message(&self) -> &Self::Message {
        &self.message
    }

    fn signature(&self) -> SignatureBytes {
        self.signature
    }
}
