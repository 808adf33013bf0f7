use bls::{PublicKeyBytes, SignatureBytes};
use ssz::{BitVector, ContiguousList, ContiguousVector, Ssz, H256};

use crate::{
    phase0::containers::{
        Attestation, AttesterSlashing, Deposit, Eth1Data, ProposerSlashing, SignedVoluntaryExit,
    },
    phase0::primitives::{Slot, ValidatorIndex},
    preset::Preset,
};

#[derive(Clone, PartialEq, Eq, Default, Debug, Ssz)]
pub struct SyncCommittee<P: Preset> {
    pub pubkeys: ContiguousVector<PublicKeyBytes, P::SyncCommitteeSize>,
    pub aggregate_pubkey: PublicKeyBytes,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Ssz)]
pub struct SyncAggregate<P: Preset> {
    pub sync_committee_bits: BitVector<P::SyncCommitteeSize>,
    pub sync_committee_signature: SignatureBytes,
}

impl<P: Preset> SyncAggregate<P> {
    /// The aggregate included when no sync committee messages were received.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sync_committee_bits: BitVector::default(),
            sync_committee_signature: SignatureBytes::empty(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Ssz)]
pub struct BeaconBlockBody<P: Preset> {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub proposer_slashings: ContiguousList<ProposerSlashing, P::MaxProposerSlashings>,
    pub attester_slashings: ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>,
    pub attestations: ContiguousList<Attestation<P>, P::MaxAttestations>,
    pub deposits: ContiguousList<Deposit, P::MaxDeposits>,
    pub voluntary_exits: ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>,
    pub sync_aggregate: SyncAggregate<P>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Ssz)]
pub struct BeaconBlock<P: Preset> {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody<P>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Ssz)]
pub struct SignedBeaconBlock<P: Preset> {
    pub message: BeaconBlock<P>,
    pub signature: SignatureBytes,
}
