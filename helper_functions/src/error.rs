use thiserror::Error;

use types::phase0::{
    containers::Checkpoint,
    primitives::{Epoch, Slot, ValidatorIndex},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("validator index {validator_index} is out of bounds")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
    #[error("slot {slot} is outside the range covered by the state root history")]
    SlotOutOfRange { slot: Slot },
    #[error("epoch {epoch} is outside the range covered by the state")]
    EpochOutOfRange { epoch: Epoch },
    #[error("there are no active validators")]
    NoActiveValidators,
    #[error("aggregation bitlist has {bits} bits but the committee has {committee_size} members")]
    CommitteeSizeMismatch { bits: usize, committee_size: usize },
    #[error("attesting indices are empty or not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error(
        "attestation source {in_attestation:?} does not match \
         the justified checkpoint {justified:?}"
    )]
    SourceMismatch {
        in_attestation: Checkpoint,
        justified: Checkpoint,
    },
}
