use thiserror::Error;

use types::{
    nonstandard::Phase,
    phase0::{
        containers::Checkpoint,
        primitives::{DepositIndex, Epoch, Slot, UnixSeconds, ValidatorIndex, H256},
    },
};

/// Reasons a block or slot transition is rejected.
///
/// Any of these leaves the caller's predecessor state untouched: the
/// transition mutates a clone, and a clone that errored is discarded.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("target slot is not later than the state's (current: {current}, target: {target})")]
    SlotNotLater { current: Slot, target: Slot },
    #[error("block slot {in_block} does not match state slot {state_slot}")]
    SlotMismatch { state_slot: Slot, in_block: Slot },
    #[error("block and state are in different phases (state: {state_phase}, block: {block_phase})")]
    PhaseMismatch {
        state_phase: Phase,
        block_phase: Phase,
    },
    #[error("block proposer {in_block} does not match the proposer schedule ({computed})")]
    ProposerIndexMismatch {
        computed: ValidatorIndex,
        in_block: ValidatorIndex,
    },
    #[error("block parent root {in_block:?} does not match the latest block header ({computed:?})")]
    ParentRootMismatch { computed: H256, in_block: H256 },
    #[error("block proposer {proposer_index} is slashed")]
    ProposerSlashed { proposer_index: ValidatorIndex },
    #[error("state root in block ({in_block:?}) does not match the post-state ({computed:?})")]
    StateRootMismatch { computed: H256, in_block: H256 },

    #[error("block contains {in_block} deposits but {expected} are required")]
    DepositCountMismatch { expected: u64, in_block: u64 },
    #[error("deposit proof is invalid (deposit index: {deposit_index})")]
    DepositProofInvalid { deposit_index: DepositIndex },

    #[error("proposer slashing headers are for different slots ({slot_1} and {slot_2})")]
    ProposerSlashingSlotMismatch { slot_1: Slot, slot_2: Slot },
    #[error("proposer slashing headers are for different proposers")]
    ProposerSlashingProposerMismatch,
    #[error("proposer slashing headers are identical")]
    ProposerSlashingHeadersIdentical,
    #[error("validator {validator_index} is not slashable")]
    ValidatorNotSlashable { validator_index: ValidatorIndex },
    #[error("attestations in attester slashing are not slashable")]
    AttestationDataNotSlashable,
    #[error("attester slashing slashed no validators")]
    NoValidatorsSlashed,

    #[error("attestation target epoch {target_epoch} does not match its slot {slot}")]
    AttestationTargetsWrongEpoch { slot: Slot, target_epoch: Epoch },
    #[error(
        "attestation from slot {attestation_slot} is outside the inclusion range \
         at state slot {state_slot}"
    )]
    AttestationOutsideInclusionRange {
        state_slot: Slot,
        attestation_slot: Slot,
    },
    #[error(
        "attestation source {in_attestation:?} does not match \
         the justified checkpoint {justified:?}"
    )]
    AttestationSourceMismatch {
        justified: Checkpoint,
        in_attestation: Checkpoint,
    },

    #[error("validator {validator_index} exiting voluntarily is not active")]
    ExitingValidatorNotActive { validator_index: ValidatorIndex },
    #[error("validator {validator_index} is already exiting")]
    ValidatorAlreadyExiting { validator_index: ValidatorIndex },
    #[error("voluntary exit is only valid from epoch {earliest_epoch}")]
    ExitNotYetValid { earliest_epoch: Epoch },
    #[error("validator {validator_index} has not been active long enough to exit")]
    ValidatorHasNotBeenActiveLongEnough { validator_index: ValidatorIndex },

    #[error("execution payload parent hash {in_payload:?} does not match the latest header ({in_state:?})")]
    ExecutionPayloadParentHashMismatch { in_state: H256, in_payload: H256 },
    #[error("execution payload prev_randao {in_payload:?} does not match the state ({in_state:?})")]
    ExecutionPayloadPrevRandaoMismatch { in_state: H256, in_payload: H256 },
    #[error("execution payload timestamp {in_payload} does not match the slot ({computed})")]
    ExecutionPayloadTimestampMismatch {
        computed: UnixSeconds,
        in_payload: UnixSeconds,
    },
    #[error("execution engine rejected the payload")]
    ExecutionPayloadInvalid,

    #[error("transition was cancelled")]
    Cancelled,
    #[error("transition deadline was exceeded")]
    DeadlineExceeded,
}
