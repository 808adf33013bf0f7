use crate::{
    altair::primitives::ParticipationFlags,
    phase0::primitives::{DomainType, H32},
};

pub const TIMELY_SOURCE_FLAG_INDEX: usize = 0;
pub const TIMELY_TARGET_FLAG_INDEX: usize = 1;
pub const TIMELY_HEAD_FLAG_INDEX: usize = 2;

pub const TIMELY_SOURCE_FLAG: ParticipationFlags = 1 << TIMELY_SOURCE_FLAG_INDEX;
pub const TIMELY_TARGET_FLAG: ParticipationFlags = 1 << TIMELY_TARGET_FLAG_INDEX;
pub const TIMELY_HEAD_FLAG: ParticipationFlags = 1 << TIMELY_HEAD_FLAG_INDEX;

pub const TIMELY_SOURCE_WEIGHT: u64 = 14;
pub const TIMELY_TARGET_WEIGHT: u64 = 26;
pub const TIMELY_HEAD_WEIGHT: u64 = 14;
pub const SYNC_REWARD_WEIGHT: u64 = 2;
pub const PROPOSER_WEIGHT: u64 = 8;
pub const WEIGHT_DENOMINATOR: u64 = 64;

/// Attestation flags with their reward weights, in flag index order.
pub const PARTICIPATION_FLAG_WEIGHTS: [(ParticipationFlags, u64); 3] = [
    (TIMELY_SOURCE_FLAG, TIMELY_SOURCE_WEIGHT),
    (TIMELY_TARGET_FLAG, TIMELY_TARGET_WEIGHT),
    (TIMELY_HEAD_FLAG, TIMELY_HEAD_WEIGHT),
];

pub const DOMAIN_SYNC_COMMITTEE: DomainType = H32([0x07, 0x00, 0x00, 0x00]);
pub const DOMAIN_SYNC_COMMITTEE_SELECTION_PROOF: DomainType = H32([0x08, 0x00, 0x00, 0x00]);
pub const DOMAIN_CONTRIBUTION_AND_PROOF: DomainType = H32([0x09, 0x00, 0x00, 0x00]);
