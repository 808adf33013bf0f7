use core::ops::BitOrAssign as _;

use anyhow::Result;
use ssz::PersistentList;
use std_ext::ArcExt as _;
use types::{
    altair::beacon_state::BeaconState as AltairBeaconState,
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState, containers::ExecutionPayloadHeader,
    },
    config::Config,
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        containers::{Fork, PendingAttestation},
    },
    preset::Preset,
};

use crate::accessors;

pub fn upgrade_to_altair<P: Preset>(
    config: &Config,
    pre: Phase0BeaconState<P>,
) -> Result<AltairBeaconState<P>> {
    let epoch = accessors::get_current_epoch(&pre);

    let Phase0BeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_attestations,
        current_epoch_attestations: _,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
    } = pre;

    let fork = Fork {
        previous_version: fork.current_version,
        current_version: config.altair_fork_version,
        epoch,
    };

    let zero_participation = PersistentList::repeat_zero_with_length_of(&validators);
    let inactivity_scores = PersistentList::repeat_zero_with_length_of(&validators);

    let mut post = AltairBeaconState {
        // > Versioning
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        // > History
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        // > Eth1
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        // > Registry
        validators,
        balances,
        // > Randomness
        randao_mixes,
        // > Slashings
        slashings,
        // > Participation
        previous_epoch_participation: zero_participation.clone(),
        current_epoch_participation: zero_participation,
        // > Finality
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        // > Inactivity
        inactivity_scores,
        // Sync committees are filled in below.
        current_sync_committee: std::sync::Arc::default(),
        next_sync_committee: std::sync::Arc::default(),
    };

    // > Fill in previous epoch participation from the pre state's pending attestations
    translate_participation(&mut post, &previous_epoch_attestations)?;

    // > Note: A duplicate committee is assigned for the current and next committee at the fork
    // >       boundary
    let sync_committee = accessors::get_next_sync_committee(&post)?;
    post.current_sync_committee = sync_committee.clone_arc();
    post.next_sync_committee = sync_committee;

    Ok(post)
}

fn translate_participation<'attestations, P: Preset>(
    state: &mut AltairBeaconState<P>,
    pending_attestations: impl IntoIterator<Item = &'attestations PendingAttestation<P>>,
) -> Result<()> {
    for attestation in pending_attestations {
        let PendingAttestation {
            ref aggregation_bits,
            data,
            inclusion_delay,
            ..
        } = *attestation;

        // > Translate attestation inclusion info to flag indices
        let participation_flags =
            accessors::get_attestation_participation_flags(state, data, inclusion_delay)?;

        let committee = accessors::beacon_committee(state, data.slot, data.index)?;

        // > Apply flags to all attesting validators
        for attesting_index in accessors::get_attesting_indices::<P>(&committee, aggregation_bits)?
        {
            state
                .previous_epoch_participation
                .get_mut(attesting_index)?
                .bitor_assign(participation_flags);
        }
    }

    Ok(())
}

#[must_use]
pub fn upgrade_to_bellatrix<P: Preset>(
    config: &Config,
    pre: AltairBeaconState<P>,
) -> BellatrixBeaconState<P> {
    let epoch = accessors::get_current_epoch(&pre);

    let AltairBeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation,
        current_epoch_participation,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores,
        current_sync_committee,
        next_sync_committee,
    } = pre;

    let fork = Fork {
        previous_version: fork.current_version,
        current_version: config.bellatrix_fork_version,
        epoch,
    };

    BellatrixBeaconState {
        // > Versioning
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        // > History
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        // > Eth1
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        // > Registry
        validators,
        balances,
        // > Randomness
        randao_mixes,
        // > Slashings
        slashings,
        // > Participation
        previous_epoch_participation,
        current_epoch_participation,
        // > Finality
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        // > Inactivity
        inactivity_scores,
        // > Sync
        current_sync_committee,
        next_sync_committee,
        // > Execution-layer
        latest_execution_payload_header: ExecutionPayloadHeader::default(),
    }
}
