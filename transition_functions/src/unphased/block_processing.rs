use anyhow::Result;
use bls::PublicKey;
use epoch_context::EpochContext;
use helper_functions::{
    accessors, error::Error as HelperError, misc, mutators, predicates,
    verifier::{SignatureKind, Verifier},
};
use ssz::SszHash as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    nonstandard::Phase,
    phase0::{
        consts::{
            DEPOSIT_CONTRACT_TREE_DEPTH, DOMAIN_BEACON_PROPOSER, DOMAIN_DEPOSIT, DOMAIN_RANDAO,
            DOMAIN_VOLUNTARY_EXIT, FAR_FUTURE_EPOCH,
        },
        containers::{
            AttesterSlashing, BeaconBlockHeader, Deposit, DepositData, DepositMessage,
            ProposerSlashing, SignedVoluntaryExit, Validator,
        },
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
    traits::{BeaconBlock, BeaconBlockBody, BeaconState, SignedBeaconBlock},
};

use crate::unphased::Error;

pub fn process_block_header<P: Preset>(
    state: &mut impl BeaconState<P>,
    epoch_context: &EpochContext<P>,
    block: &impl BeaconBlock<P>,
) -> Result<()> {
    // > Verify that the slots match
    anyhow::ensure!(
        block.slot() == state.slot(),
        Error::SlotMismatch {
            state_slot: state.slot(),
            in_block: block.slot(),
        },
    );

    // > Verify that proposer index is the correct index
    let computed = epoch_context.proposer_index(block.slot())?;

    anyhow::ensure!(
        block.proposer_index() == computed,
        Error::ProposerIndexMismatch {
            computed,
            in_block: block.proposer_index(),
        },
    );

    // > Verify that the parent matches
    let computed = state.latest_block_header().hash_tree_root();

    anyhow::ensure!(
        block.parent_root() == computed,
        Error::ParentRootMismatch {
            computed,
            in_block: block.parent_root(),
        },
    );

    // > Verify proposer is not slashed
    let proposer = state
        .validators()
        .get(block.proposer_index())
        .map_err(|_| HelperError::ValidatorIndexOutOfBounds {
            validator_index: block.proposer_index(),
        })?;

    anyhow::ensure!(
        !proposer.slashed,
        Error::ProposerSlashed {
            proposer_index: block.proposer_index(),
        },
    );

    // > Cache current block as the new latest block
    // `state_root` stays zeroed until the next `process_slot` fills it in.
    *state.latest_block_header_mut() = BeaconBlockHeader {
        slot: block.slot(),
        proposer_index: block.proposer_index(),
        parent_root: block.parent_root(),
        state_root: ssz::H256::zero(),
        body_root: block.body().hash_tree_root(),
    };

    Ok(())
}

pub fn verify_block_signature<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    block: &impl SignedBeaconBlock<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let proposer_index = block.message().proposer_index();

    let proposer = state
        .validators()
        .get(proposer_index)
        .map_err(|_| HelperError::ValidatorIndexOutOfBounds {
            validator_index: proposer_index,
        })?;

    let domain = accessors::get_domain(
        config,
        state,
        DOMAIN_BEACON_PROPOSER,
        Some(misc::compute_epoch_at_slot::<P>(block.message().slot())),
    );
    let signing_root = misc::compute_signing_root(block.message(), domain);

    verifier.verify_singular(
        signing_root,
        block.signature(),
        &proposer.pubkey,
        SignatureKind::Block,
    )
}

pub fn process_randao<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    epoch_context: &EpochContext<P>,
    body: &impl BeaconBlockBody<P>,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let epoch = accessors::get_current_epoch(state);
    let randao_reveal = body.randao_reveal();

    // > Verify RANDAO reveal
    {
        let proposer_index = epoch_context.proposer_index(state.slot())?;
        let proposer = state
            .validators()
            .get(proposer_index)
            .map_err(|_| HelperError::ValidatorIndexOutOfBounds {
                validator_index: proposer_index,
            })?;

        let domain = accessors::get_domain(config, state, DOMAIN_RANDAO, None);
        let signing_root = misc::compute_signing_root(&epoch, domain);

        verifier.verify_singular(
            signing_root,
            randao_reveal,
            &proposer.pubkey,
            SignatureKind::Randao,
        )?;
    }

    // > Mix in RANDAO reveal
    let mix = accessors::get_randao_mix(state, epoch)
        ^ hashing::hash_bytes(randao_reveal.as_bytes());

    *state.randao_mixes_mut().mod_index_mut(epoch) = mix;

    Ok(())
}

pub fn process_eth1_data<P: Preset>(
    state: &mut impl BeaconState<P>,
    body: &impl BeaconBlockBody<P>,
) -> Result<()> {
    let vote = body.eth1_data();

    state.eth1_data_votes_mut().push(vote)?;

    let vote_count = state
        .eth1_data_votes()
        .iter()
        .filter(|in_state| **in_state == vote)
        .count();

    // Adoption requires a strict majority of the whole voting period.
    if vote_count * 2 > P::Eth1DataVotesBound::USIZE {
        *state.eth1_data_mut() = vote;
    }

    Ok(())
}

pub fn process_proposer_slashing<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    epoch_context: &EpochContext<P>,
    proposer_slashing: &ProposerSlashing,
    verifier: &mut impl Verifier,
    phase: Phase,
) -> Result<()> {
    let ProposerSlashing {
        signed_header_1,
        signed_header_2,
    } = proposer_slashing;

    let header_1 = signed_header_1.message;
    let header_2 = signed_header_2.message;

    // > Verify header slots match
    anyhow::ensure!(
        header_1.slot == header_2.slot,
        Error::ProposerSlashingSlotMismatch {
            slot_1: header_1.slot,
            slot_2: header_2.slot,
        },
    );

    // > Verify header proposer indices match
    anyhow::ensure!(
        header_1.proposer_index == header_2.proposer_index,
        Error::ProposerSlashingProposerMismatch,
    );

    // > Verify the headers are different
    anyhow::ensure!(
        header_1 != header_2,
        Error::ProposerSlashingHeadersIdentical,
    );

    // > Verify the proposer is slashable
    let proposer_index = header_1.proposer_index;
    let current_epoch = accessors::get_current_epoch(state);

    {
        let proposer = state
            .validators()
            .get(proposer_index)
            .map_err(|_| HelperError::ValidatorIndexOutOfBounds {
                validator_index: proposer_index,
            })?;

        anyhow::ensure!(
            predicates::is_slashable_validator(proposer, current_epoch),
            Error::ValidatorNotSlashable {
                validator_index: proposer_index,
            },
        );

        // > Verify signatures
        for signed_header in [signed_header_1, signed_header_2] {
            let domain = accessors::get_domain(
                config,
                state,
                DOMAIN_BEACON_PROPOSER,
                Some(misc::compute_epoch_at_slot::<P>(signed_header.message.slot)),
            );
            let signing_root = misc::compute_signing_root(&signed_header.message, domain);

            verifier.verify_singular(
                signing_root,
                signed_header.signature,
                &proposer.pubkey,
                SignatureKind::BlockHeaderInProposerSlashing,
            )?;
        }
    }

    mutators::slash_validator(
        config,
        state,
        proposer_index,
        None,
        epoch_context.proposer_index(state.slot())?,
        phase,
    )
}

pub fn process_attester_slashing<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    epoch_context: &EpochContext<P>,
    attester_slashing: &AttesterSlashing<P>,
    verifier: &mut impl Verifier,
    phase: Phase,
) -> Result<()> {
    let AttesterSlashing {
        attestation_1,
        attestation_2,
    } = attester_slashing;

    anyhow::ensure!(
        predicates::is_slashable_attestation_data(&attestation_1.data, &attestation_2.data),
        Error::AttestationDataNotSlashable,
    );

    predicates::validate_indexed_attestation(config, state, attestation_1, verifier)?;
    predicates::validate_indexed_attestation(config, state, attestation_2, verifier)?;

    let current_epoch = accessors::get_current_epoch(state);
    let proposer_index = epoch_context.proposer_index(state.slot())?;

    let mut slashed_any = false;

    // Attesting indices are sorted, so the intersection is a merge.
    let in_both = itertools::merge_join_by(
        attestation_1.attesting_indices.iter().copied(),
        attestation_2.attesting_indices.iter().copied(),
        Ord::cmp,
    )
    .filter_map(|either_or_both| either_or_both.both().map(|(validator_index, _)| validator_index))
    .collect::<Vec<_>>();

    for validator_index in in_both {
        let slashable = {
            let validator = state
                .validators()
                .get(validator_index)
                .map_err(|_| HelperError::ValidatorIndexOutOfBounds { validator_index })?;

            predicates::is_slashable_validator(validator, current_epoch)
        };

        if slashable {
            mutators::slash_validator(
                config,
                state,
                validator_index,
                None,
                proposer_index,
                phase,
            )?;
            slashed_any = true;
        }
    }

    anyhow::ensure!(slashed_any, Error::NoValidatorsSlashed);

    Ok(())
}

/// Blocks must drain outstanding deposits as fast as the limit allows.
pub fn validate_deposit_count<P: Preset>(
    state: &impl BeaconState<P>,
    deposits_in_block: usize,
) -> Result<()> {
    let outstanding = state.eth1_data().deposit_count - state.eth1_deposit_index();
    let expected = outstanding.min(P::MaxDeposits::U64);

    anyhow::ensure!(
        deposits_in_block as u64 == expected,
        Error::DepositCountMismatch {
            expected,
            in_block: deposits_in_block as u64,
        },
    );

    Ok(())
}

pub fn process_deposit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    epoch_context: &mut EpochContext<P>,
    deposit: &Deposit,
) -> Result<()> {
    let deposit_index = state.eth1_deposit_index();

    // > Verify the Merkle branch
    anyhow::ensure!(
        predicates::is_valid_merkle_branch(
            deposit.data.hash_tree_root(),
            deposit.proof.iter().copied(),
            // > Add 1 for the List length mix-in
            DEPOSIT_CONTRACT_TREE_DEPTH + 1,
            deposit_index,
            state.eth1_data().deposit_root,
        ),
        Error::DepositProofInvalid { deposit_index },
    );

    // > Deposits must be processed in order
    *state.eth1_deposit_index_mut() += 1;

    let existing_index = epoch_context.validator_index(deposit.data.pubkey).ok();

    if let Some(new_index) = apply_deposit_data(config, state, existing_index, deposit.data)? {
        epoch_context.register_validator(deposit.data.pubkey, new_index);
    }

    Ok(())
}

/// Applies deposit data to the registry. Top-ups only move balance; new
/// pubkeys must carry a valid proof of possession or are silently skipped,
/// since the deposit contract cannot check signatures.
///
/// Returns the index of the newly created validator, if one was created.
pub fn apply_deposit_data<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    existing_index: Option<ValidatorIndex>,
    data: DepositData,
) -> Result<Option<ValidatorIndex>> {
    let DepositData {
        pubkey,
        withdrawal_credentials,
        amount,
        signature,
    } = data;

    if let Some(validator_index) = existing_index {
        // > Increase balance by deposit amount
        mutators::increase_balance(mutators::balance(state, validator_index)?, amount);
        return Ok(None);
    }

    // > Verify the deposit signature (proof of possession) which is not checked
    // > by the deposit contract
    let deposit_message = DepositMessage {
        pubkey,
        withdrawal_credentials,
        amount,
    };

    // > Note: The deposit contract does not check signatures.
    // > Note: Deposits are valid across forks, thus the deposit domain
    // >       is retrieved directly from `compute_domain`.
    let domain = misc::compute_domain(config, DOMAIN_DEPOSIT, None, None);
    let signing_root = misc::compute_signing_root(&deposit_message, domain);

    let Ok(public_key) = PublicKey::from_bytes(pubkey) else {
        log::debug!("ignoring deposit with malformed pubkey: {pubkey:?}");
        return Ok(None);
    };

    let Ok(decompressed_signature) = bls::Signature::from_bytes(signature) else {
        log::debug!("ignoring deposit with malformed signature for pubkey {pubkey:?}");
        return Ok(None);
    };

    if !public_key.verify(signing_root, &decompressed_signature) {
        log::debug!("ignoring deposit with invalid proof of possession for pubkey {pubkey:?}");
        return Ok(None);
    }

    // > Add validator and balance entries
    let effective_balance = amount
        .saturating_sub(amount % P::EFFECTIVE_BALANCE_INCREMENT)
        .min(P::MAX_EFFECTIVE_BALANCE);

    state.validators_mut().push(Validator {
        pubkey: pubkey.into(),
        withdrawal_credentials,
        effective_balance,
        slashed: false,
        activation_eligibility_epoch: FAR_FUTURE_EPOCH,
        activation_epoch: FAR_FUTURE_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
    })?;
    state.balances_mut().push(amount)?;

    Ok(Some(state.validators().len_u64() - 1))
}

pub fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    signed_voluntary_exit: &SignedVoluntaryExit,
    verifier: &mut impl Verifier,
) -> Result<()> {
    let SignedVoluntaryExit { message, signature } = signed_voluntary_exit;

    let validator_index = message.validator_index;
    let current_epoch = accessors::get_current_epoch(state);

    {
        let validator = state
            .validators()
            .get(validator_index)
            .map_err(|_| HelperError::ValidatorIndexOutOfBounds { validator_index })?;

        // > Verify the validator is active
        anyhow::ensure!(
            predicates::is_active_validator(validator, current_epoch),
            Error::ExitingValidatorNotActive { validator_index },
        );

        // > Verify exit has not been initiated
        anyhow::ensure!(
            validator.exit_epoch == FAR_FUTURE_EPOCH,
            Error::ValidatorAlreadyExiting { validator_index },
        );

        // > Exits must specify an epoch when they become valid; they are not valid before then
        anyhow::ensure!(
            current_epoch >= message.epoch,
            Error::ExitNotYetValid {
                earliest_epoch: message.epoch,
            },
        );

        // > Verify the validator has been active long enough
        anyhow::ensure!(
            current_epoch >= validator.activation_epoch + config.shard_committee_period,
            Error::ValidatorHasNotBeenActiveLongEnough { validator_index },
        );

        // > Verify signature
        let domain = accessors::get_domain(
            config,
            state,
            DOMAIN_VOLUNTARY_EXIT,
            Some(message.epoch),
        );
        let signing_root = misc::compute_signing_root(message, domain);

        verifier.verify_singular(
            signing_root,
            *signature,
            &validator.pubkey,
            SignatureKind::VoluntaryExit,
        )?;
    }

    // > Initiate exit
    mutators::initiate_validator_exit(config, state, validator_index)
}

/// Gwei helper shared by the per-fork reward paths.
pub(crate) fn base_reward_per_increment<P: Preset>(total_active_balance_sqrt: u64) -> Gwei {
    P::EFFECTIVE_BALANCE_INCREMENT * P::BASE_REWARD_FACTOR / total_active_balance_sqrt
}
