//! End-to-end transitions over states built from interop deposits.

use bls::{AggregateSignature, SignatureBytes};
use epoch_context::EpochContext;
use execution_engine::NullExecutionEngine;
use helper_functions::{accessors, misc, verifier::NullVerifier};
use ssz::{BitList, SszHash as _, SszWrite as _};
use try_from_iterator::TryFromIterator as _;
use types::{
    altair::containers::{
        BeaconBlock as AltairBeaconBlock, BeaconBlockBody as AltairBeaconBlockBody,
        SignedBeaconBlock as AltairSignedBeaconBlock, SyncAggregate,
    },
    combined::{BeaconState, SignedBeaconBlock},
    config::Config,
    nonstandard::Phase,
    phase0::{
        consts::{
            DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_RANDAO,
            DOMAIN_VOLUNTARY_EXIT, FAR_FUTURE_EPOCH,
        },
        containers::{
            Attestation, AttestationData, BeaconBlock as Phase0BeaconBlock,
            BeaconBlockBody as Phase0BeaconBlockBody, Checkpoint,
            SignedBeaconBlock as Phase0SignedBeaconBlock, SignedVoluntaryExit, VoluntaryExit,
        },
        primitives::{Slot, ValidatorIndex, H256},
    },
    preset::{Minimal, Preset as _},
};

use transition_functions::{combined, interrupt::Interrupt, unphased::Error};

const VALIDATOR_COUNT: u64 = 64;

fn genesis_state(config: &Config) -> (BeaconState<Minimal>, EpochContext<Minimal>) {
    let deposits = (0..VALIDATOR_COUNT)
        .map(|index| interop::quick_start_deposit_data::<Minimal>(config, index))
        .collect();

    let state = genesis::initialize_beacon_state_from_eth1::<Minimal>(
        config,
        H256::repeat_byte(0x42),
        config.min_genesis_time,
        deposits,
    )
    .expect("interop deposits are well-formed");

    let state = BeaconState::Phase0(state);
    let epoch_context = combined::epoch_context(&state).expect("the genesis state is consistent");

    (state, epoch_context)
}

fn altair_genesis_state(config: &Config) -> (BeaconState<Minimal>, EpochContext<Minimal>) {
    let deposits = (0..VALIDATOR_COUNT)
        .map(|index| interop::quick_start_deposit_data::<Minimal>(config, index))
        .collect();

    let phase0 = genesis::initialize_beacon_state_from_eth1::<Minimal>(
        config,
        H256::repeat_byte(0x42),
        config.min_genesis_time,
        deposits,
    )
    .expect("interop deposits are well-formed");

    let altair = helper_functions::fork::upgrade_to_altair(config, phase0.into_value())
        .expect("the genesis registry has active validators");

    let state = BeaconState::from(altair);
    let epoch_context = combined::epoch_context(&state).expect("the genesis state is consistent");

    (state, epoch_context)
}

fn signing_root_for(
    config: &Config,
    state: &BeaconState<Minimal>,
    object: &impl ssz::SszHash,
    domain_type: types::phase0::primitives::DomainType,
    epoch: u64,
) -> H256 {
    let fork = state.fork();

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    let domain = misc::compute_domain(
        config,
        domain_type,
        Some(fork_version),
        Some(state.genesis_validators_root()),
    );

    misc::compute_signing_root(object, domain)
}

/// Builds a valid phase0 block at `slot` on top of `state`,
/// with the given body.
fn phase0_block(
    config: &Config,
    state: &BeaconState<Minimal>,
    epoch_context: &EpochContext<Minimal>,
    slot: Slot,
    body: Phase0BeaconBlockBody<Minimal>,
) -> (SignedBeaconBlock<Minimal>, ValidatorIndex) {
    let interrupt = Interrupt::never();

    let mut advanced = state.clone();
    let mut advanced_context = epoch_context.clone();
    combined::process_slots(config, &mut advanced_context, &mut advanced, slot, &interrupt)
        .expect("slot advancement from a valid state succeeds");

    let proposer_index = advanced_context
        .proposer_index(slot)
        .expect("the slot is within the current epoch");
    let secret_key = interop::secret_key(proposer_index);

    let epoch = misc::compute_epoch_at_slot::<Minimal>(slot);
    let randao_reveal = secret_key
        .sign(signing_root_for(config, &advanced, &epoch, DOMAIN_RANDAO, epoch))
        .to_bytes();

    let mut message = Phase0BeaconBlock {
        slot,
        proposer_index,
        parent_root: advanced.latest_block_header().hash_tree_root(),
        state_root: H256::zero(),
        body: Phase0BeaconBlockBody {
            randao_reveal,
            ..body
        },
    };

    // Fill in the post-state root by applying the block to a scratch copy.
    let mut trial = advanced.clone();
    let mut trial_context = advanced_context.clone();
    combined::process_block(
        config,
        &mut trial_context,
        &mut trial,
        &SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock {
            message: message.clone(),
            signature: SignatureBytes::empty(),
        }),
        &mut NullVerifier,
        &NullExecutionEngine,
        &interrupt,
    )
    .expect("the block under construction applies cleanly");

    message.state_root = trial.hash_tree_root();

    let signature = secret_key
        .sign(signing_root_for(
            config,
            &advanced,
            &message,
            DOMAIN_BEACON_PROPOSER,
            epoch,
        ))
        .to_bytes();

    (
        SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock { message, signature }),
        proposer_index,
    )
}

fn altair_block(
    config: &Config,
    state: &BeaconState<Minimal>,
    epoch_context: &EpochContext<Minimal>,
    slot: Slot,
    body: AltairBeaconBlockBody<Minimal>,
) -> SignedBeaconBlock<Minimal> {
    let interrupt = Interrupt::never();

    let mut advanced = state.clone();
    let mut advanced_context = epoch_context.clone();

    if advanced.slot() < slot {
        combined::process_slots(config, &mut advanced_context, &mut advanced, slot, &interrupt)
            .expect("slot advancement from a valid state succeeds");
    }

    let proposer_index = advanced_context
        .proposer_index(slot)
        .expect("the slot is within the current epoch");
    let secret_key = interop::secret_key(proposer_index);

    let epoch = misc::compute_epoch_at_slot::<Minimal>(slot);
    let randao_reveal = secret_key
        .sign(signing_root_for(config, &advanced, &epoch, DOMAIN_RANDAO, epoch))
        .to_bytes();

    let mut message = AltairBeaconBlock {
        slot,
        proposer_index,
        parent_root: advanced.latest_block_header().hash_tree_root(),
        state_root: H256::zero(),
        body: AltairBeaconBlockBody {
            randao_reveal,
            ..body
        },
    };

    let mut trial = advanced.clone();
    let mut trial_context = advanced_context.clone();
    combined::process_block(
        config,
        &mut trial_context,
        &mut trial,
        &SignedBeaconBlock::Altair(AltairSignedBeaconBlock {
            message: message.clone(),
            signature: SignatureBytes::empty(),
        }),
        &mut NullVerifier,
        &NullExecutionEngine,
        &interrupt,
    )
    .expect("the block under construction applies cleanly");

    message.state_root = trial.hash_tree_root();

    let signature = secret_key
        .sign(signing_root_for(
            config,
            &advanced,
            &message,
            DOMAIN_BEACON_PROPOSER,
            epoch,
        ))
        .to_bytes();

    SignedBeaconBlock::Altair(AltairSignedBeaconBlock { message, signature })
}

fn assert_registry_invariants(state: &BeaconState<Minimal>) {
    assert_eq!(state.validators().len_u64(), state.balances().len_u64());

    for validator in state.validators() {
        assert_eq!(
            validator.effective_balance % Minimal::EFFECTIVE_BALANCE_INCREMENT,
            0,
        );
        assert!(validator.effective_balance <= Minimal::MAX_EFFECTIVE_BALANCE);
        assert!(validator.activation_eligibility_epoch <= validator.activation_epoch);
        assert!(validator.activation_epoch <= validator.exit_epoch);
        assert!(validator.exit_epoch <= validator.withdrawable_epoch);
    }
}

#[test]
fn a_single_empty_block_advances_the_state() {
    let config = Config::minimal();
    let (genesis, mut epoch_context) = genesis_state(&config);

    let parent_root_before = genesis.latest_block_header();

    let (block, proposer_index) = phase0_block(
        &config,
        &genesis,
        &epoch_context,
        1,
        Phase0BeaconBlockBody::default(),
    );

    let mut state = genesis.clone();
    combined::untrusted_state_transition(
        &config,
        &mut epoch_context,
        &mut state,
        &block,
        &NullExecutionEngine,
        &Interrupt::never(),
    )
    .expect("a well-formed empty block is accepted");

    assert_eq!(state.slot(), 1);
    assert_eq!(state.latest_block_header().slot, 1);
    assert_eq!(state.latest_block_header().proposer_index, proposer_index);
    assert_eq!(state.slot(), genesis.slot() + 1);

    // The parent root commits to the genesis block header with its
    // state root filled in.
    let mut expected_parent = parent_root_before;
    expected_parent.state_root = genesis.hash_tree_root();
    assert_eq!(
        state.latest_block_header().parent_root,
        expected_parent.hash_tree_root(),
    );

    assert_registry_invariants(&state);
}

#[test]
fn a_block_with_the_wrong_proposer_is_rejected() {
    let config = Config::minimal();
    let (genesis, mut epoch_context) = genesis_state(&config);

    let (block, correct_proposer) = phase0_block(
        &config,
        &genesis,
        &epoch_context,
        1,
        Phase0BeaconBlockBody::default(),
    );

    let SignedBeaconBlock::Phase0(mut signed) = block else {
        unreachable!("the genesis state is in phase0");
    };

    signed.message.proposer_index = (correct_proposer + 1) % VALIDATOR_COUNT;

    let mut state = genesis.clone();
    let error = combined::trusted_state_transition(
        &config,
        &mut epoch_context,
        &mut state,
        &SignedBeaconBlock::Phase0(signed),
        &Interrupt::never(),
    )
    .expect_err("the proposer does not match the schedule");

    assert!(matches!(
        error.downcast_ref::<Error>(),
        Some(Error::ProposerIndexMismatch { .. }),
    ));

    // The caller's predecessor state is untouched.
    assert_eq!(genesis.slot(), 0);
}

#[test]
fn empty_slot_progression_matches_block_after_gap() {
    let config = Config::minimal();
    let (genesis, epoch_context) = genesis_state(&config);

    let (block, _) = phase0_block(
        &config,
        &genesis,
        &epoch_context,
        4,
        Phase0BeaconBlockBody::default(),
    );

    // Path 1: the transition advances all four slots itself.
    let mut direct = genesis.clone();
    let mut direct_context = epoch_context.clone();
    combined::untrusted_state_transition(
        &config,
        &mut direct_context,
        &mut direct,
        &block,
        &NullExecutionEngine,
        &Interrupt::never(),
    )
    .expect("a well-formed empty block is accepted");

    // Path 2: three empty slots first, then the same block.
    let mut stepped = genesis.clone();
    let mut stepped_context = epoch_context.clone();

    for slot in 1..=3 {
        combined::process_slots(
            &config,
            &mut stepped_context,
            &mut stepped,
            slot,
            &Interrupt::never(),
        )
        .expect("empty slot advancement succeeds");
    }

    combined::untrusted_state_transition(
        &config,
        &mut stepped_context,
        &mut stepped,
        &block,
        &NullExecutionEngine,
        &Interrupt::never(),
    )
    .expect("a well-formed empty block is accepted");

    assert_eq!(direct.hash_tree_root(), stepped.hash_tree_root());
    assert_eq!(
        direct.to_ssz().expect("states serialize"),
        stepped.to_ssz().expect("states serialize"),
    );
}

#[test]
fn transitions_are_deterministic_across_clones() {
    let config = Config::minimal();
    let (genesis, epoch_context) = genesis_state(&config);

    let (block, _) = phase0_block(
        &config,
        &genesis,
        &epoch_context,
        1,
        Phase0BeaconBlockBody::default(),
    );

    let run = || {
        let mut state = genesis.clone();
        let mut context = epoch_context.clone();
        combined::untrusted_state_transition(
            &config,
            &mut context,
            &mut state,
            &block,
            &NullExecutionEngine,
            &Interrupt::never(),
        )
        .expect("a well-formed empty block is accepted");
        state
    };

    let first = run();
    let second = run();

    assert_eq!(first, second);
    assert_eq!(first.hash_tree_root(), second.hash_tree_root());
}

#[test]
fn empty_slots_can_cross_epoch_boundaries() {
    let config = Config::minimal();
    let (genesis, mut epoch_context) = genesis_state(&config);

    let mut state = genesis.clone();
    let two_epochs = 2 * Minimal::slots_per_epoch() + 1;

    combined::process_slots(
        &config,
        &mut epoch_context,
        &mut state,
        two_epochs,
        &Interrupt::never(),
    )
    .expect("empty epochs process cleanly");

    assert_eq!(state.slot(), two_epochs);
    assert_eq!(epoch_context.current_epoch(), 2);
    assert_registry_invariants(&state);
}

#[test]
fn the_fork_upgrade_switches_the_state_variant() {
    let mut config = Config::minimal();
    config.altair_fork_epoch = 1;

    let (genesis, mut epoch_context) = genesis_state(&config);

    let mut state = genesis.clone();
    combined::process_slots(
        &config,
        &mut epoch_context,
        &mut state,
        Minimal::slots_per_epoch(),
        &Interrupt::never(),
    )
    .expect("the upgrade slot is reachable");

    assert_eq!(state.phase(), Phase::Altair);
    assert_eq!(state.fork().current_version, config.altair_fork_version);
    assert_eq!(state.fork().previous_version, config.genesis_fork_version);
    assert_eq!(state.fork().epoch, 1);

    let BeaconState::Altair(altair_state) = &state else {
        unreachable!("the phase was just checked");
    };

    let validator_count = altair_state.validators.len_u64();

    assert_eq!(
        altair_state.previous_epoch_participation.len_u64(),
        validator_count,
    );
    assert_eq!(
        altair_state.current_epoch_participation.len_u64(),
        validator_count,
    );
    assert_eq!(altair_state.inactivity_scores.len_u64(), validator_count);
    assert!(altair_state
        .current_epoch_participation
        .iter()
        .all(|flags| *flags == 0));

    // Both sync committees are populated from the current registry.
    assert_ne!(
        altair_state.current_sync_committee.aggregate_pubkey,
        Default::default(),
    );
    assert_eq!(
        altair_state.current_sync_committee,
        altair_state.next_sync_committee,
    );

    assert_registry_invariants(&state);
}

#[test]
fn cancellation_surfaces_and_leaves_the_predecessor_usable() {
    let config = Config::minimal();
    let (genesis, mut epoch_context) = genesis_state(&config);

    let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let interrupt = Interrupt::with_flag(flag);

    let mut scratch = genesis.clone();
    let error = combined::process_slots(
        &config,
        &mut epoch_context,
        &mut scratch,
        Minimal::slots_per_epoch(),
        &interrupt,
    )
    .expect_err("the interrupt is set");

    assert!(matches!(
        error.downcast_ref::<Error>(),
        Some(Error::Cancelled),
    ));

    // The predecessor is untouched and still usable.
    assert_eq!(genesis.slot(), 0);
    let mut context = combined::epoch_context(&genesis).expect("the genesis state is consistent");
    let mut state = genesis.clone();
    combined::process_slots(&config, &mut context, &mut state, 1, &Interrupt::never())
        .expect("the fresh run has no interrupt");
}

#[test]
fn a_voluntary_exit_initiates_an_exit() {
    let mut config = Config::minimal();
    // Let freshly activated validators exit immediately.
    config.shard_committee_period = 0;

    let (genesis, mut epoch_context) = genesis_state(&config);

    let exiting_validator = 17;

    let message = VoluntaryExit {
        epoch: 0,
        validator_index: exiting_validator,
    };

    let signature = interop::secret_key(exiting_validator)
        .sign(signing_root_for(
            &config,
            &genesis,
            &message,
            DOMAIN_VOLUNTARY_EXIT,
            0,
        ))
        .to_bytes();

    let mut body = Phase0BeaconBlockBody::default();
    body.voluntary_exits = ssz::ContiguousList::try_from_iter([SignedVoluntaryExit {
        message,
        signature,
    }])
    .expect("one exit is under the limit");

    let (block, _) = phase0_block(&config, &genesis, &epoch_context, 1, body);

    let mut state = genesis.clone();
    combined::untrusted_state_transition(
        &config,
        &mut epoch_context,
        &mut state,
        &block,
        &NullExecutionEngine,
        &Interrupt::never(),
    )
    .expect("the voluntary exit is valid");

    let validator = state
        .validators()
        .get(exiting_validator)
        .expect("the validator exists");

    assert_ne!(validator.exit_epoch, FAR_FUTURE_EPOCH);
    assert_eq!(
        validator.withdrawable_epoch,
        validator.exit_epoch + config.min_validator_withdrawability_delay,
    );

    assert_registry_invariants(&state);
}

#[test]
fn an_altair_attestation_sets_participation_flags_and_pays_the_proposer() {
    let mut config = Config::minimal();
    config.altair_fork_epoch = 0;

    let (genesis, epoch_context) = altair_genesis_state(&config);

    // An empty block at slot 1 so there is a recent block to attest to.
    let first_block = altair_block(
        &config,
        &genesis,
        &epoch_context,
        1,
        AltairBeaconBlockBody {
            sync_aggregate: SyncAggregate::empty(),
            ..AltairBeaconBlockBody::default()
        },
    );

    let mut state = genesis.clone();
    let mut context = epoch_context.clone();
    combined::untrusted_state_transition(
        &config,
        &mut context,
        &mut state,
        &first_block,
        &NullExecutionEngine,
        &Interrupt::never(),
    )
    .expect("the empty block is accepted");

    // Attest to the block at slot 1, included at slot 2: timely in every way.
    let committee = context
        .beacon_committee(1, 0)
        .expect("epoch 0 has committees")
        .to_vec();

    let BeaconState::Altair(state_at_one) = &state else {
        unreachable!("the state is in altair")
    };

    let data = AttestationData {
        slot: 1,
        index: 0,
        beacon_block_root: accessors::latest_block_root(&**state_at_one),
        source: Checkpoint::default(),
        target: accessors::epoch_boundary_checkpoint(&**state_at_one, 0)
            .expect("slot 0 is within the history"),
    };

    let signing_root = signing_root_for(&config, &state, &data, DOMAIN_BEACON_ATTESTER, 0);

    let signatures = committee
        .iter()
        .map(|validator_index| interop::secret_key(*validator_index).sign(signing_root))
        .collect::<Vec<_>>();
    let signature = AggregateSignature::aggregate(&signatures)
        .expect("committee signatures are valid")
        .to_signature()
        .to_bytes();

    let mut aggregation_bits = BitList::with_length(committee.len());
    for bit in 0..committee.len() {
        aggregation_bits.set(bit, true);
    }

    let mut body = AltairBeaconBlockBody {
        sync_aggregate: SyncAggregate::empty(),
        ..AltairBeaconBlockBody::default()
    };
    body.attestations = ssz::ContiguousList::try_from_iter([Attestation {
        aggregation_bits,
        data,
        signature,
    }])
    .expect("one attestation is under the limit");

    let proposer_index = context
        .proposer_index(2)
        .expect("slot 2 is within the current epoch");
    let proposer_balance_before = *state
        .balances()
        .get(proposer_index)
        .expect("the proposer exists");

    let second_block = altair_block(&config, &state, &context, 2, body);

    combined::untrusted_state_transition(
        &config,
        &mut context,
        &mut state,
        &second_block,
        &NullExecutionEngine,
        &Interrupt::never(),
    )
    .expect("the attestation is valid");

    let BeaconState::Altair(altair_state) = &state else {
        unreachable!("the state is in altair");
    };

    let expected_flags = types::altair::consts::TIMELY_SOURCE_FLAG
        | types::altair::consts::TIMELY_TARGET_FLAG
        | types::altair::consts::TIMELY_HEAD_FLAG;

    for validator_index in &committee {
        assert_eq!(
            *altair_state
                .current_epoch_participation
                .get(*validator_index)
                .expect("the validator exists"),
            expected_flags,
        );
    }

    let proposer_balance_after = *state
        .balances()
        .get(proposer_index)
        .expect("the proposer exists");

    assert!(proposer_balance_after > proposer_balance_before);

    assert_registry_invariants(&state);
}

#[test]
fn deposits_top_up_existing_validators_and_create_new_ones() {
    use transition_functions::unphased::apply_deposit_data;

    let config = Config::minimal();

    let deposits = (0..VALIDATOR_COUNT)
        .map(|index| interop::quick_start_deposit_data::<Minimal>(&config, index))
        .collect();

    let state = genesis::initialize_beacon_state_from_eth1::<Minimal>(
        &config,
        H256::repeat_byte(0x42),
        config.min_genesis_time,
        deposits,
    )
    .expect("interop deposits are well-formed");

    let mut state = state.into_value();

    // Top-up: an existing pubkey only moves balance.
    let top_up = interop::quick_start_deposit_data::<Minimal>(&config, 5);
    let created = apply_deposit_data(&config, &mut state, Some(5), top_up)
        .expect("balances are in range");

    assert_eq!(created, None);
    assert_eq!(state.validators.len_u64(), VALIDATOR_COUNT);
    assert_eq!(
        *state.balances.get(5).expect("the validator exists"),
        2 * Minimal::MAX_EFFECTIVE_BALANCE,
    );

    // A new pubkey with a valid proof of possession creates a validator.
    let new_deposit = interop::quick_start_deposit_data::<Minimal>(&config, VALIDATOR_COUNT);
    let created = apply_deposit_data(&config, &mut state, None, new_deposit)
        .expect("balances are in range");

    assert_eq!(created, Some(VALIDATOR_COUNT));
    assert_eq!(state.validators.len_u64(), VALIDATOR_COUNT + 1);

    let new_validator = state
        .validators
        .get(VALIDATOR_COUNT)
        .expect("the validator was just created");
    assert_eq!(new_validator.activation_eligibility_epoch, FAR_FUTURE_EPOCH);
    assert_eq!(new_validator.activation_epoch, FAR_FUTURE_EPOCH);

    // An invalid proof of possession is skipped without an error.
    let mut forged = interop::quick_start_deposit_data::<Minimal>(&config, VALIDATOR_COUNT + 1);
    forged.signature = SignatureBytes::empty();

    let created =
        apply_deposit_data(&config, &mut state, None, forged).expect("balances are in range");

    assert_eq!(created, None);
    assert_eq!(state.validators.len_u64(), VALIDATOR_COUNT + 1);
}
