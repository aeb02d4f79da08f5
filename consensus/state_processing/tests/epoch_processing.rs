//! End-to-end tests of `per_epoch_processing` against states built with
//! `TestingBeaconStateBuilder`.
use state_processing::per_epoch_processing::{
    EpochProcessingConfig, ValidatorPartition, process_epoch_with_config,
};
use state_processing::{EpochProcessingError, per_epoch_processing};
use types::test_utils::{TestingBeaconStateBuilder, deterministic_sync_committee};
use types::{
    BeaconState, BeaconStateError, ChainSpec, Epoch, ParticipationFlag, ParticipationFlags,
    SyncCommittee,
};

const INCREMENT: u64 = 1_000_000_000;
const NUM_VALIDATORS: usize = 64;

/// With 64 validators of 32 ETH every base reward is `32 * 44_721`.
const FULL_ATTESTATION_REWARD: u64 = 1_207_467;
const MISSED_SOURCE_AND_TARGET_PENALTY: u64 = 894_420;

type Selection = Result<SyncCommittee, BeaconStateError>;

fn select_next(state: &BeaconState, spec: &ChainSpec) -> Selection {
    Ok(deterministic_sync_committee(state.validators().len(), 2, spec))
}

fn fail_selection(_: &BeaconState, _: &ChainSpec) -> Selection {
    Err(BeaconStateError::UnknownValidator(usize::MAX))
}

fn all_flags() -> ParticipationFlags {
    ParticipationFlags::from_flags(&ParticipationFlag::ALL)
}

fn state_at(epoch: u64, finalized_epoch: u64, spec: &ChainSpec) -> BeaconState {
    logging::create_test_tracing_subscriber();
    TestingBeaconStateBuilder::new(NUM_VALIDATORS, spec)
        .epoch(Epoch::new(epoch))
        .finalized_epoch(Epoch::new(finalized_epoch))
        .build()
}

#[test]
fn genesis_epoch_leaves_balances_and_committees() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(0, 0, &spec);
    state.previous_epoch_participation = vec![all_flags(); NUM_VALIDATORS];
    state.current_epoch_participation = vec![all_flags(); NUM_VALIDATORS];
    let original = state.clone();

    let summary = per_epoch_processing(&mut state, &spec, &fail_selection).unwrap();

    assert_eq!(state.balances(), original.balances());
    assert_eq!(state.inactivity_scores(), original.inactivity_scores());
    assert_eq!(state.current_sync_committee, original.current_sync_committee);
    assert_eq!(state.next_sync_committee, original.next_sync_committee);
    assert!(!summary.sync_committee_rotated);

    // Participation still rotates.
    assert_eq!(
        state.previous_epoch_participation,
        original.current_epoch_participation
    );
    assert_eq!(
        state.current_epoch_participation,
        vec![ParticipationFlags::default(); NUM_VALIDATORS]
    );
}

#[test]
fn full_participation_is_rewarded() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    state.previous_epoch_participation = vec![all_flags(); NUM_VALIDATORS];

    let summary = per_epoch_processing(&mut state, &spec, &select_next).unwrap();

    assert!(!summary.is_in_inactivity_leak);
    assert_eq!(
        state.balances(),
        vec![32 * INCREMENT + FULL_ATTESTATION_REWARD; NUM_VALIDATORS]
    );
    assert_eq!(state.inactivity_scores(), vec![0; NUM_VALIDATORS]);
    assert_eq!(
        summary.balance_change(0),
        Some((32 * INCREMENT, 32 * INCREMENT + FULL_ATTESTATION_REWARD))
    );
    assert_eq!(
        summary.previous_epoch_head_attesting_balance(),
        NUM_VALIDATORS as u64 * 32 * INCREMENT
    );
}

#[test]
fn missed_attestations_are_penalized() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);

    let summary = per_epoch_processing(&mut state, &spec, &select_next).unwrap();

    // The inactivity score rises by the bias and is forgiven again outside of a leak.
    assert_eq!(state.inactivity_scores(), vec![0; NUM_VALIDATORS]);
    assert_eq!(
        state.balances(),
        vec![32 * INCREMENT - MISSED_SOURCE_AND_TARGET_PENALTY; NUM_VALIDATORS]
    );
    assert!(!summary.is_previous_epoch_source_attester(0));
}

#[test]
fn inactivity_leak_penalties_grow_each_epoch() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(10, 0, &spec);

    let summary = per_epoch_processing(&mut state, &spec, &select_next).unwrap();
    assert!(summary.is_in_inactivity_leak);
    assert_eq!(state.inactivity_scores(), vec![4; NUM_VALIDATORS]);

    // 32 ETH * 4 / (4 * 50_331_648)
    let first_inactivity_penalty = 635;
    assert_eq!(
        state.balances(),
        vec![
            32 * INCREMENT - MISSED_SOURCE_AND_TARGET_PENALTY - first_inactivity_penalty;
            NUM_VALIDATORS
        ]
    );

    state.slot = Epoch::new(11).end_slot(spec.slots_per_epoch);
    per_epoch_processing(&mut state, &spec, &select_next).unwrap();
    assert_eq!(state.inactivity_scores(), vec![8; NUM_VALIDATORS]);
}

#[test]
fn leak_withholds_rewards_from_attesters() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(10, 0, &spec);
    state.previous_epoch_participation = vec![all_flags(); NUM_VALIDATORS];
    state.inactivity_scores = vec![3; NUM_VALIDATORS];

    per_epoch_processing(&mut state, &spec, &select_next).unwrap();

    assert_eq!(state.balances(), vec![32 * INCREMENT; NUM_VALIDATORS]);
    assert_eq!(state.inactivity_scores(), vec![2; NUM_VALIDATORS]);
}

#[test]
fn proportional_slashing_penalty() {
    let mut spec = ChainSpec::minimal();
    spec.proportional_slashing_multiplier_altair = 3;
    let current_epoch = Epoch::new(5);

    // 17 validators of 4 ETH and one slashed validator of 32 ETH: 100 ETH active.
    let mut state = TestingBeaconStateBuilder::new(18, &spec)
        .epoch(current_epoch)
        .finalized_epoch(Epoch::new(3))
        .effective_balance(4 * INCREMENT)
        .build();
    state.validators[0].effective_balance = 32 * INCREMENT;
    state.validators[0].slashed = true;
    state.validators[0].withdrawable_epoch =
        current_epoch.saturating_add(spec.epochs_per_slashings_vector / 2);
    state.balances[0] = 32 * INCREMENT;
    state.slashings[0] = 3 * INCREMENT;
    let original = state.clone();

    let conf = EpochProcessingConfig {
        slashings: true,
        ..EpochProcessingConfig::disable_all()
    };
    let summary = process_epoch_with_config(&mut state, &spec, &select_next, &conf).unwrap();

    assert_eq!(summary.current_epoch_total_active_balance(), 100 * INCREMENT);
    assert_eq!(summary.slashing_penalties_applied, 1);
    assert_eq!(state.balances[0], 30 * INCREMENT);
    assert_eq!(state.balances()[1..], original.balances()[1..]);
}

#[test]
fn no_slashing_due_leaves_balances() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    state.validators[0].slashed = true;
    state.slashings[0] = 3 * INCREMENT;
    let original = state.clone();

    let conf = EpochProcessingConfig {
        slashings: true,
        ..EpochProcessingConfig::disable_all()
    };
    let summary = process_epoch_with_config(&mut state, &spec, &select_next, &conf).unwrap();

    assert_eq!(summary.slashing_penalties_applied, 0);
    assert_eq!(state, original);
}

#[test]
fn sync_committee_rotates_at_period_boundary() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(spec.epochs_per_sync_committee_period - 1, 0, &spec);
    let previous_next = state.next_sync_committee.clone();

    let summary = per_epoch_processing(&mut state, &spec, &select_next).unwrap();

    assert!(summary.sync_committee_rotated);
    assert_eq!(state.current_sync_committee, previous_next);
    assert_eq!(
        *state.next_sync_committee,
        deterministic_sync_committee(NUM_VALIDATORS, 2, &spec)
    );

    // The cache is built for the period the promoted committee serves.
    state.slot = Epoch::new(spec.epochs_per_sync_committee_period).start_slot(spec.slots_per_epoch);
    let expected_indices = (1..=spec.sync_committee_size as usize).collect::<Vec<_>>();
    assert_eq!(
        state.get_sync_committee_indices(&spec).unwrap(),
        expected_indices.as_slice()
    );
}

#[test]
fn sync_committee_kept_within_period() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    let original = state.clone();

    let summary = per_epoch_processing(&mut state, &spec, &fail_selection).unwrap();

    assert!(!summary.sync_committee_rotated);
    assert_eq!(state.current_sync_committee, original.current_sync_committee);
    assert_eq!(state.next_sync_committee, original.next_sync_committee);
}

#[test]
fn failed_selection_leaves_state_unchanged() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(spec.epochs_per_sync_committee_period - 1, 0, &spec);
    state.previous_epoch_participation = vec![all_flags(); NUM_VALIDATORS];
    let original = state.clone();

    let result = per_epoch_processing(&mut state, &spec, &fail_selection);

    assert_eq!(
        result,
        Err(EpochProcessingError::SyncCommitteeSelection(
            BeaconStateError::UnknownValidator(usize::MAX)
        ))
    );
    assert_eq!(state, original);
}

#[test]
fn undersized_selection_leaves_state_unchanged() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(spec.epochs_per_sync_committee_period - 1, 0, &spec);
    let original = state.clone();

    let undersized =
        |_: &BeaconState, _: &ChainSpec| -> Selection { Ok(SyncCommittee::temporary(3)) };
    let result = per_epoch_processing(&mut state, &spec, &undersized);

    assert_eq!(
        result,
        Err(EpochProcessingError::InvalidSyncCommitteeSize {
            expected: spec.sync_committee_size as usize,
            found: 3,
        })
    );
    assert_eq!(state, original);
}

#[test]
fn short_inactivity_scores_are_rejected() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    state.inactivity_scores.pop();
    let original = state.clone();

    let result = per_epoch_processing(&mut state, &spec, &select_next);

    assert_eq!(
        result,
        Err(EpochProcessingError::InactivityScoresTooShort {
            validators: NUM_VALIDATORS,
            inactivity_scores: NUM_VALIDATORS - 1,
        })
    );
    assert_eq!(state, original);
}

#[test]
fn short_participation_is_rejected() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    state.previous_epoch_participation.pop();

    let result = per_epoch_processing(&mut state, &spec, &select_next);

    assert_eq!(
        result,
        Err(EpochProcessingError::ParticipationLengthMismatch {
            precompute: NUM_VALIDATORS,
            participation: NUM_VALIDATORS - 1,
        })
    );
}

#[test]
fn short_balances_are_rejected() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    state.balances.pop();
    let original = state.clone();

    let result = per_epoch_processing(&mut state, &spec, &select_next);

    assert_eq!(
        result,
        Err(EpochProcessingError::PrecomputeLengthMismatch {
            precompute: NUM_VALIDATORS,
            validators: NUM_VALIDATORS,
            balances: NUM_VALIDATORS - 1,
        })
    );
    assert_eq!(state, original);
}

#[test]
fn participation_rotation_twice_clears_previous() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(5, 3, &spec);
    state.current_epoch_participation = vec![all_flags(); NUM_VALIDATORS];

    let conf = EpochProcessingConfig {
        participation_flag_updates: true,
        ..EpochProcessingConfig::disable_all()
    };
    process_epoch_with_config(&mut state, &spec, &select_next, &conf).unwrap();
    assert_eq!(
        state.previous_epoch_participation,
        vec![all_flags(); NUM_VALIDATORS]
    );

    process_epoch_with_config(&mut state, &spec, &select_next, &conf).unwrap();
    assert_eq!(
        state.previous_epoch_participation,
        vec![ParticipationFlags::default(); NUM_VALIDATORS]
    );
    assert_eq!(
        state.current_epoch_participation,
        vec![ParticipationFlags::default(); NUM_VALIDATORS]
    );
}

#[test]
fn parallel_matches_sequential() {
    let spec = ChainSpec::minimal();
    let mut state = state_at(spec.epochs_per_sync_committee_period - 1, 0, &spec);
    for (index, flags) in state.previous_epoch_participation.iter_mut().enumerate() {
        *flags = ParticipationFlags::new((index % 8) as u8);
    }
    for (index, score) in state.inactivity_scores.iter_mut().enumerate() {
        *score = index as u64;
    }
    state.validators[3].slashed = true;
    state.validators[3].withdrawable_epoch = state
        .current_epoch(&spec)
        .saturating_add(spec.epochs_per_slashings_vector / 2);
    state.slashings[1] = 32 * INCREMENT;

    let mut sequential_state = state.clone();
    let mut parallel_state = state;

    let sequential = process_epoch_with_config(
        &mut sequential_state,
        &spec,
        &select_next,
        &EpochProcessingConfig::enable_all().with_partition(ValidatorPartition::sequential()),
    )
    .unwrap();
    let parallel = process_epoch_with_config(
        &mut parallel_state,
        &spec,
        &select_next,
        &EpochProcessingConfig::enable_all().with_partition(ValidatorPartition::new(5, 0)),
    )
    .unwrap();

    assert_eq!(sequential.slashing_penalties_applied, 1);
    assert_eq!(sequential, parallel);
    assert_eq!(sequential_state, parallel_state);
}

#[test]
fn active_balance_below_one_increment_is_processed() {
    let spec = ChainSpec::minimal();
    logging::create_test_tracing_subscriber();
    let mut state = TestingBeaconStateBuilder::new(1, &spec)
        .epoch(Epoch::new(5))
        .finalized_epoch(Epoch::new(3))
        .effective_balance(INCREMENT / 2)
        .build();
    state.previous_epoch_participation = vec![all_flags()];

    let summary = per_epoch_processing(&mut state, &spec, &select_next).unwrap();

    assert_eq!(summary.total_balances.active_current_epoch, INCREMENT / 2);
    assert_eq!(state.balances(), &[INCREMENT / 2]);
}
