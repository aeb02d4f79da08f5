#![deny(clippy::wildcard_imports)]

use crate::metrics;
pub use epoch_processing_summary::EpochProcessingSummary;
use errors::EpochProcessingError as Error;
pub use inactivity_updates::process_inactivity_updates;
pub use participation::process_epoch_participation;
pub use participation_flag_updates::process_participation_flag_updates;
pub use partition::ValidatorPartition;
pub use rewards_and_penalties::{Delta, get_attestation_deltas, process_rewards_and_penalties};
pub use slashings::process_slashings;
pub use sync_committee_updates::{SyncCommitteeSelector, process_sync_committee_updates};
use tracing::{debug, instrument};
use types::{BeaconState, ChainSpec, Epoch, ParticipationFlags};
pub use validator_snapshot::{BalanceAccumulator, ValidatorPrecompute, build_validator_snapshot};

pub mod epoch_processing_summary;
pub mod errors;
pub mod inactivity_updates;
pub mod participation;
pub mod participation_flag_updates;
pub mod partition;
pub mod rewards_and_penalties;
pub mod slashings;
pub mod sync_committee_updates;
pub mod validator_snapshot;

/// Selects which phases of epoch processing run, and how validator work is fanned out.
///
/// The validator snapshot and participation resolution always run, since every other phase reads
/// their output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochProcessingConfig {
    pub inactivity_updates: bool,
    pub rewards_and_penalties: bool,
    pub slashings: bool,
    pub participation_flag_updates: bool,
    pub sync_committee_updates: bool,
    pub partition: ValidatorPartition,
}

impl Default for EpochProcessingConfig {
    fn default() -> EpochProcessingConfig {
        Self::enable_all()
    }
}

impl EpochProcessingConfig {
    pub fn enable_all() -> EpochProcessingConfig {
        Self {
            inactivity_updates: true,
            rewards_and_penalties: true,
            slashings: true,
            participation_flag_updates: true,
            sync_committee_updates: true,
            partition: ValidatorPartition::default(),
        }
    }

    pub fn disable_all() -> EpochProcessingConfig {
        Self {
            inactivity_updates: false,
            rewards_and_penalties: false,
            slashings: false,
            participation_flag_updates: false,
            sync_committee_updates: false,
            partition: ValidatorPartition::default(),
        }
    }

    pub fn with_partition(mut self, partition: ValidatorPartition) -> Self {
        self.partition = partition;
        self
    }
}

/// Values from the state that are immutable throughout epoch processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateContext {
    pub current_epoch: Epoch,
    pub previous_epoch: Epoch,
    pub is_genesis_epoch: bool,
    pub is_in_inactivity_leak: bool,
}

impl StateContext {
    pub fn new(state: &BeaconState, spec: &ChainSpec) -> Result<Self, Error> {
        let current_epoch = state.current_epoch(spec);
        let previous_epoch = state.previous_epoch(spec);
        Ok(Self {
            current_epoch,
            previous_epoch,
            is_genesis_epoch: current_epoch == spec.genesis_epoch(),
            is_in_inactivity_leak: state.is_in_inactivity_leak(previous_epoch, spec)?,
        })
    }
}

/// Per-validator lists computed by the pipeline, not yet written to the state.
#[derive(Debug, Default)]
struct StagedChanges {
    balances: Option<Vec<u64>>,
    inactivity_scores: Option<Vec<u64>>,
    participation: Option<(Vec<ParticipationFlags>, Vec<ParticipationFlags>)>,
}

impl StagedChanges {
    /// Write every staged list to `state`.
    ///
    /// Either all lists are written, or none are. The returned value holds the replaced lists.
    fn commit(self, state: &mut BeaconState) -> Result<StagedChanges, Error> {
        let mut replaced = StagedChanges::default();

        if let Some(balances) = self.balances {
            match state.replace_balances(balances) {
                Ok(previous) => replaced.balances = Some(previous),
                Err(e) => {
                    replaced.restore(state);
                    return Err(e.into());
                }
            }
        }

        if let Some(scores) = self.inactivity_scores {
            match state.replace_inactivity_scores(scores) {
                Ok(previous) => replaced.inactivity_scores = Some(previous),
                Err(e) => {
                    replaced.restore(state);
                    return Err(e.into());
                }
            }
        }

        if let Some((previous, current)) = self.participation {
            match state.replace_epoch_participation(previous, current) {
                Ok(replaced_participation) => replaced.participation = Some(replaced_participation),
                Err(e) => {
                    replaced.restore(state);
                    return Err(e.into());
                }
            }
        }

        Ok(replaced)
    }

    /// Put lists previously taken from `state` back in place.
    fn restore(self, state: &mut BeaconState) {
        if let Some(balances) = self.balances {
            state.balances = balances;
        }
        if let Some(scores) = self.inactivity_scores {
            state.inactivity_scores = scores;
        }
        if let Some((previous, current)) = self.participation {
            state.previous_epoch_participation = previous;
            state.current_epoch_participation = current;
        }
    }
}

/// Performs per-epoch processing on some BeaconState.
///
/// Mutates the given `BeaconState`, returning early if an error is encountered. If an error is
/// returned the state is left as it was.
pub fn process_epoch<S: SyncCommitteeSelector + ?Sized>(
    state: &mut BeaconState,
    spec: &ChainSpec,
    selector: &S,
) -> Result<EpochProcessingSummary, Error> {
    process_epoch_with_config(state, spec, selector, &EpochProcessingConfig::default())
}

/// As `process_epoch`, running only the phases enabled in `conf`.
#[instrument(skip_all)]
pub fn process_epoch_with_config<S: SyncCommitteeSelector + ?Sized>(
    state: &mut BeaconState,
    spec: &ChainSpec,
    selector: &S,
    conf: &EpochProcessingConfig,
) -> Result<EpochProcessingSummary, Error> {
    let _timer = metrics::start_timer(&metrics::PROCESS_EPOCH_TIME);

    let state_ctxt = StateContext::new(state, spec)?;
    let partition = &conf.partition;
    let num_validators = state.validators().len();
    let mut staged = StagedChanges::default();

    let snapshot_timer = metrics::start_timer(&metrics::VALIDATOR_SNAPSHOT_TIME);
    let (precompute, accumulator) = build_validator_snapshot(
        state.validators(),
        state.inactivity_scores(),
        state_ctxt.current_epoch,
        state_ctxt.previous_epoch,
        partition,
    )?;
    metrics::stop_timer(snapshot_timer);

    let participation_timer = metrics::start_timer(&metrics::PARTICIPATION_TIME);
    let (precompute, accumulator) = process_epoch_participation(
        &state.current_epoch_participation,
        &state.previous_epoch_participation,
        precompute,
        accumulator,
        partition,
    )?;
    metrics::stop_timer(participation_timer);

    let precompute = if conf.inactivity_updates {
        let _timer = metrics::start_timer(&metrics::INACTIVITY_UPDATES_TIME);
        let (precompute, scores) =
            process_inactivity_updates(precompute, &state_ctxt, spec, partition)?;
        staged.inactivity_scores = scores;
        precompute
    } else {
        precompute
    };

    let precompute = if conf.rewards_and_penalties {
        let _timer = metrics::start_timer(&metrics::REWARDS_AND_PENALTIES_TIME);
        let (precompute, balances) = process_rewards_and_penalties(
            precompute,
            &accumulator,
            num_validators,
            state.balances(),
            &state_ctxt,
            spec,
            partition,
        )?;
        staged.balances = balances;
        precompute
    } else {
        precompute
    };

    let mut slashing_penalties_applied = 0;
    if conf.slashings {
        let _timer = metrics::start_timer(&metrics::SLASHINGS_TIME);
        let rewarded = staged.balances.take();
        let has_rewards = rewarded.is_some();
        let balances = rewarded.unwrap_or_else(|| state.balances().to_vec());
        let (balances, applied) = process_slashings(
            state.validators(),
            state.get_all_slashings(),
            balances,
            accumulator.active_current_epoch,
            state_ctxt.current_epoch,
            spec,
            partition,
        )?;
        slashing_penalties_applied = applied;
        if applied > 0 || has_rewards {
            staged.balances = Some(balances);
        }
    }

    let rotation_timer = metrics::start_timer(&metrics::EPOCH_ROTATION_TIME);
    if conf.participation_flag_updates {
        staged.participation = Some(process_participation_flag_updates(
            &state.current_epoch_participation,
            num_validators,
        ));
    }

    let replaced = staged.commit(state)?;

    let sync_committee_rotated = if conf.sync_committee_updates {
        match process_sync_committee_updates(state, spec, selector) {
            Ok(rotated) => rotated,
            Err(e) => {
                replaced.restore(state);
                return Err(e);
            }
        }
    } else {
        false
    };
    metrics::stop_timer(rotation_timer);

    metrics::inc_counter_by(
        &metrics::SLASHING_PENALTIES_APPLIED,
        slashing_penalties_applied as u64,
    );
    if sync_committee_rotated {
        metrics::inc_counter(&metrics::SYNC_COMMITTEE_ROTATIONS);
    }
    metrics::set_gauge(
        &metrics::VALIDATORS_PROCESSED,
        i64::try_from(num_validators).unwrap_or(i64::MAX),
    );

    debug!(
        epoch = %state_ctxt.current_epoch,
        validators = num_validators,
        is_in_inactivity_leak = state_ctxt.is_in_inactivity_leak,
        slashing_penalties_applied,
        sync_committee_rotated,
        "Processed epoch"
    );

    Ok(EpochProcessingSummary {
        epoch: state_ctxt.current_epoch,
        total_balances: accumulator,
        validators: precompute,
        is_in_inactivity_leak: state_ctxt.is_in_inactivity_leak,
        slashing_penalties_applied,
        sync_committee_rotated,
    })
}
