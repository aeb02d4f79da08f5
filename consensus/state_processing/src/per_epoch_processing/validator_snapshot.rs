use super::{Error, partition::ValidatorPartition};
use safe_arith::{ArithError, SafeArith};
use tracing::instrument;
use types::{ChainSpec, Epoch, ParticipationFlag, Validator};

/// Per-validator facts gathered once per epoch and threaded through every phase of epoch
/// processing.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ValidatorPrecompute {
    pub is_slashed: bool,
    pub is_withdrawable_current_epoch: bool,
    pub current_epoch_effective_balance: u64,
    /// Seeded from the state, then updated by `process_inactivity_updates`.
    pub inactivity_score: u64,
    pub is_active_current_epoch: bool,
    pub is_active_previous_epoch: bool,
    pub is_current_epoch_target_attester: bool,
    // Previous epoch participation, only set for validators active in the previous epoch.
    pub is_previous_epoch_attester: bool,
    pub is_previous_epoch_target_attester: bool,
    pub is_previous_epoch_head_attester: bool,
    // Diagnostics.
    pub before_epoch_transition_balance: u64,
    pub after_epoch_transition_balance: u64,
}

impl ValidatorPrecompute {
    /// Whether the validator is subject to inactivity updates, rewards and penalties.
    #[inline]
    pub fn is_eligible(&self) -> bool {
        self.is_active_previous_epoch || (self.is_slashed && !self.is_withdrawable_current_epoch)
    }

    #[inline]
    pub fn is_previous_epoch_participant(&self, flag: ParticipationFlag) -> bool {
        match flag {
            ParticipationFlag::TimelySource => self.is_previous_epoch_attester,
            ParticipationFlag::TimelyTarget => self.is_previous_epoch_target_attester,
            ParticipationFlag::TimelyHead => self.is_previous_epoch_head_attester,
        }
    }

    #[inline]
    pub fn is_unslashed_participating(&self, flag: ParticipationFlag) -> bool {
        !self.is_slashed && self.is_previous_epoch_participant(flag)
    }
}

/// Sums of effective balance by activity and participation category.
///
/// Only ever built up by addition.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct BalanceAccumulator {
    pub active_current_epoch: u64,
    pub active_previous_epoch: u64,
    pub current_epoch_target_attested: u64,
    pub previous_epoch_attested: u64,
    pub previous_epoch_target_attested: u64,
    pub previous_epoch_head_attested: u64,
}

impl BalanceAccumulator {
    /// Field-wise sum of two accumulators.
    pub fn combine(self, other: BalanceAccumulator) -> Result<Self, ArithError> {
        Ok(Self {
            active_current_epoch: self.active_current_epoch.safe_add(other.active_current_epoch)?,
            active_previous_epoch: self
                .active_previous_epoch
                .safe_add(other.active_previous_epoch)?,
            current_epoch_target_attested: self
                .current_epoch_target_attested
                .safe_add(other.current_epoch_target_attested)?,
            previous_epoch_attested: self
                .previous_epoch_attested
                .safe_add(other.previous_epoch_attested)?,
            previous_epoch_target_attested: self
                .previous_epoch_target_attested
                .safe_add(other.previous_epoch_target_attested)?,
            previous_epoch_head_attested: self
                .previous_epoch_head_attested
                .safe_add(other.previous_epoch_head_attested)?,
        })
    }

    /// The previous-epoch attesting balance for `flag`.
    pub fn previous_epoch_attested_balance(&self, flag: ParticipationFlag) -> u64 {
        match flag {
            ParticipationFlag::TimelySource => self.previous_epoch_attested,
            ParticipationFlag::TimelyTarget => self.previous_epoch_target_attested,
            ParticipationFlag::TimelyHead => self.previous_epoch_head_attested,
        }
    }

    /// The current epoch active balance, never less than one effective balance increment.
    pub fn total_active_balance(&self, spec: &ChainSpec) -> u64 {
        std::cmp::max(self.active_current_epoch, spec.effective_balance_increment)
    }

    /// As `previous_epoch_attested_balance`, never less than one effective balance increment.
    pub fn previous_epoch_attesting_balance(&self, flag: ParticipationFlag, spec: &ChainSpec) -> u64 {
        std::cmp::max(
            self.previous_epoch_attested_balance(flag),
            spec.effective_balance_increment,
        )
    }
}

/// Build one `ValidatorPrecompute` per validator and the active balance totals.
///
/// Participation fields are left unset; see `process_epoch_participation`.
#[instrument(skip_all, fields(validators = validators.len()))]
pub fn build_validator_snapshot(
    validators: &[Validator],
    inactivity_scores: &[u64],
    current_epoch: Epoch,
    previous_epoch: Epoch,
    partition: &ValidatorPartition,
) -> Result<(Vec<ValidatorPrecompute>, BalanceAccumulator), Error> {
    if inactivity_scores.len() < validators.len() {
        return Err(Error::InactivityScoresTooShort {
            validators: validators.len(),
            inactivity_scores: inactivity_scores.len(),
        });
    }

    let partials = partition.map_ranges(validators.len(), |range| {
        let mut accumulator = BalanceAccumulator::default();
        let records = validators
            .get(range.clone())
            .into_iter()
            .flatten()
            .zip(inactivity_scores.get(range).into_iter().flatten())
            .map(|(validator, inactivity_score)| {
                snapshot_validator(
                    validator,
                    *inactivity_score,
                    current_epoch,
                    previous_epoch,
                    &mut accumulator,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok::<_, Error>((records, accumulator))
    })?;

    let mut precompute = Vec::with_capacity(validators.len());
    let mut accumulator = BalanceAccumulator::default();
    for (records, partial) in partials {
        precompute.extend(records);
        accumulator = accumulator.combine(partial)?;
    }

    Ok((precompute, accumulator))
}

fn snapshot_validator(
    validator: &Validator,
    inactivity_score: u64,
    current_epoch: Epoch,
    previous_epoch: Epoch,
    accumulator: &mut BalanceAccumulator,
) -> Result<ValidatorPrecompute, ArithError> {
    let effective_balance = validator.effective_balance;
    let is_active_current_epoch = validator.is_active_at(current_epoch);
    let is_active_previous_epoch = validator.is_active_at(previous_epoch);

    if is_active_current_epoch {
        accumulator
            .active_current_epoch
            .safe_add_assign(effective_balance)?;
    }
    if is_active_previous_epoch {
        accumulator
            .active_previous_epoch
            .safe_add_assign(effective_balance)?;
    }

    Ok(ValidatorPrecompute {
        is_slashed: validator.slashed,
        is_withdrawable_current_epoch: validator.is_withdrawable_at(current_epoch),
        current_epoch_effective_balance: effective_balance,
        inactivity_score,
        is_active_current_epoch,
        is_active_previous_epoch,
        ..ValidatorPrecompute::default()
    })
}
