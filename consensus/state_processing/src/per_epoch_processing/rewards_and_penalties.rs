use super::{
    BalanceAccumulator, Error, StateContext, ValidatorPrecompute, partition::ValidatorPartition,
};
use crate::common::{
    altair::{BaseRewardPerIncrement, get_base_reward},
    decrease_balance_directly, increase_balance_directly,
};
use itertools::izip;
use safe_arith::SafeArith;
use tracing::instrument;
use types::{ChainSpec, ParticipationFlag, consts::altair::NUM_FLAG_INDICES};

/// Combination of several deltas for a single validator.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Delta {
    pub rewards: u64,
    pub penalties: u64,
}

impl Delta {
    /// Reward the validator with the `reward`.
    pub fn reward(&mut self, reward: u64) -> Result<(), Error> {
        self.rewards = self.rewards.safe_add(reward)?;
        Ok(())
    }

    /// Penalize the validator with the `penalty`.
    pub fn penalize(&mut self, penalty: u64) -> Result<(), Error> {
        self.penalties = self.penalties.safe_add(penalty)?;
        Ok(())
    }

    /// Apply the delta to `balance`: rewards first, then penalties saturating at zero.
    pub fn apply(&self, balance: &mut u64) -> Result<(), Error> {
        increase_balance_directly(balance, self.rewards)?;
        decrease_balance_directly(balance, self.penalties)?;
        Ok(())
    }
}

/// Per-epoch values shared by every validator's reward computation.
///
/// Absent when there is no active balance in the current epoch, in which case every delta is zero.
/// Otherwise the totals are read as at least one effective balance increment.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardsAndPenaltiesContext {
    base_reward_per_increment: BaseRewardPerIncrement,
    active_increments: u64,
    attested_increments: [u64; NUM_FLAG_INDICES],
    inactivity_penalty_denominator: u64,
}

impl RewardsAndPenaltiesContext {
    pub fn new(accumulator: &BalanceAccumulator, spec: &ChainSpec) -> Result<Option<Self>, Error> {
        if accumulator.active_current_epoch == 0 {
            return Ok(None);
        }

        let increment = spec.effective_balance_increment;
        let mut attested_increments = [0; NUM_FLAG_INDICES];
        for (increments, flag) in attested_increments.iter_mut().zip(ParticipationFlag::ALL) {
            *increments = accumulator
                .previous_epoch_attesting_balance(flag, spec)
                .safe_div(increment)?;
        }

        let total_active_balance = accumulator.total_active_balance(spec);
        Ok(Some(Self {
            base_reward_per_increment: BaseRewardPerIncrement::new(total_active_balance, spec)?,
            active_increments: total_active_balance.safe_div(increment)?,
            attested_increments,
            inactivity_penalty_denominator: spec
                .inactivity_score_bias
                .safe_mul(spec.inactivity_penalty_quotient_altair)?,
        }))
    }

    fn get_attested_increments(&self, flag: ParticipationFlag) -> Result<u64, Error> {
        self.attested_increments
            .get(flag.index())
            .copied()
            .ok_or(Error::InvalidFlagIndex(flag.index()))
    }
}

/// Compute and apply the attestation rewards and penalties of every validator.
///
/// Returns the records with their before/after balances filled in, and the new balance list, or
/// `None` at the genesis epoch where balances are left as they are.
#[instrument(skip_all)]
pub fn process_rewards_and_penalties(
    mut precompute: Vec<ValidatorPrecompute>,
    accumulator: &BalanceAccumulator,
    num_validators: usize,
    balances: &[u64],
    state_ctxt: &StateContext,
    spec: &ChainSpec,
    partition: &ValidatorPartition,
) -> Result<(Vec<ValidatorPrecompute>, Option<Vec<u64>>), Error> {
    // Don't process rewards and penalties in genesis epoch.
    if state_ctxt.is_genesis_epoch {
        return Ok((precompute, None));
    }

    // Guard against an out-of-bounds using validator balance precompute.
    if precompute.len() != num_validators || precompute.len() != balances.len() {
        return Err(Error::PrecomputeLengthMismatch {
            precompute: precompute.len(),
            validators: num_validators,
            balances: balances.len(),
        });
    }

    let rewards_ctxt = RewardsAndPenaltiesContext::new(accumulator, spec)?;

    partition.map_chunks_mut(&mut precompute, |offset, chunk| {
        let chunk_balances = balances
            .get(offset..offset.safe_add(chunk.len())?)
            .ok_or(Error::PrecomputeLengthMismatch {
                precompute: num_validators,
                validators: num_validators,
                balances: balances.len(),
            })?;

        for (validator, balance) in izip!(chunk.iter_mut(), chunk_balances) {
            let delta = get_validator_delta(validator, rewards_ctxt.as_ref(), state_ctxt, spec)?;
            let mut new_balance = *balance;
            delta.apply(&mut new_balance)?;

            validator.before_epoch_transition_balance = *balance;
            validator.after_epoch_transition_balance = new_balance;
        }
        Ok::<_, Error>(())
    })?;

    let new_balances = precompute
        .iter()
        .map(|validator| validator.after_epoch_transition_balance)
        .collect();

    Ok((precompute, Some(new_balances)))
}

/// Compute the attestation rewards and penalties of every validator without applying them.
///
/// All deltas are zero at the genesis epoch.
pub fn get_attestation_deltas(
    precompute: &[ValidatorPrecompute],
    accumulator: &BalanceAccumulator,
    state_ctxt: &StateContext,
    spec: &ChainSpec,
    partition: &ValidatorPartition,
) -> Result<Vec<Delta>, Error> {
    if state_ctxt.is_genesis_epoch {
        return Ok(vec![Delta::default(); precompute.len()]);
    }

    let rewards_ctxt = RewardsAndPenaltiesContext::new(accumulator, spec)?;
    let partials = partition.map_ranges(precompute.len(), |range| {
        precompute
            .get(range)
            .unwrap_or_default()
            .iter()
            .map(|validator| get_validator_delta(validator, rewards_ctxt.as_ref(), state_ctxt, spec))
            .collect::<Result<Vec<_>, _>>()
    })?;

    Ok(partials.concat())
}

fn get_validator_delta(
    validator: &ValidatorPrecompute,
    rewards_ctxt: Option<&RewardsAndPenaltiesContext>,
    state_ctxt: &StateContext,
    spec: &ChainSpec,
) -> Result<Delta, Error> {
    let mut delta = Delta::default();

    let Some(rewards_ctxt) = rewards_ctxt else {
        return Ok(delta);
    };
    if !validator.is_eligible() {
        return Ok(delta);
    }

    let base_reward = get_base_reward(
        validator.current_epoch_effective_balance,
        rewards_ctxt.base_reward_per_increment,
        spec,
    )?;
    for flag in ParticipationFlag::ALL {
        get_flag_index_delta(&mut delta, validator, flag, base_reward, rewards_ctxt, state_ctxt, spec)?;
    }
    get_inactivity_penalty_delta(&mut delta, validator, rewards_ctxt)?;

    Ok(delta)
}

fn get_flag_index_delta(
    delta: &mut Delta,
    validator: &ValidatorPrecompute,
    flag: ParticipationFlag,
    base_reward: u64,
    rewards_ctxt: &RewardsAndPenaltiesContext,
    state_ctxt: &StateContext,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let weight = flag.weight(spec);

    if validator.is_unslashed_participating(flag) {
        if !state_ctxt.is_in_inactivity_leak {
            let reward_numerator = base_reward
                .safe_mul(weight)?
                .safe_mul(rewards_ctxt.get_attested_increments(flag)?)?;
            delta.reward(
                reward_numerator.safe_div(
                    rewards_ctxt
                        .active_increments
                        .safe_mul(spec.weight_denominator)?,
                )?,
            )?;
        }
    } else if flag.is_penalized_when_missed() {
        delta.penalize(base_reward.safe_mul(weight)?.safe_div(spec.weight_denominator)?)?;
    }
    Ok(())
}

fn get_inactivity_penalty_delta(
    delta: &mut Delta,
    validator: &ValidatorPrecompute,
    rewards_ctxt: &RewardsAndPenaltiesContext,
) -> Result<(), Error> {
    if !validator.is_unslashed_participating(ParticipationFlag::TimelyTarget) {
        let penalty_numerator = validator
            .current_epoch_effective_balance
            .safe_mul(validator.inactivity_score)?;
        delta.penalize(penalty_numerator.safe_div(rewards_ctxt.inactivity_penalty_denominator)?)?;
    }
    Ok(())
}
