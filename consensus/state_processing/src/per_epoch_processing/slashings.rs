use super::{Error, partition::ValidatorPartition};
use crate::common::decrease_balance_directly;
use safe_arith::{SafeArith, SafeArithIter};
use tracing::instrument;
use types::{ChainSpec, Epoch, Validator};

#[derive(Debug, Clone, PartialEq)]
pub struct SlashingsContext {
    pub adjusted_total_slashing_balance: u64,
    pub target_withdrawable_epoch: Epoch,
    pub total_active_balance: u64,
}

impl SlashingsContext {
    pub fn new(
        slashings: &[u64],
        total_active_balance: u64,
        current_epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<Self, Error> {
        let total_active_balance =
            std::cmp::max(total_active_balance, spec.effective_balance_increment);
        let sum_slashings = slashings.iter().copied().safe_sum()?;
        let adjusted_total_slashing_balance = std::cmp::min(
            sum_slashings.safe_mul(spec.proportional_slashing_multiplier_altair)?,
            total_active_balance,
        );

        let target_withdrawable_epoch =
            current_epoch.safe_add(spec.epochs_per_slashings_vector.safe_div(2)?)?;

        Ok(Self {
            adjusted_total_slashing_balance,
            target_withdrawable_epoch,
            total_active_balance,
        })
    }

    /// The proportional penalty for a validator with `effective_balance`.
    pub fn penalty(&self, effective_balance: u64, spec: &ChainSpec) -> Result<u64, Error> {
        let increment = spec.effective_balance_increment;
        let penalty_numerator = effective_balance
            .safe_div(increment)?
            .safe_mul(self.adjusted_total_slashing_balance)?;
        Ok(penalty_numerator
            .safe_div(self.total_active_balance)?
            .safe_mul(increment)?)
    }
}

/// Apply the proportional slashing penalty to validators whose withdrawable epoch is half a
/// slashings vector away.
///
/// `total_active_balance` must be the same current epoch total used for rewards, and is read as at
/// least one effective balance increment. Returns the
/// balances and the number of penalties applied. When no validator is due a penalty the balances
/// are handed back untouched.
#[instrument(skip_all)]
pub fn process_slashings(
    validators: &[Validator],
    slashings: &[u64],
    mut balances: Vec<u64>,
    total_active_balance: u64,
    current_epoch: Epoch,
    spec: &ChainSpec,
    partition: &ValidatorPartition,
) -> Result<(Vec<u64>, usize), Error> {
    if balances.len() != validators.len() {
        return Err(Error::BalancesLengthMismatch {
            validators: validators.len(),
            balances: balances.len(),
        });
    }

    let slashings_ctxt = SlashingsContext::new(slashings, total_active_balance, current_epoch, spec)?;

    // Most epochs have nobody to penalize.
    if !validators
        .iter()
        .any(|validator| is_due_slashing_penalty(validator, &slashings_ctxt))
    {
        return Ok((balances, 0));
    }

    let counts = partition.map_chunks_mut(&mut balances, |offset, chunk| {
        let chunk_validators = validators
            .get(offset..offset.safe_add(chunk.len())?)
            .ok_or(Error::BalancesLengthMismatch {
                validators: validators.len(),
                balances: offset.saturating_add(chunk.len()),
            })?;

        let mut applied = 0usize;
        for (balance, validator) in chunk.iter_mut().zip(chunk_validators) {
            if process_single_slashing(balance, validator, &slashings_ctxt, spec)? {
                applied.safe_add_assign(1)?;
            }
        }
        Ok::<_, Error>(applied)
    })?;

    Ok((balances, counts.into_iter().safe_sum()?))
}

fn is_due_slashing_penalty(validator: &Validator, slashings_ctxt: &SlashingsContext) -> bool {
    validator.is_slashed_with_withdrawable_epoch(slashings_ctxt.target_withdrawable_epoch)
}

fn process_single_slashing(
    balance: &mut u64,
    validator: &Validator,
    slashings_ctxt: &SlashingsContext,
    spec: &ChainSpec,
) -> Result<bool, Error> {
    if !is_due_slashing_penalty(validator, slashings_ctxt) {
        return Ok(false);
    }
    let penalty = slashings_ctxt.penalty(validator.effective_balance, spec)?;
    decrease_balance_directly(balance, penalty)?;
    Ok(true)
}
