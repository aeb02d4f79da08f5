use super::{Error, StateContext, ValidatorPrecompute, partition::ValidatorPartition};
use safe_arith::SafeArith;
use std::cmp::min;
use tracing::instrument;
use types::ChainSpec;

/// Update the inactivity score of every eligible validator.
///
/// Returns the updated records together with the full list of scores to write back to the state,
/// or `None` at the genesis epoch where nothing changes.
#[instrument(skip_all)]
pub fn process_inactivity_updates(
    mut precompute: Vec<ValidatorPrecompute>,
    state_ctxt: &StateContext,
    spec: &ChainSpec,
    partition: &ValidatorPartition,
) -> Result<(Vec<ValidatorPrecompute>, Option<Vec<u64>>), Error> {
    // Score updates based on previous epoch participation, skip genesis epoch
    if state_ctxt.is_genesis_epoch {
        return Ok((precompute, None));
    }

    partition.map_chunks_mut(&mut precompute, |_, chunk| {
        chunk
            .iter_mut()
            .try_for_each(|validator| process_single_inactivity_update(validator, state_ctxt, spec))
    })?;

    let inactivity_scores = precompute
        .iter()
        .map(|validator| validator.inactivity_score)
        .collect();

    Ok((precompute, Some(inactivity_scores)))
}

fn process_single_inactivity_update(
    validator: &mut ValidatorPrecompute,
    state_ctxt: &StateContext,
    spec: &ChainSpec,
) -> Result<(), Error> {
    if !validator.is_eligible() {
        return Ok(());
    }

    let inactivity_score = &mut validator.inactivity_score;

    // Increase inactivity score of inactive validators
    if validator.is_previous_epoch_target_attester && !validator.is_slashed {
        inactivity_score.safe_sub_assign(min(1, *inactivity_score))?;
    } else {
        inactivity_score.safe_add_assign(spec.inactivity_score_bias)?;
    }

    // Decrease the score of all validators for forgiveness when not during a leak
    if !state_ctxt.is_in_inactivity_leak {
        let deduction = min(spec.inactivity_score_recovery_rate, *inactivity_score);
        inactivity_score.safe_sub_assign(deduction)?;
    }

    Ok(())
}
