use super::{BalanceAccumulator, Error, ValidatorPrecompute, partition::ValidatorPartition};
use safe_arith::SafeArith;
use tracing::instrument;
use types::{ParticipationFlag, ParticipationFlags};

/// Resolve the participation flags of every validator and total up the attesting balances.
///
/// The active balance totals of `accumulator` are kept; the attesting totals are recomputed from
/// scratch. Slashed validators are counted here and only excluded when computing rewards.
#[instrument(skip_all)]
pub fn process_epoch_participation(
    current_epoch_participation: &[ParticipationFlags],
    previous_epoch_participation: &[ParticipationFlags],
    mut precompute: Vec<ValidatorPrecompute>,
    accumulator: BalanceAccumulator,
    partition: &ValidatorPartition,
) -> Result<(Vec<ValidatorPrecompute>, BalanceAccumulator), Error> {
    for participation in [current_epoch_participation, previous_epoch_participation] {
        if participation.len() != precompute.len() {
            return Err(Error::ParticipationLengthMismatch {
                precompute: precompute.len(),
                participation: participation.len(),
            });
        }
    }

    let partials = partition.map_chunks_mut(&mut precompute, |offset, chunk| {
        let end = offset.safe_add(chunk.len())?;
        let mismatch = || Error::ParticipationLengthMismatch {
            precompute: end,
            participation: current_epoch_participation.len(),
        };
        let current = current_epoch_participation
            .get(offset..end)
            .ok_or_else(mismatch)?;
        let previous = previous_epoch_participation
            .get(offset..end)
            .ok_or_else(mismatch)?;

        let mut attested = BalanceAccumulator::default();
        for ((validator, current), previous) in chunk.iter_mut().zip(current).zip(previous) {
            resolve_participation(validator, *current, *previous);
            add_attesting_balance(&mut attested, validator)?;
        }
        Ok::<_, Error>(attested)
    })?;

    let attested = partials
        .into_iter()
        .try_fold(BalanceAccumulator::default(), BalanceAccumulator::combine)?;

    Ok((
        precompute,
        BalanceAccumulator {
            active_current_epoch: accumulator.active_current_epoch,
            active_previous_epoch: accumulator.active_previous_epoch,
            ..attested
        },
    ))
}

fn resolve_participation(
    validator: &mut ValidatorPrecompute,
    current: ParticipationFlags,
    previous: ParticipationFlags,
) {
    validator.is_current_epoch_target_attester =
        validator.is_active_current_epoch && current.has(ParticipationFlag::TimelyTarget);

    let active = validator.is_active_previous_epoch;
    validator.is_previous_epoch_attester = active && previous.has(ParticipationFlag::TimelySource);
    validator.is_previous_epoch_target_attester =
        active && previous.has(ParticipationFlag::TimelyTarget);
    validator.is_previous_epoch_head_attester =
        active && previous.has(ParticipationFlag::TimelyHead);
}

fn add_attesting_balance(
    attested: &mut BalanceAccumulator,
    validator: &ValidatorPrecompute,
) -> Result<(), Error> {
    let effective_balance = validator.current_epoch_effective_balance;
    if validator.is_current_epoch_target_attester {
        attested
            .current_epoch_target_attested
            .safe_add_assign(effective_balance)?;
    }
    if validator.is_previous_epoch_attester {
        attested
            .previous_epoch_attested
            .safe_add_assign(effective_balance)?;
    }
    if validator.is_previous_epoch_target_attester {
        attested
            .previous_epoch_target_attested
            .safe_add_assign(effective_balance)?;
    }
    if validator.is_previous_epoch_head_attester {
        attested
            .previous_epoch_head_attested
            .safe_add_assign(effective_balance)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParticipationFlag::*;

    fn active_record(effective_balance: u64) -> ValidatorPrecompute {
        ValidatorPrecompute {
            current_epoch_effective_balance: effective_balance,
            is_active_current_epoch: true,
            is_active_previous_epoch: true,
            ..ValidatorPrecompute::default()
        }
    }

    #[test]
    fn flags_are_gated_on_activity() {
        let mut inactive_previous = active_record(5);
        inactive_previous.is_active_previous_epoch = false;
        let mut slashed = active_record(7);
        slashed.is_slashed = true;

        let precompute = vec![active_record(3), inactive_previous, slashed];
        let all = ParticipationFlags::from_flags(&ParticipationFlag::ALL);
        let accumulator = BalanceAccumulator {
            active_current_epoch: 15,
            active_previous_epoch: 10,
            ..BalanceAccumulator::default()
        };

        let (precompute, accumulator) = process_epoch_participation(
            &[all, all, ParticipationFlags::default()],
            &[
                ParticipationFlags::from_flags(&[TimelySource, TimelyHead]),
                all,
                all,
            ],
            precompute,
            accumulator,
            &ValidatorPartition::default(),
        )
        .unwrap();

        assert!(precompute[0].is_current_epoch_target_attester);
        assert!(precompute[0].is_previous_epoch_attester);
        assert!(!precompute[0].is_previous_epoch_target_attester);
        assert!(precompute[0].is_previous_epoch_head_attester);

        assert!(precompute[1].is_current_epoch_target_attester);
        assert!(!precompute[1].is_previous_epoch_attester);

        // Slashed validators still count towards the attesting balances.
        assert!(!precompute[2].is_current_epoch_target_attester);
        assert!(precompute[2].is_previous_epoch_target_attester);

        assert_eq!(
            accumulator,
            BalanceAccumulator {
                active_current_epoch: 15,
                active_previous_epoch: 10,
                current_epoch_target_attested: 8,
                previous_epoch_attested: 10,
                previous_epoch_target_attested: 7,
                previous_epoch_head_attested: 10,
            }
        );
    }

    #[test]
    fn attesting_balances_are_recomputed() {
        let stale = BalanceAccumulator {
            active_current_epoch: 1,
            active_previous_epoch: 1,
            previous_epoch_attested: 1_000,
            ..BalanceAccumulator::default()
        };
        let (_, accumulator) = process_epoch_participation(
            &[ParticipationFlags::default()],
            &[ParticipationFlags::default()],
            vec![active_record(1)],
            stale,
            &ValidatorPartition::default(),
        )
        .unwrap();
        assert_eq!(accumulator.previous_epoch_attested, 0);
        assert_eq!(accumulator.active_current_epoch, 1);
    }

    #[test]
    fn length_mismatch() {
        let result = process_epoch_participation(
            &[ParticipationFlags::default(); 2],
            &[ParticipationFlags::default(); 1],
            vec![active_record(1); 2],
            BalanceAccumulator::default(),
            &ValidatorPartition::default(),
        );
        assert_eq!(
            result,
            Err(Error::ParticipationLengthMismatch {
                precompute: 2,
                participation: 1,
            })
        );
    }

    #[test]
    fn partitioned_matches_sequential() {
        let precompute = (0..301)
            .map(|i| {
                let mut record = active_record(i);
                record.is_active_previous_epoch = i % 7 != 0;
                record
            })
            .collect::<Vec<_>>();
        let current = (0..301u64)
            .map(|i| ParticipationFlags::new(i as u8))
            .collect::<Vec<_>>();
        let previous = (0..301u64)
            .map(|i| ParticipationFlags::new((i * 3) as u8))
            .collect::<Vec<_>>();

        let run = |partition: ValidatorPartition| {
            process_epoch_participation(
                &current,
                &previous,
                precompute.clone(),
                BalanceAccumulator::default(),
                &partition,
            )
            .unwrap()
        };
        assert_eq!(
            run(ValidatorPartition::sequential()),
            run(ValidatorPartition::new(16, 0))
        );
    }
}
