use types::ParticipationFlags;

/// Rotate current epoch participation into the previous epoch.
///
/// Returns the new `(previous, current)` participation lists, the latter zeroed and sized to
/// `num_validators`.
pub fn process_participation_flag_updates(
    current_epoch_participation: &[ParticipationFlags],
    num_validators: usize,
) -> (Vec<ParticipationFlags>, Vec<ParticipationFlags>) {
    (
        current_epoch_participation.to_vec(),
        vec![ParticipationFlags::default(); num_validators],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_idempotent_without_attestations() {
        let current = vec![ParticipationFlags::new(0b111), ParticipationFlags::new(0b010)];

        let (previous, current) = process_participation_flag_updates(&current, 2);
        assert_eq!(
            previous,
            vec![ParticipationFlags::new(0b111), ParticipationFlags::new(0b010)]
        );
        assert_eq!(current, vec![ParticipationFlags::default(); 2]);

        let (previous, current) = process_participation_flag_updates(&current, 2);
        assert_eq!(previous, vec![ParticipationFlags::default(); 2]);
        assert_eq!(current, vec![ParticipationFlags::default(); 2]);
    }
}
