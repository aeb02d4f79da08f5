use super::{BalanceAccumulator, ValidatorPrecompute};
use types::Epoch;

/// Provides a summary of validator participation and balance changes during the epoch.
#[derive(Debug, PartialEq, Clone)]
pub struct EpochProcessingSummary {
    /// The epoch that was processed.
    pub epoch: Epoch,
    pub total_balances: BalanceAccumulator,
    pub validators: Vec<ValidatorPrecompute>,
    pub is_in_inactivity_leak: bool,
    pub slashing_penalties_applied: usize,
    pub sync_committee_rotated: bool,
}

impl EpochProcessingSummary {
    /// Returns the sum of the effective balance of all validators in the current epoch.
    pub fn current_epoch_total_active_balance(&self) -> u64 {
        self.total_balances.active_current_epoch
    }

    /// Returns the sum of the effective balance of all validators in the current epoch who
    /// included an attestation that matched the target.
    pub fn current_epoch_target_attesting_balance(&self) -> u64 {
        self.total_balances.current_epoch_target_attested
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch.
    pub fn previous_epoch_total_active_balance(&self) -> u64 {
        self.total_balances.active_previous_epoch
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch who
    /// included a timely attestation with the correct source.
    pub fn previous_epoch_source_attesting_balance(&self) -> u64 {
        self.total_balances.previous_epoch_attested
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch who
    /// included an attestation that matched the target.
    pub fn previous_epoch_target_attesting_balance(&self) -> u64 {
        self.total_balances.previous_epoch_target_attested
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch who
    /// included a timely attestation that matched the head.
    pub fn previous_epoch_head_attesting_balance(&self) -> u64 {
        self.total_balances.previous_epoch_head_attested
    }

    /// Returns `true` if `val_index` was included in the active validator indices in the current
    /// epoch *and* the validator is not slashed.
    ///
    /// ## Notes
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_active_unslashed_in_current_epoch(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .is_some_and(|v| v.is_active_current_epoch && !v.is_slashed)
    }

    /// Returns `true` if `val_index` was included in the active validator indices in the previous
    /// epoch.
    ///
    /// ## Notes
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_active_in_previous_epoch(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .is_some_and(|v| v.is_active_previous_epoch)
    }

    /// Returns `true` if `val_index` had a target-matching attestation included on chain in the
    /// current epoch.
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_current_epoch_target_attester(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .is_some_and(|v| v.is_current_epoch_target_attester)
    }

    /// Returns `true` if `val_index` had a timely source-matching attestation included on chain
    /// in the previous epoch.
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_previous_epoch_source_attester(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .is_some_and(|v| v.is_previous_epoch_attester)
    }

    /// Returns `true` if `val_index` had a target-matching attestation included on chain in the
    /// previous epoch.
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_previous_epoch_target_attester(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .is_some_and(|v| v.is_previous_epoch_target_attester)
    }

    /// Returns `true` if `val_index` had a head-matching attestation included on chain in the
    /// previous epoch.
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_previous_epoch_head_attester(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .is_some_and(|v| v.is_previous_epoch_head_attester)
    }

    /// The inactivity score of `val_index` after this epoch's update.
    pub fn inactivity_score(&self, val_index: usize) -> Option<u64> {
        self.validators.get(val_index).map(|v| v.inactivity_score)
    }

    /// The `(before, after)` balance of `val_index` around the application of attestation
    /// rewards and penalties.
    pub fn balance_change(&self, val_index: usize) -> Option<(u64, u64)> {
        self.validators.get(val_index).map(|v| {
            (
                v.before_epoch_transition_balance,
                v.after_epoch_transition_balance,
            )
        })
    }
}
