use crate::{Epoch, PublicKeyBytes};

/// Information about a `BeaconChain` validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Returns `true` if the validator is able to withdraw at some epoch.
    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        epoch >= self.withdrawable_epoch
    }

    /// Returns `true` if the validator is slashed and its correlation penalty falls due at
    /// `epoch_to_withdraw`.
    pub fn is_slashed_with_withdrawable_epoch(&self, epoch_to_withdraw: Epoch) -> bool {
        self.slashed && self.withdrawable_epoch == epoch_to_withdraw
    }
}

impl Default for Validator {
    /// Yields a "default" `Validator`. Primarily used for testing.
    fn default() -> Self {
        Self {
            pubkey: PublicKeyBytes::empty(),
            effective_balance: u64::MAX,
            slashed: false,
            activation_eligibility_epoch: Epoch::max_value(),
            activation_epoch: Epoch::max_value(),
            exit_epoch: Epoch::max_value(),
            withdrawable_epoch: Epoch::max_value(),
        }
    }
}
