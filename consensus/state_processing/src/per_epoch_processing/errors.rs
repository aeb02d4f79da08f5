use types::BeaconStateError;

#[derive(Debug, PartialEq, Clone)]
pub enum EpochProcessingError {
    /// The state holds fewer inactivity scores than validators.
    InactivityScoresTooShort {
        validators: usize,
        inactivity_scores: usize,
    },
    /// The precompute records, validator registry and balances disagree in length.
    PrecomputeLengthMismatch {
        precompute: usize,
        validators: usize,
        balances: usize,
    },
    ParticipationLengthMismatch {
        precompute: usize,
        participation: usize,
    },
    BalancesLengthMismatch {
        validators: usize,
        balances: usize,
    },
    InvalidFlagIndex(usize),
    /// The selector returned a committee of the wrong size.
    InvalidSyncCommitteeSize {
        expected: usize,
        found: usize,
    },
    /// The sync committee selector failed.
    SyncCommitteeSelection(BeaconStateError),
    BeaconStateError(BeaconStateError),
    ArithError(safe_arith::ArithError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> EpochProcessingError {
        EpochProcessingError::BeaconStateError(e)
    }
}

impl From<safe_arith::ArithError> for EpochProcessingError {
    fn from(e: safe_arith::ArithError) -> EpochProcessingError {
        EpochProcessingError::ArithError(e)
    }
}
