pub use metrics::*;
use std::sync::LazyLock;

/*
 * Epoch processing
 */
pub static PROCESS_EPOCH_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_process_epoch",
        "Time required for process_epoch",
    )
});
pub static VALIDATOR_SNAPSHOT_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_validator_snapshot_seconds",
        "Time required to build the per-validator precompute records",
    )
});
pub static PARTICIPATION_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_participation_seconds",
        "Time required to resolve participation flags and attesting balances",
    )
});
pub static INACTIVITY_UPDATES_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_inactivity_updates_seconds",
        "Time required to update inactivity scores",
    )
});
pub static REWARDS_AND_PENALTIES_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_rewards_and_penalties_seconds",
        "Time required to compute and apply attestation rewards and penalties",
    )
});
pub static SLASHINGS_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_slashings_seconds",
        "Time required to apply proportional slashing penalties",
    )
});
pub static EPOCH_ROTATION_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_epoch_rotation_seconds",
        "Time required to rotate participation flags and sync committees",
    )
});
pub static SLASHING_PENALTIES_APPLIED: LazyLock<Result<IntCounter>> = LazyLock::new(|| {
    try_create_int_counter(
        "beacon_state_processing_slashing_penalties_applied_total",
        "Count of proportional slashing penalties applied",
    )
});
pub static SYNC_COMMITTEE_ROTATIONS: LazyLock<Result<IntCounter>> = LazyLock::new(|| {
    try_create_int_counter(
        "beacon_state_processing_sync_committee_rotations_total",
        "Count of sync committee period transitions",
    )
});
pub static VALIDATORS_PROCESSED: LazyLock<Result<IntGauge>> = LazyLock::new(|| {
    try_create_int_gauge(
        "beacon_state_processing_epoch_validators",
        "Number of validators in the last processed epoch",
    )
});
