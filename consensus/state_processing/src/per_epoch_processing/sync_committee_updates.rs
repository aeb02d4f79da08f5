use super::Error;
use std::sync::Arc;
use tracing::debug;
use types::{BeaconState, BeaconStateError, ChainSpec, Epoch, SyncCommittee};

/// Selects the members of the next sync committee.
///
/// Selection is performed against the state after the current committee has been replaced by the
/// next one, as at the sync committee period boundary.
pub trait SyncCommitteeSelector {
    fn get_next_sync_committee(
        &self,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<SyncCommittee, BeaconStateError>;
}

impl<F> SyncCommitteeSelector for F
where
    F: Fn(&BeaconState, &ChainSpec) -> Result<SyncCommittee, BeaconStateError>,
{
    fn get_next_sync_committee(
        &self,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<SyncCommittee, BeaconStateError> {
        self(state, spec)
    }
}

/// Promote the next sync committee and select a new one at the end of a sync committee period.
///
/// Returns `true` if the committees were rotated. Nothing happens at the genesis epoch. On error
/// both committees and the sync committee cache are restored.
pub fn process_sync_committee_updates<S: SyncCommitteeSelector + ?Sized>(
    state: &mut BeaconState,
    spec: &ChainSpec,
    selector: &S,
) -> Result<bool, Error> {
    if state.current_epoch(spec) == spec.genesis_epoch() {
        return Ok(false);
    }

    let next_epoch = state.next_epoch(spec)?;
    if next_epoch.safe_rem(spec.epochs_per_sync_committee_period)? != 0 {
        return Ok(false);
    }

    let previous_current = state.current_sync_committee.clone();
    let previous_next = state.next_sync_committee.clone();
    let previous_cache = state.sync_committee_cache().clone();

    if let Err(e) = rotate_sync_committees(state, next_epoch, spec, selector) {
        state.current_sync_committee = previous_current;
        state.next_sync_committee = previous_next;
        state.set_sync_committee_cache(previous_cache);
        return Err(e);
    }

    debug!(%next_epoch, "Rotated sync committees");
    Ok(true)
}

fn rotate_sync_committees<S: SyncCommitteeSelector + ?Sized>(
    state: &mut BeaconState,
    next_epoch: Epoch,
    spec: &ChainSpec,
    selector: &S,
) -> Result<(), Error> {
    let promoted = state.next_sync_committee.clone();
    state.current_sync_committee = promoted.clone();

    let next_sync_committee = selector
        .get_next_sync_committee(state, spec)
        .map_err(Error::SyncCommitteeSelection)?;

    let expected = spec.sync_committee_size as usize;
    if next_sync_committee.len() != expected {
        return Err(Error::InvalidSyncCommitteeSize {
            expected,
            found: next_sync_committee.len(),
        });
    }

    state.replace_sync_committees(promoted, Arc::new(next_sync_committee), spec)?;
    // The promoted committee serves the period starting at `next_epoch`.
    state.build_sync_committee_cache_at(next_epoch, spec)?;
    Ok(())
}
