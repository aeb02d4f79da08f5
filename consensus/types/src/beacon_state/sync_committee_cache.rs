use crate::{BeaconState, BeaconStateError, Epoch};

/// Cache the sync committee indices, as an accelerator for `get_sync_committee_indices`.
///
/// The cache is keyed by the first epoch of the sync committee period it was built for, so a
/// cache built in one period is never served in the next.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct SyncCommitteeCache {
    cache: Option<Cache>,
}

#[derive(Debug, PartialEq, Clone)]
struct Cache {
    base_epoch: Epoch,
    sync_committee_indices: Vec<usize>,
}

impl SyncCommitteeCache {
    /// Resolve the current sync committee of `state` for the period starting at `base_epoch`.
    pub fn new(state: &BeaconState, base_epoch: Epoch) -> Result<Self, BeaconStateError> {
        let sync_committee_indices = state.compute_sync_committee_indices()?;
        Ok(SyncCommitteeCache {
            cache: Some(Cache {
                base_epoch,
                sync_committee_indices,
            }),
        })
    }

    pub fn is_initialized_for(&self, base_epoch: Epoch) -> bool {
        self.get_cache(base_epoch).is_some()
    }

    fn get_cache(&self, base_epoch: Epoch) -> Option<&Cache> {
        self.cache
            .as_ref()
            .filter(|cache| cache.base_epoch == base_epoch)
    }

    pub fn get_sync_committee_indices(&self, base_epoch: Epoch) -> Option<&[usize]> {
        self.get_cache(base_epoch)
            .map(|cache| cache.sync_committee_indices.as_slice())
    }
}
