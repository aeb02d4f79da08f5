use crate::{
    ChainSpec, Checkpoint, Epoch, ParticipationFlags, PublicKeyBytes, Slot, SyncCommittee,
    Validator,
};
use safe_arith::{ArithError, SafeArith};
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

pub use sync_committee_cache::SyncCommitteeCache;

mod sync_committee_cache;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// A validator index was outside of the registry.
    UnknownValidator(usize),
    /// A per-validator list did not have one entry per validator.
    InconsistentLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    InvalidSyncCommitteeSize {
        expected: usize,
        found: usize,
    },
    /// A sync committee member is not present in the validator registry.
    SyncCommitteeMemberUnknown(PublicKeyBytes),
    SyncCommitteeCacheUninitialized {
        base_epoch: Epoch,
    },
    ArithError(ArithError),
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::ArithError(e)
    }
}

/// The fields of the beacon state that are read or written by epoch processing.
///
/// Epoch processing replaces the per-validator lists (`balances`, `inactivity_scores` and both
/// participation lists) wholesale through the `replace_*` methods, which check their length
/// against the validator registry and hand back the previous value.
///
/// Equality ignores the sync committee cache.
#[derive(Debug, Clone)]
pub struct BeaconState {
    pub slot: Slot,
    pub finalized_checkpoint: Checkpoint,

    // Registry
    pub validators: Vec<Validator>,
    pub balances: Vec<u64>,

    // Slashings
    pub slashings: Vec<u64>,

    // Participation
    pub previous_epoch_participation: Vec<ParticipationFlags>,
    pub current_epoch_participation: Vec<ParticipationFlags>,

    // Inactivity
    pub inactivity_scores: Vec<u64>,

    // Light-client sync committees
    pub current_sync_committee: Arc<SyncCommittee>,
    pub next_sync_committee: Arc<SyncCommittee>,

    // Caching (not in the spec)
    sync_committee_cache: Arc<SyncCommitteeCache>,
}

impl BeaconState {
    /// Create a new state with zeroed inactivity scores and participation for every validator.
    pub fn new(
        slot: Slot,
        finalized_checkpoint: Checkpoint,
        validators: Vec<Validator>,
        balances: Vec<u64>,
        current_sync_committee: Arc<SyncCommittee>,
        next_sync_committee: Arc<SyncCommittee>,
        spec: &ChainSpec,
    ) -> Result<Self, Error> {
        let num_validators = validators.len();
        check_length("balances", num_validators, balances.len())?;

        Ok(Self {
            slot,
            finalized_checkpoint,
            validators,
            balances,
            slashings: vec![0; spec.epochs_per_slashings_vector as usize],
            previous_epoch_participation: vec![ParticipationFlags::default(); num_validators],
            current_epoch_participation: vec![ParticipationFlags::default(); num_validators],
            inactivity_scores: vec![0; num_validators],
            current_sync_committee,
            next_sync_committee,
            sync_committee_cache: Arc::new(SyncCommitteeCache::default()),
        })
    }

    /// The epoch corresponding to `self.slot`.
    pub fn current_epoch(&self, spec: &ChainSpec) -> Epoch {
        self.slot.epoch(spec.slots_per_epoch)
    }

    /// The epoch prior to `self.current_epoch()`.
    ///
    /// If the current epoch is the genesis epoch, the genesis epoch is returned.
    pub fn previous_epoch(&self, spec: &ChainSpec) -> Epoch {
        let current_epoch = self.current_epoch(spec);
        if current_epoch > spec.genesis_epoch() {
            current_epoch.saturating_sub(1)
        } else {
            current_epoch
        }
    }

    /// The epoch following `self.current_epoch()`.
    pub fn next_epoch(&self, spec: &ChainSpec) -> Result<Epoch, Error> {
        Ok(self.current_epoch(spec).safe_add(1)?)
    }

    /// Returns `true` if the chain has not finalized for more than
    /// `MIN_EPOCHS_TO_INACTIVITY_PENALTY` epochs before `previous_epoch`.
    pub fn is_in_inactivity_leak(
        &self,
        previous_epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<bool, ArithError> {
        is_in_inactivity_leak(previous_epoch, self.finalized_checkpoint.epoch, spec)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn balances(&self) -> &[u64] {
        &self.balances
    }

    pub fn inactivity_scores(&self) -> &[u64] {
        &self.inactivity_scores
    }

    pub fn get_all_slashings(&self) -> &[u64] {
        &self.slashings
    }

    pub fn get_validator(&self, index: usize) -> Result<&Validator, Error> {
        self.validators
            .get(index)
            .ok_or(Error::UnknownValidator(index))
    }

    pub fn get_balance(&self, index: usize) -> Result<u64, Error> {
        self.balances
            .get(index)
            .copied()
            .ok_or(Error::UnknownValidator(index))
    }

    pub fn get_balance_mut(&mut self, index: usize) -> Result<&mut u64, Error> {
        self.balances
            .get_mut(index)
            .ok_or(Error::UnknownValidator(index))
    }

    /// Replace the balance list, returning the previous one.
    pub fn replace_balances(&mut self, balances: Vec<u64>) -> Result<Vec<u64>, Error> {
        check_length("balances", self.validators.len(), balances.len())?;
        Ok(mem::replace(&mut self.balances, balances))
    }

    /// Replace the inactivity score list, returning the previous one.
    pub fn replace_inactivity_scores(&mut self, scores: Vec<u64>) -> Result<Vec<u64>, Error> {
        check_length("inactivity_scores", self.validators.len(), scores.len())?;
        Ok(mem::replace(&mut self.inactivity_scores, scores))
    }

    /// Replace both participation lists, returning the previous `(previous, current)` pair.
    pub fn replace_epoch_participation(
        &mut self,
        previous: Vec<ParticipationFlags>,
        current: Vec<ParticipationFlags>,
    ) -> Result<(Vec<ParticipationFlags>, Vec<ParticipationFlags>), Error> {
        let num_validators = self.validators.len();
        check_length("previous_epoch_participation", num_validators, previous.len())?;
        check_length("current_epoch_participation", num_validators, current.len())?;
        Ok((
            mem::replace(&mut self.previous_epoch_participation, previous),
            mem::replace(&mut self.current_epoch_participation, current),
        ))
    }

    /// Replace both sync committees, returning the previous `(current, next)` pair.
    ///
    /// The sync committee cache is dropped and must be rebuilt with
    /// `build_sync_committee_cache`.
    pub fn replace_sync_committees(
        &mut self,
        current: Arc<SyncCommittee>,
        next: Arc<SyncCommittee>,
        spec: &ChainSpec,
    ) -> Result<(Arc<SyncCommittee>, Arc<SyncCommittee>), Error> {
        let expected = spec.sync_committee_size as usize;
        for committee in [&current, &next] {
            if committee.len() != expected {
                return Err(Error::InvalidSyncCommitteeSize {
                    expected,
                    found: committee.len(),
                });
            }
        }
        self.sync_committee_cache = Arc::new(SyncCommitteeCache::default());
        Ok((
            mem::replace(&mut self.current_sync_committee, current),
            mem::replace(&mut self.next_sync_committee, next),
        ))
    }

    /// The first epoch of the sync committee period containing `epoch`.
    pub fn sync_committee_base_epoch(&self, epoch: Epoch, spec: &ChainSpec) -> Result<Epoch, Error> {
        let offset = epoch.safe_rem(spec.epochs_per_sync_committee_period)?;
        Ok(epoch.safe_sub(offset.as_u64())?)
    }

    /// Resolve every member of the current sync committee to its validator index.
    pub fn compute_sync_committee_indices(&self) -> Result<Vec<usize>, Error> {
        let index_by_pubkey = self
            .validators
            .iter()
            .enumerate()
            .map(|(index, validator)| (validator.pubkey, index))
            .collect::<HashMap<_, _>>();

        self.current_sync_committee
            .pubkeys
            .iter()
            .map(|pubkey| {
                index_by_pubkey
                    .get(pubkey)
                    .copied()
                    .ok_or(Error::SyncCommitteeMemberUnknown(*pubkey))
            })
            .collect()
    }

    /// Build the sync committee cache for the current period, if it isn't already built.
    pub fn build_sync_committee_cache(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        self.build_sync_committee_cache_at(self.current_epoch(spec), spec)
    }

    /// Build the sync committee cache for the period containing `epoch`, resolving the members
    /// of the current sync committee.
    ///
    /// At a period boundary the promoted committee serves the period that starts at the next
    /// epoch, so the cache must be keyed by that period.
    pub fn build_sync_committee_cache_at(
        &mut self,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        let base_epoch = self.sync_committee_base_epoch(epoch, spec)?;
        if !self.sync_committee_cache.is_initialized_for(base_epoch) {
            self.sync_committee_cache = Arc::new(SyncCommitteeCache::new(self, base_epoch)?);
        }
        Ok(())
    }

    pub fn sync_committee_cache(&self) -> &Arc<SyncCommitteeCache> {
        &self.sync_committee_cache
    }

    /// Put back a cache previously taken with `sync_committee_cache`.
    pub fn set_sync_committee_cache(&mut self, cache: Arc<SyncCommitteeCache>) {
        self.sync_committee_cache = cache;
    }

    /// Validator indices of the current sync committee, in committee order.
    ///
    /// Requires the sync committee cache to be built for the current period.
    pub fn get_sync_committee_indices(&self, spec: &ChainSpec) -> Result<&[usize], Error> {
        let base_epoch = self.sync_committee_base_epoch(self.current_epoch(spec), spec)?;
        self.sync_committee_cache
            .get_sync_committee_indices(base_epoch)
            .ok_or(Error::SyncCommitteeCacheUninitialized { base_epoch })
    }
}

impl PartialEq for BeaconState {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
            && self.finalized_checkpoint == other.finalized_checkpoint
            && self.validators == other.validators
            && self.balances == other.balances
            && self.slashings == other.slashings
            && self.previous_epoch_participation == other.previous_epoch_participation
            && self.current_epoch_participation == other.current_epoch_participation
            && self.inactivity_scores == other.inactivity_scores
            && self.current_sync_committee == other.current_sync_committee
            && self.next_sync_committee == other.next_sync_committee
    }
}

/// Returns `true` if `previous_epoch` is more than `MIN_EPOCHS_TO_INACTIVITY_PENALTY` epochs past
/// the finalized epoch.
pub fn is_in_inactivity_leak(
    previous_epoch: Epoch,
    finalized_epoch: Epoch,
    spec: &ChainSpec,
) -> Result<bool, ArithError> {
    Ok(previous_epoch
        .as_u64()
        .safe_sub(finalized_epoch.as_u64())?
        > spec.min_epochs_to_inactivity_penalty)
}

fn check_length(field: &'static str, expected: usize, found: usize) -> Result<(), Error> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::InconsistentLength {
            field,
            expected,
            found,
        })
    }
}
