//! Deterministic state construction for tests and benchmarks.
use crate::{
    BeaconState, ChainSpec, Checkpoint, Epoch, PUBLIC_KEY_BYTES_LEN, PublicKeyBytes, Slot,
    SyncCommittee, Validator,
};
use std::sync::Arc;

/// A unique, deterministic public key for the validator at `index`.
pub fn deterministic_pubkey(index: usize) -> PublicKeyBytes {
    let mut bytes = [0; PUBLIC_KEY_BYTES_LEN];
    let id = (index as u64).saturating_add(1).to_le_bytes();
    for (byte, id_byte) in bytes.iter_mut().zip(id.iter()) {
        *byte = *id_byte;
    }
    PublicKeyBytes::from_bytes(bytes)
}

/// A sync committee filled by cycling through the first `num_validators` deterministic keys,
/// starting at `offset`.
pub fn deterministic_sync_committee(
    num_validators: usize,
    offset: usize,
    spec: &ChainSpec,
) -> SyncCommittee {
    let size = spec.sync_committee_size as usize;
    if num_validators == 0 {
        return SyncCommittee::temporary(size);
    }
    SyncCommittee::new(
        (0..size)
            .map(|i| deterministic_pubkey(i.saturating_add(offset) % num_validators))
            .collect(),
    )
}

/// Builds a `BeaconState` in which every validator is active from genesis, has never been
/// slashed and holds a balance equal to its effective balance.
pub struct TestingBeaconStateBuilder {
    spec: ChainSpec,
    num_validators: usize,
    slot: Slot,
    effective_balance: u64,
    finalized_epoch: Epoch,
}

impl TestingBeaconStateBuilder {
    pub fn new(num_validators: usize, spec: &ChainSpec) -> Self {
        Self {
            spec: spec.clone(),
            num_validators,
            slot: spec.genesis_slot,
            effective_balance: spec.effective_balance_increment.saturating_mul(32),
            finalized_epoch: spec.genesis_epoch(),
        }
    }

    /// Place the state at the last slot of `epoch`, where epoch processing happens.
    pub fn epoch(mut self, epoch: Epoch) -> Self {
        self.slot = epoch.end_slot(self.spec.slots_per_epoch);
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    pub fn effective_balance(mut self, effective_balance: u64) -> Self {
        self.effective_balance = effective_balance;
        self
    }

    pub fn finalized_epoch(mut self, epoch: Epoch) -> Self {
        self.finalized_epoch = epoch;
        self
    }

    pub fn build(self) -> BeaconState {
        let spec = &self.spec;
        let validators = (0..self.num_validators)
            .map(|index| Validator {
                pubkey: deterministic_pubkey(index),
                effective_balance: self.effective_balance,
                slashed: false,
                activation_eligibility_epoch: spec.genesis_epoch(),
                activation_epoch: spec.genesis_epoch(),
                exit_epoch: spec.far_future_epoch,
                withdrawable_epoch: spec.far_future_epoch,
            })
            .collect::<Vec<_>>();
        let balances = vec![self.effective_balance; self.num_validators];
        let current_sync_committee = deterministic_sync_committee(self.num_validators, 0, spec);
        let next_sync_committee = deterministic_sync_committee(self.num_validators, 1, spec);

        BeaconState::new(
            self.slot,
            Checkpoint {
                epoch: self.finalized_epoch,
                root: [0; 32],
            },
            validators,
            balances,
            Arc::new(current_sync_committee),
            Arc::new(next_sync_committee),
            spec,
        )
        .unwrap_or_else(|e| panic!("balances and validators are built with equal lengths: {e:?}"))
    }
}
