use crate::{Epoch, Hash256};

/// Casper FFG checkpoint, used in attestations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}
