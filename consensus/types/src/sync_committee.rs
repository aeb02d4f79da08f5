use crate::PublicKeyBytes;

/// An ordered committee of validators, identified by public key.
///
/// Members are selected by an effective-balance weighted sampling that lives outside of epoch
/// processing. The same validator may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncCommittee {
    pub pubkeys: Vec<PublicKeyBytes>,
}

impl SyncCommittee {
    pub fn new(pubkeys: Vec<PublicKeyBytes>) -> Self {
        Self { pubkeys }
    }

    /// Create a committee of `size` empty keys, used as a placeholder before selection.
    pub fn temporary(size: usize) -> Self {
        Self {
            pubkeys: vec![PublicKeyBytes::empty(); size],
        }
    }

    pub fn len(&self) -> usize {
        self.pubkeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pubkeys.is_empty()
    }
}
