//! Ethereum consensus types used by epoch processing.
pub mod beacon_state;
pub mod chain_spec;
pub mod checkpoint;
pub mod consts;
pub mod participation_flags;
pub mod public_key_bytes;
pub mod slot_epoch;
pub mod sync_committee;
pub mod test_utils;
pub mod validator;

pub use crate::beacon_state::{
    BeaconState, Error as BeaconStateError, SyncCommitteeCache, is_in_inactivity_leak,
};
pub use crate::chain_spec::{ChainSpec, Config, ConfigError};
pub use crate::checkpoint::Checkpoint;
pub use crate::participation_flags::{ParticipationFlag, ParticipationFlags};
pub use crate::public_key_bytes::{PUBLIC_KEY_BYTES_LEN, PublicKeyBytes};
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::sync_committee::SyncCommittee;
pub use crate::validator::Validator;

pub type Hash256 = [u8; 32];

pub use safe_arith::ArithError;
