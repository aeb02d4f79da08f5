//! The `Slot` and `Epoch` types are defined as new types over u64 to enforce type-safety between
//! the two types.
//!
//! Both types carry overflow-checked arithmetic returning `safe_arith::ArithError`, so that
//! epoch processing never wraps silently.
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u64);

macro_rules! impl_common {
    ($type: ident) => {
        impl $type {
            pub const fn new(value: u64) -> $type {
                $type(value)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub const fn max_value() -> $type {
                $type(u64::MAX)
            }

            pub fn safe_add(&self, other: u64) -> Result<$type, ArithError> {
                self.0.safe_add(other).map($type)
            }

            pub fn safe_sub(&self, other: u64) -> Result<$type, ArithError> {
                self.0.safe_sub(other).map($type)
            }

            pub fn safe_rem(&self, other: u64) -> Result<$type, ArithError> {
                self.0.safe_rem(other).map($type)
            }

            pub fn safe_div(&self, other: u64) -> Result<$type, ArithError> {
                self.0.safe_div(other).map($type)
            }

            pub fn saturating_sub(&self, other: u64) -> $type {
                $type(self.0.saturating_sub(other))
            }

            pub fn saturating_add(&self, other: u64) -> $type {
                $type(self.0.saturating_add(other))
            }
        }

        impl From<u64> for $type {
            fn from(value: u64) -> $type {
                $type(value)
            }
        }

        impl From<$type> for u64 {
            fn from(value: $type) -> u64 {
                value.0
            }
        }

        impl PartialEq<u64> for $type {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0.checked_div(slots_per_epoch).unwrap_or(0))
    }
}

impl Epoch {
    /// The first slot in the epoch.
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    /// The last slot in the epoch.
    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(
            self.0
                .saturating_mul(slots_per_epoch)
                .saturating_add(slots_per_epoch.saturating_sub(1)),
        )
    }
}
