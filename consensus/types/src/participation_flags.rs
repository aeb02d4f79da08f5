use crate::ChainSpec;
use crate::consts::altair::{
    NUM_FLAG_INDICES, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
};
use safe_arith::ArithError;

const TIMELY_SOURCE_MASK: u8 = 0b0000_0001;
const TIMELY_TARGET_MASK: u8 = 0b0000_0010;
const TIMELY_HEAD_MASK: u8 = 0b0000_0100;

/// One of the three attestation participation flags introduced in Altair.
///
/// Each variant owns a fixed bit position in `ParticipationFlags`, matching the protocol's
/// `TIMELY_*_FLAG_INDEX` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipationFlag {
    TimelySource,
    TimelyTarget,
    TimelyHead,
}

impl ParticipationFlag {
    /// All flags, ordered by flag index.
    pub const ALL: [ParticipationFlag; NUM_FLAG_INDICES] = [
        ParticipationFlag::TimelySource,
        ParticipationFlag::TimelyTarget,
        ParticipationFlag::TimelyHead,
    ];

    pub const fn index(self) -> usize {
        match self {
            ParticipationFlag::TimelySource => TIMELY_SOURCE_FLAG_INDEX,
            ParticipationFlag::TimelyTarget => TIMELY_TARGET_FLAG_INDEX,
            ParticipationFlag::TimelyHead => TIMELY_HEAD_FLAG_INDEX,
        }
    }

    pub const fn mask(self) -> u8 {
        match self {
            ParticipationFlag::TimelySource => TIMELY_SOURCE_MASK,
            ParticipationFlag::TimelyTarget => TIMELY_TARGET_MASK,
            ParticipationFlag::TimelyHead => TIMELY_HEAD_MASK,
        }
    }

    pub fn from_index(flag_index: usize) -> Option<Self> {
        Self::ALL.get(flag_index).copied()
    }

    /// The reward weight of this flag under `spec`.
    pub fn weight(self, spec: &ChainSpec) -> u64 {
        match self {
            ParticipationFlag::TimelySource => spec.timely_source_weight,
            ParticipationFlag::TimelyTarget => spec.timely_target_weight,
            ParticipationFlag::TimelyHead => spec.timely_head_weight,
        }
    }

    /// Missing a head vote is never penalized, only unrewarded.
    pub const fn is_penalized_when_missed(self) -> bool {
        !matches!(self, ParticipationFlag::TimelyHead)
    }
}

/// The per-validator participation byte stored in `previous_epoch_participation` and
/// `current_epoch_participation`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipationFlags {
    bits: u8,
}

impl ParticipationFlags {
    pub const fn new(bits: u8) -> Self {
        Self { bits }
    }

    pub fn from_flags(flags: &[ParticipationFlag]) -> Self {
        let mut participation = Self::default();
        for flag in flags {
            participation.add(*flag);
        }
        participation
    }

    pub fn add(&mut self, flag: ParticipationFlag) {
        self.bits |= flag.mask();
    }

    pub const fn has(&self, flag: ParticipationFlag) -> bool {
        self.bits & flag.mask() != 0
    }

    /// Index-based lookup, erroring for indices outside the defined flags.
    pub fn has_flag(&self, flag_index: usize) -> Result<bool, ArithError> {
        ParticipationFlag::from_index(flag_index)
            .map(|flag| self.has(flag))
            .ok_or(ArithError::Overflow)
    }

    pub const fn into_u8(self) -> u8 {
        self.bits
    }
}

impl From<u8> for ParticipationFlags {
    fn from(bits: u8) -> Self {
        Self::new(bits)
    }
}
