use crate::consts::altair::{
    TIMELY_HEAD_WEIGHT, TIMELY_SOURCE_WEIGHT, TIMELY_TARGET_WEIGHT, WEIGHT_DENOMINATOR,
};
use crate::{Epoch, Slot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Name of the mainnet preset, as written in `PRESET_BASE`.
pub const MAINNET_PRESET_BASE: &str = "mainnet";
/// Name of the minimal preset, as written in `PRESET_BASE`.
pub const MINIMAL_PRESET_BASE: &str = "minimal";

/// Holds all the "constants" for a BeaconChain.
///
/// A `ChainSpec` is an explicit value: every epoch processing entry point takes one by reference,
/// so different protocol configurations can be processed side by side.
#[derive(Debug, PartialEq, Clone)]
pub struct ChainSpec {
    pub preset_base: String,

    /*
     * Time parameters
     */
    pub genesis_slot: Slot,
    pub slots_per_epoch: u64,
    pub far_future_epoch: Epoch,
    pub min_epochs_to_inactivity_penalty: u64,
    pub epochs_per_slashings_vector: u64,

    /*
     * Gwei values
     */
    pub effective_balance_increment: u64,

    /*
     * Reward and penalty quotients
     */
    pub base_reward_factor: u64,
    pub inactivity_penalty_quotient_altair: u64,
    pub proportional_slashing_multiplier_altair: u64,

    /*
     * Participation flag weights
     */
    pub timely_source_weight: u64,
    pub timely_target_weight: u64,
    pub timely_head_weight: u64,
    pub weight_denominator: u64,

    /*
     * Inactivity scoring
     */
    pub inactivity_score_bias: u64,
    pub inactivity_score_recovery_rate: u64,

    /*
     * Sync committees
     */
    pub sync_committee_size: u64,
    pub epochs_per_sync_committee_period: u64,
}

impl ChainSpec {
    /// Returns a `ChainSpec` compatible with the Ethereum Foundation specification.
    pub fn mainnet() -> Self {
        Self {
            preset_base: MAINNET_PRESET_BASE.to_string(),
            genesis_slot: Slot::new(0),
            slots_per_epoch: 32,
            far_future_epoch: Epoch::max_value(),
            min_epochs_to_inactivity_penalty: 4,
            epochs_per_slashings_vector: 8192,
            effective_balance_increment: 1_000_000_000,
            base_reward_factor: 64,
            inactivity_penalty_quotient_altair: 50_331_648,
            proportional_slashing_multiplier_altair: 2,
            timely_source_weight: TIMELY_SOURCE_WEIGHT,
            timely_target_weight: TIMELY_TARGET_WEIGHT,
            timely_head_weight: TIMELY_HEAD_WEIGHT,
            weight_denominator: WEIGHT_DENOMINATOR,
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,
            sync_committee_size: 512,
            epochs_per_sync_committee_period: 256,
        }
    }

    /// Ethereum Foundation minimal spec, as defined in the consensus-specs repo.
    pub fn minimal() -> Self {
        Self {
            preset_base: MINIMAL_PRESET_BASE.to_string(),
            slots_per_epoch: 8,
            epochs_per_slashings_vector: 64,
            sync_committee_size: 32,
            epochs_per_sync_committee_period: 8,
            ..ChainSpec::mainnet()
        }
    }

    /// Returns the spec for the named preset, if it is known.
    pub fn from_preset_base(preset_base: &str) -> Option<Self> {
        match preset_base {
            MAINNET_PRESET_BASE => Some(Self::mainnet()),
            MINIMAL_PRESET_BASE => Some(Self::minimal()),
            _ => None,
        }
    }

    pub fn genesis_epoch(&self) -> Epoch {
        self.genesis_slot.epoch(self.slots_per_epoch)
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    UnknownPresetBase(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

/// YAML representation of the epoch processing parameters of a `ChainSpec`.
///
/// Keys follow the upper-case naming of the consensus-specs config and preset files. Integers may
/// be written either bare or quoted.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Config {
    pub preset_base: String,

    #[serde(with = "serde_utils::quoted_u64")]
    pub slots_per_epoch: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub min_epochs_to_inactivity_penalty: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub epochs_per_slashings_vector: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance_increment: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub base_reward_factor: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_penalty_quotient_altair: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proportional_slashing_multiplier_altair: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_score_bias: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_score_recovery_rate: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub sync_committee_size: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub epochs_per_sync_committee_period: u64,
}

impl Config {
    pub fn from_chain_spec(spec: &ChainSpec) -> Self {
        Self {
            preset_base: spec.preset_base.clone(),
            slots_per_epoch: spec.slots_per_epoch,
            min_epochs_to_inactivity_penalty: spec.min_epochs_to_inactivity_penalty,
            epochs_per_slashings_vector: spec.epochs_per_slashings_vector,
            effective_balance_increment: spec.effective_balance_increment,
            base_reward_factor: spec.base_reward_factor,
            inactivity_penalty_quotient_altair: spec.inactivity_penalty_quotient_altair,
            proportional_slashing_multiplier_altair: spec.proportional_slashing_multiplier_altair,
            inactivity_score_bias: spec.inactivity_score_bias,
            inactivity_score_recovery_rate: spec.inactivity_score_recovery_rate,
            sync_committee_size: spec.sync_committee_size,
            epochs_per_sync_committee_period: spec.epochs_per_sync_committee_period,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply the values of this config on top of the spec for `PRESET_BASE`.
    ///
    /// Values that are protocol constants rather than configuration (e.g. flag weights) are taken
    /// from the preset.
    pub fn apply_to_chain_spec(&self) -> Result<ChainSpec, ConfigError> {
        let base = ChainSpec::from_preset_base(&self.preset_base)
            .ok_or_else(|| ConfigError::UnknownPresetBase(self.preset_base.clone()))?;

        Ok(ChainSpec {
            preset_base: self.preset_base.clone(),
            slots_per_epoch: self.slots_per_epoch,
            min_epochs_to_inactivity_penalty: self.min_epochs_to_inactivity_penalty,
            epochs_per_slashings_vector: self.epochs_per_slashings_vector,
            effective_balance_increment: self.effective_balance_increment,
            base_reward_factor: self.base_reward_factor,
            inactivity_penalty_quotient_altair: self.inactivity_penalty_quotient_altair,
            proportional_slashing_multiplier_altair: self.proportional_slashing_multiplier_altair,
            inactivity_score_bias: self.inactivity_score_bias,
            inactivity_score_recovery_rate: self.inactivity_score_recovery_rate,
            sync_committee_size: self.sync_committee_size,
            epochs_per_sync_committee_period: self.epochs_per_sync_committee_period,
            ..base
        })
    }
}
