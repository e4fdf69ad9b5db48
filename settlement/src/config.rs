//! Configuration for balance computation and settlement planning

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Settlement engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tolerance below which an amount counts as zero.
    /// Default 0.005: half of the smallest unit for cent-precision currencies.
    pub epsilon: Decimal,

    /// Decimal places of the currency minor unit (2 for cents)
    pub currency_scale: u32,

    /// What to do when an expense or payment names a member outside the roster
    pub unknown_member_policy: UnknownMemberPolicy,

    /// What to do when an expense's split payload cannot be decoded
    pub malformed_split_policy: MalformedSplitPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epsilon: Decimal::new(5, 3), // 0.005
            currency_scale: 2,
            unknown_member_policy: UnknownMemberPolicy::default(),
            malformed_split_policy: MalformedSplitPolicy::default(),
        }
    }
}

/// Unknown member handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMemberPolicy {
    /// Drop the contribution and record a diagnostic
    #[default]
    Warn,
    /// Fail with `UnknownGroupMember`
    Reject,
}

impl FromStr for UnknownMemberPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(UnknownMemberPolicy::Warn),
            "reject" => Ok(UnknownMemberPolicy::Reject),
            other => Err(crate::Error::Config(format!(
                "unknown member policy must be 'warn' or 'reject', got '{}'",
                other
            ))),
        }
    }
}

/// Malformed split payload handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedSplitPolicy {
    /// Fail with `MalformedSplitData`
    #[default]
    Reject,
    /// Leave the whole expense out and record its id
    Skip,
}

impl FromStr for MalformedSplitPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(MalformedSplitPolicy::Reject),
            "skip" => Ok(MalformedSplitPolicy::Skip),
            other => Err(crate::Error::Config(format!(
                "malformed split policy must be 'reject' or 'skip', got '{}'",
                other
            ))),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply `SETTLEMENT_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(epsilon) = std::env::var("SETTLEMENT_EPSILON") {
            self.epsilon = Decimal::from_str(epsilon.trim()).map_err(|e| {
                crate::Error::Config(format!("SETTLEMENT_EPSILON '{}': {}", epsilon, e))
            })?;
        }

        if let Ok(scale) = std::env::var("SETTLEMENT_CURRENCY_SCALE") {
            self.currency_scale = scale.trim().parse().map_err(|e| {
                crate::Error::Config(format!("SETTLEMENT_CURRENCY_SCALE '{}': {}", scale, e))
            })?;
        }

        if let Ok(policy) = std::env::var("SETTLEMENT_UNKNOWN_MEMBER_POLICY") {
            self.unknown_member_policy = policy.parse()?;
        }

        if let Ok(policy) = std::env::var("SETTLEMENT_MALFORMED_SPLIT_POLICY") {
            self.malformed_split_policy = policy.parse()?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        if self.epsilon <= Decimal::ZERO {
            return Err(crate::Error::Config(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }

        if self.currency_scale > 8 {
            return Err(crate::Error::Config(format!(
                "currency scale must be at most 8, got {}",
                self.currency_scale
            )));
        }

        Ok(())
    }
}
