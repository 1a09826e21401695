//! Ledger configuration.
//!
//! All fields have defaults, so an empty JSON object is a valid
//! configuration file.

use crate::core::currency::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest supported split precision.
pub const MAX_SPLIT_SCALE: u32 = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for share resolution and the derived views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Currency for new scopes.
    pub default_currency: CurrencyCode,
    /// Decimal places kept when dividing an expense equally.
    pub split_scale: u32,
    /// How far explicit shares may drift from the expense amount, in
    /// minor currency units.
    pub share_tolerance_minor_units: u32,
    /// Entries returned by the activity feed.
    pub activity_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::default(),
            split_scale: 4,
            share_tolerance_minor_units: 1,
            activity_limit: 10,
        }
    }
}

impl LedgerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let minor = self.default_currency.minor_digits();
        if self.split_scale < minor || self.split_scale > MAX_SPLIT_SCALE {
            return Err(ConfigError::Invalid {
                field: "split_scale",
                reason: format!(
                    "must be between {} and {}, got {}",
                    minor, MAX_SPLIT_SCALE, self.split_scale
                ),
            });
        }
        if self.activity_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "activity_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Split policy for a scope denominated in `currency`.
    pub fn split_policy(&self, currency: &CurrencyCode) -> SplitPolicy {
        SplitPolicy {
            // a scope in a finer currency never splits coarser than its minor unit
            scale: self.split_scale.max(currency.minor_digits()),
            tolerance: currency.minor_unit() * Decimal::from(self.share_tolerance_minor_units),
        }
    }
}

/// Precision rules applied when resolving expense shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPolicy {
    /// Decimal places of an equal-split share.
    pub scale: u32,
    /// Allowed gap between explicit shares and the expense amount.
    pub tolerance: Decimal,
}

impl SplitPolicy {
    /// The smallest amount an equal split hands out.
    pub fn unit(&self) -> Decimal {
        Decimal::new(1, self.scale)
    }
}

impl Default for SplitPolicy {
    fn default() -> Self {
        LedgerConfig::default().split_policy(&CurrencyCode::default())
    }
}
