//! Rules engine configuration loaded from TOML
//!
//! ```toml
//! currency = "CNY"
//! lot_size = 100
//! history_retention_days = 30
//!
//! [fees]
//! commission_rate = 0.00025
//! min_commission = 5.0
//! include_transfer_fee = true
//! ```

use crate::calendar::ChinaCalendar;
use crate::error::{Result, RulesError};
use crate::finance::commission::FeeConfig;
use crate::finance::constants::{
    DEFAULT_HISTORY_RETENTION_DAYS, LOT_SIZE, NEW_LISTING_UNLIMITED_DAYS, SETTLEMENT_CURRENCY,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Settlement currency; must match the account ledger's currency
    pub currency: String,
    /// Shares per round lot
    pub lot_size: u32,
    pub fees: FeeConfig,
    /// Days of ledger history kept by retention cleanup
    pub history_retention_days: i64,
    /// Days after listing during which the price band is not enforced
    pub new_listing_unlimited_days: i64,
    /// Exchange holidays on top of weekends
    pub holidays: Vec<NaiveDate>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            currency: SETTLEMENT_CURRENCY.to_string(),
            lot_size: LOT_SIZE,
            fees: FeeConfig::default(),
            history_retention_days: DEFAULT_HISTORY_RETENTION_DAYS,
            new_listing_unlimited_days: NEW_LISTING_UNLIMITED_DAYS,
            holidays: Vec::new(),
        }
    }
}

impl RulesConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| RulesError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Exchange calendar: the configured holidays, or the built-in set when none are given
    pub fn calendar(&self) -> ChinaCalendar {
        if self.holidays.is_empty() {
            ChinaCalendar::new()
        } else {
            ChinaCalendar::with_holidays(self.holidays.clone())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.fees.validate()?;
        if self.lot_size == 0 {
            return Err(RulesError::ConfigError("lot_size must be at least 1".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(RulesError::ConfigError("currency must not be empty".to_string()));
        }
        if self.history_retention_days < 0 {
            return Err(RulesError::ConfigError(format!(
                "history_retention_days must be non-negative, got {}",
                self.history_retention_days
            )));
        }
        if self.new_listing_unlimited_days < 0 {
            return Err(RulesError::ConfigError(format!(
                "new_listing_unlimited_days must be non-negative, got {}",
                self.new_listing_unlimited_days
            )));
        }
        Ok(())
    }
}
