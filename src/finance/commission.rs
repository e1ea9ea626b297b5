//! Transaction fee models: commission, stamp duty and transfer fee

use crate::error::{Result, RulesError};
use crate::finance::constants::{
    DEFAULT_COMMISSION_RATE, DEFAULT_MIN_COMMISSION, STAMP_DUTY_RATE, TRANSFER_FEE_RATE,
};
use crate::types::{Cash, Percentage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fee model trait
pub trait FeeModel: Send + Sync {
    /// Fee for a trade of `amount` (gross value in the settlement currency)
    fn compute_fee(&self, amount: Cash, is_sell: bool, is_primary_exchange: bool)
        -> Result<FeeBreakdown>;

    /// Smallest non-zero fee this model can charge
    fn min_fee(&self) -> Cash {
        0.0
    }

    /// Get model name
    fn name(&self) -> &str;
}

/// Itemised fees for one trade
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub commission: Cash,
    pub stamp_duty: Cash,
    pub transfer_fee: Cash,
    pub total: Cash,
}

impl FeeBreakdown {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Broker-specific fee configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Commission as a fraction of trade value
    pub commission_rate: Percentage,
    /// Commission floor per trade
    pub min_commission: Cash,
    /// Charge stamp duty on sells
    pub include_stamp_duty: bool,
    /// Charge transfer fee on the primary exchange
    pub include_transfer_fee: bool,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            min_commission: DEFAULT_MIN_COMMISSION,
            include_stamp_duty: true,
            include_transfer_fee: true,
        }
    }
}

impl FeeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.commission_rate >= 0.0) {
            return Err(RulesError::ConfigError(format!(
                "commission_rate must be non-negative, got {}",
                self.commission_rate
            )));
        }
        if !(self.min_commission >= 0.0) {
            return Err(RulesError::ConfigError(format!(
                "min_commission must be non-negative, got {}",
                self.min_commission
            )));
        }
        Ok(())
    }
}

/// A-share fee calculator
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    config: FeeConfig,
}

impl FeeCalculator {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Commission with the minimum applied
    pub fn commission(&self, amount: Cash) -> Cash {
        (amount * self.config.commission_rate).max(self.config.min_commission)
    }

    pub fn stamp_duty(&self, amount: Cash) -> Cash {
        amount * STAMP_DUTY_RATE
    }

    pub fn transfer_fee(&self, amount: Cash) -> Cash {
        amount * TRANSFER_FEE_RATE
    }
}

impl FeeModel for FeeCalculator {
    fn compute_fee(
        &self,
        amount: Cash,
        is_sell: bool,
        is_primary_exchange: bool,
    ) -> Result<FeeBreakdown> {
        if amount.is_nan() || amount < 0.0 {
            return Err(RulesError::InvalidInput(format!(
                "trade amount must be non-negative, got {}",
                amount
            )));
        }
        // No commission floor on an empty trade.
        if amount == 0.0 {
            return Ok(FeeBreakdown::zero());
        }

        let commission = self.commission(amount);
        let stamp_duty = if self.config.include_stamp_duty && is_sell {
            self.stamp_duty(amount)
        } else {
            0.0
        };
        let transfer_fee = if self.config.include_transfer_fee && is_primary_exchange {
            self.transfer_fee(amount)
        } else {
            0.0
        };

        Ok(FeeBreakdown {
            commission,
            stamp_duty,
            transfer_fee,
            total: commission + stamp_duty + transfer_fee,
        })
    }

    fn min_fee(&self) -> Cash {
        self.config.min_commission
    }

    fn name(&self) -> &str {
        "AShareFee"
    }
}

impl fmt::Display for FeeCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AShareFee(commission {:.4}%, min {:.2}, stamp duty {}, transfer fee {})",
            self.config.commission_rate * 100.0,
            self.config.min_commission,
            if self.config.include_stamp_duty {
                format!("{:.2}%", STAMP_DUTY_RATE * 100.0)
            } else {
                "none".to_string()
            },
            if self.config.include_transfer_fee {
                format!("{:.4}%", TRANSFER_FEE_RATE * 100.0)
            } else {
                "none".to_string()
            },
        )
    }
}

/// Zero fee model (for testing or fee-free simulations)
#[derive(Debug, Clone, Default)]
pub struct ZeroFee;

impl FeeModel for ZeroFee {
    fn compute_fee(&self, amount: Cash, _is_sell: bool, _is_primary: bool) -> Result<FeeBreakdown> {
        if amount.is_nan() || amount < 0.0 {
            return Err(RulesError::invalid(format!(
                "trade amount must be non-negative, got {}",
                amount
            )));
        }
        Ok(FeeBreakdown::zero())
    }

    fn name(&self) -> &str {
        "ZeroFee"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_minimum_commission() {
        let calc = FeeCalculator::default();
        let fee = calc.compute_fee(1000.0, false, false).unwrap();
        assert_eq!(fee.commission, 5.0);
        assert_eq!(fee.total, 5.0);
    }

    #[test]
    fn test_sell_on_primary_exchange() {
        let calc = FeeCalculator::default();
        let fee = calc.compute_fee(100_000.0, true, true).unwrap();
        assert_relative_eq!(fee.commission, 30.0, epsilon = 1e-9);
        assert_relative_eq!(fee.stamp_duty, 100.0, epsilon = 1e-9);
        assert_relative_eq!(fee.transfer_fee, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fee.total, 132.0, epsilon = 1e-9);
    }

    #[test]
    fn test_buy_on_primary_exchange() {
        let calc = FeeCalculator::default();
        let fee = calc.compute_fee(100_000.0, false, true).unwrap();
        assert_eq!(fee.stamp_duty, 0.0);
        assert_relative_eq!(fee.total, 32.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sell_on_secondary_exchange() {
        let calc = FeeCalculator::default();
        let fee = calc.compute_fee(100_000.0, true, false).unwrap();
        assert_eq!(fee.transfer_fee, 0.0);
        assert_relative_eq!(fee.total, 130.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_amount_has_no_floor() {
        let calc = FeeCalculator::default();
        assert_eq!(calc.compute_fee(0.0, true, true).unwrap(), FeeBreakdown::zero());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let calc = FeeCalculator::default();
        assert!(matches!(
            calc.compute_fee(-1.0, false, false),
            Err(RulesError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_custom_config() {
        let calc = FeeCalculator::new(FeeConfig {
            commission_rate: 0.00025,
            min_commission: 0.0,
            include_stamp_duty: false,
            include_transfer_fee: false,
        });
        let fee = calc.compute_fee(100_000.0, true, true).unwrap();
        assert_relative_eq!(fee.total, 25.0, epsilon = 1e-9);
        assert_eq!(calc.min_fee(), 0.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(FeeConfig::default().validate().is_ok());
        let bad = FeeConfig {
            min_commission: -5.0,
            ..FeeConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_display() {
        let text = FeeCalculator::default().to_string();
        assert!(text.contains("0.0300%"));
        assert!(text.contains("0.10%"));
    }

    #[test]
    fn test_zero_fee_model() {
        let fee = ZeroFee.compute_fee(50_000.0, true, true).unwrap();
        assert_eq!(fee.total, 0.0);
        assert_eq!(ZeroFee.name(), "ZeroFee");
    }

    proptest! {
        #[test]
        fn buy_off_primary_is_commission_only(amount in 0.01f64..1e9) {
            let calc = FeeCalculator::default();
            let fee = calc.compute_fee(amount, false, false).unwrap();
            prop_assert_eq!(fee.total, (amount * 0.0003).max(5.0));
        }
    }
}
