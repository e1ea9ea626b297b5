//! Daily price-limit bands (limit-up / limit-down)

use crate::asset::ShareClassification;
use crate::error::{Result, RulesError};
use crate::finance::constants::{
    GROWTH_BOARD_LIMIT_RATIO, NORMAL_LIMIT_RATIO, PRICE_DECIMALS, SPECIAL_TREATMENT_LIMIT_RATIO,
};
use crate::types::{Percentage, Price};
use serde::{Deserialize, Serialize};

/// Inclusive price range allowed for one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub lower_limit: Price,
    pub upper_limit: Price,
}

impl PriceBand {
    pub fn contains(&self, price: Price) -> bool {
        price >= self.lower_limit && price <= self.upper_limit
    }
}

/// Round a price to the exchange tick, halves away from zero
///
/// The small bias absorbs binary representation error so that e.g.
/// 11.055 (stored as 11.05499...) still rounds up to 11.06.
pub fn round_to_tick(price: Price) -> Price {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (price * scale + 1e-7).round() / scale
}

/// Stateless calculator for classification-specific price bands
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceLimitCalculator;

impl PriceLimitCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Daily limit as a fraction of the reference price
    pub fn limit_ratio(&self, classification: ShareClassification) -> Percentage {
        match classification {
            ShareClassification::GrowthOrInnovationBoard => GROWTH_BOARD_LIMIT_RATIO,
            ShareClassification::SpecialTreatment => SPECIAL_TREATMENT_LIMIT_RATIO,
            ShareClassification::Normal => NORMAL_LIMIT_RATIO,
        }
    }

    /// Band around `reference_price` (normally the previous close), both
    /// limits rounded to the price tick
    pub fn band(
        &self,
        reference_price: Price,
        classification: ShareClassification,
    ) -> Result<PriceBand> {
        if !(reference_price > 0.0) {
            return Err(RulesError::InvalidInput(format!(
                "reference price must be positive, got {}",
                reference_price
            )));
        }
        let ratio = self.limit_ratio(classification);
        Ok(PriceBand {
            lower_limit: round_to_tick(reference_price * (1.0 - ratio)),
            upper_limit: round_to_tick(reference_price * (1.0 + ratio)),
        })
    }

    pub fn upper_limit(
        &self,
        reference_price: Price,
        classification: ShareClassification,
    ) -> Result<Price> {
        Ok(self.band(reference_price, classification)?.upper_limit)
    }

    pub fn lower_limit(
        &self,
        reference_price: Price,
        classification: ShareClassification,
    ) -> Result<Price> {
        Ok(self.band(reference_price, classification)?.lower_limit)
    }

    /// Inclusive on both edges
    pub fn is_within_band(
        &self,
        price: Price,
        reference_price: Price,
        classification: ShareClassification,
    ) -> Result<bool> {
        Ok(self.band(reference_price, classification)?.contains(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const ALL: [ShareClassification; 3] = [
        ShareClassification::Normal,
        ShareClassification::SpecialTreatment,
        ShareClassification::GrowthOrInnovationBoard,
    ];

    #[test]
    fn test_limit_ratios() {
        let calc = PriceLimitCalculator::new();
        assert_eq!(calc.limit_ratio(ShareClassification::Normal), 0.10);
        assert_eq!(calc.limit_ratio(ShareClassification::SpecialTreatment), 0.05);
        assert_eq!(
            calc.limit_ratio(ShareClassification::GrowthOrInnovationBoard),
            0.20
        );
    }

    #[test]
    fn test_normal_band() {
        let calc = PriceLimitCalculator::new();
        let band = calc.band(10.0, ShareClassification::Normal).unwrap();
        assert_relative_eq!(band.lower_limit, 9.0, epsilon = 1e-9);
        assert_relative_eq!(band.upper_limit, 11.0, epsilon = 1e-9);

        assert!(calc.is_within_band(10.5, 10.0, ShareClassification::Normal).unwrap());
        assert!(!calc.is_within_band(11.5, 10.0, ShareClassification::Normal).unwrap());
        assert!(!calc.is_within_band(8.5, 10.0, ShareClassification::Normal).unwrap());
    }

    #[test]
    fn test_special_treatment_and_growth_bands() {
        let calc = PriceLimitCalculator::new();
        let st = calc.band(20.0, ShareClassification::SpecialTreatment).unwrap();
        assert_relative_eq!(st.lower_limit, 19.0, epsilon = 1e-9);
        assert_relative_eq!(st.upper_limit, 21.0, epsilon = 1e-9);

        let upper = calc
            .upper_limit(50.0, ShareClassification::GrowthOrInnovationBoard)
            .unwrap();
        let lower = calc
            .lower_limit(50.0, ShareClassification::GrowthOrInnovationBoard)
            .unwrap();
        assert_relative_eq!(upper, 60.0, epsilon = 1e-9);
        assert_relative_eq!(lower, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_positive_reference_rejected() {
        let calc = PriceLimitCalculator::new();
        assert!(calc.band(0.0, ShareClassification::Normal).is_err());
        assert!(calc.band(-1.0, ShareClassification::Normal).is_err());
        assert!(calc.band(f64::NAN, ShareClassification::Normal).is_err());
        assert!(calc.is_within_band(1.0, 0.0, ShareClassification::Normal).is_err());
    }

    #[test]
    fn test_limits_on_tick_are_inside_band() {
        let calc = PriceLimitCalculator::new();
        let growth = ShareClassification::GrowthOrInnovationBoard;

        let band = calc.band(9.9, growth).unwrap();
        assert_eq!(band.lower_limit, 7.92);
        assert_eq!(band.upper_limit, 11.88);
        assert!(calc.is_within_band(7.92, 9.9, growth).unwrap());
        assert!(!calc.is_within_band(7.91, 9.9, growth).unwrap());

        assert_eq!(calc.upper_limit(23.45, growth).unwrap(), 28.14);
        assert!(calc.is_within_band(28.14, 23.45, growth).unwrap());
        assert!(!calc.is_within_band(28.15, 23.45, growth).unwrap());
    }

    #[test]
    fn test_round_to_tick() {
        assert_eq!(round_to_tick(7.920000000000001), 7.92);
        assert_eq!(round_to_tick(28.139999999999997), 28.14);
        assert_eq!(round_to_tick(10.05 * 1.1), 11.06);
        assert_eq!(round_to_tick(9.004), 9.0);
    }

    proptest! {
        #[test]
        fn band_edges_are_inclusive(reference in 0.01f64..10_000.0, idx in 0usize..3) {
            let calc = PriceLimitCalculator::new();
            let classification = ALL[idx];
            let band = calc.band(reference, classification).unwrap();
            prop_assert!(calc.is_within_band(band.lower_limit, reference, classification).unwrap());
            prop_assert!(calc.is_within_band(band.upper_limit, reference, classification).unwrap());
            prop_assert!(band.lower_limit >= 0.0);
        }
    }
}
