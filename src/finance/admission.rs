//! Order admission: lot size, buying power, T+1 sellability and price limits
//!
//! Admission is read-only. Rejections carry a structured [`RuleViolation`]
//! and never touch the settlement ledger, so a check can be retried freely.

use crate::asset::Security;
use crate::error::{Result, RulesError};
use crate::finance::account::Account;
use crate::finance::commission::{FeeCalculator, FeeModel};
use crate::finance::constants::{LOT_SIZE, NEW_LISTING_UNLIMITED_DAYS};
use crate::finance::price_limit::PriceLimitCalculator;
use crate::order::{Order, OrderSide};
use crate::types::{Cash, Price, Quantity, Symbol};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

/// Expected, user-facing reason an order is not admitted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("Order quantity {quantity} is not a multiple of {lot_size} shares (remainder {remainder})")]
    LotSize {
        quantity: Quantity,
        lot_size: u32,
        remainder: Quantity,
    },

    #[error("Insufficient funds: required {required:.2} including fees, available {available:.2}, shortfall {shortfall:.2}")]
    InsufficientFunds {
        required: Cash,
        available: Cash,
        shortfall: Cash,
    },

    #[error("T+1 restriction on {symbol}: selling {requested}, sellable {sellable}, shortfall {shortfall}")]
    InsufficientSellable {
        symbol: Symbol,
        requested: Quantity,
        sellable: Quantity,
        shortfall: Quantity,
    },

    #[error("Price {price:.2} for {symbol} outside daily limit [{lower_limit:.2}, {upper_limit:.2}] (reference {reference_price:.2})")]
    PriceOutsideBand {
        symbol: Symbol,
        price: Price,
        reference_price: Price,
        lower_limit: Price,
        upper_limit: Price,
    },
}

/// Accept/reject decision with a human-readable reason
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionResult {
    pub accepted: bool,
    pub reason: Option<String>,
    pub violation: Option<RuleViolation>,
}

impl AdmissionResult {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
            violation: None,
        }
    }

    pub fn reject(violation: RuleViolation) -> Self {
        Self {
            accepted: false,
            reason: Some(violation.to_string()),
            violation: Some(violation),
        }
    }
}

/// Market and account state an admission decision is made against
#[derive(Clone, Copy)]
pub struct AdmissionContext<'a> {
    pub current_date: NaiveDate,
    /// Cash the order may draw on
    pub available_cash: Cash,
    /// Last traded price; reference for the price band and market-order valuation
    pub last_price: Price,
    pub account: &'a dyn Account,
}

impl<'a> AdmissionContext<'a> {
    /// Context drawing available cash from the account itself
    pub fn for_account(account: &'a dyn Account, current_date: NaiveDate, last_price: Price) -> Self {
        Self {
            current_date,
            available_cash: account.available_cash(),
            last_price,
            account,
        }
    }
}

/// Pre-trade admission policy for A-share orders
#[derive(Clone)]
pub struct OrderAdmissionPolicy {
    fees: Arc<dyn FeeModel>,
    limits: PriceLimitCalculator,
    lot_size: u32,
    new_listing_unlimited_days: i64,
}

impl Default for OrderAdmissionPolicy {
    fn default() -> Self {
        Self::new(FeeCalculator::default())
    }
}

impl OrderAdmissionPolicy {
    pub fn new(fees: FeeCalculator) -> Self {
        Self::with_fee_model(Arc::new(fees))
    }

    pub fn with_fee_model(fees: Arc<dyn FeeModel>) -> Self {
        Self {
            fees,
            limits: PriceLimitCalculator::new(),
            lot_size: LOT_SIZE,
            new_listing_unlimited_days: NEW_LISTING_UNLIMITED_DAYS,
        }
    }

    pub fn with_lot_size(mut self, lot_size: u32) -> Self {
        self.lot_size = lot_size.max(1);
        self
    }

    pub fn with_new_listing_days(mut self, days: i64) -> Self {
        self.new_listing_unlimited_days = days;
        self
    }

    pub fn fee_model(&self) -> &dyn FeeModel {
        self.fees.as_ref()
    }

    pub fn lot_size(&self) -> u32 {
        self.lot_size
    }

    /// Run the admission checks in order, stopping at the first violation
    ///
    /// `Err` is reserved for malformed input (non-positive quantity or
    /// reference price); rule violations come back as a rejected result.
    pub fn admit(
        &self,
        order: &Order,
        security: &Security,
        ctx: &AdmissionContext<'_>,
    ) -> Result<AdmissionResult> {
        let quantity = order.quantity.abs();
        if !(quantity > 0.0) || !quantity.is_finite() {
            return Err(RulesError::InvalidInput(format!(
                "order quantity must be positive, got {}",
                order.quantity
            )));
        }

        if let Some(violation) = self.check_lot_size(quantity) {
            return Ok(AdmissionResult::reject(violation));
        }

        match order.side {
            OrderSide::Buy => {
                let price = order.valuation_price(ctx.last_price);
                if !(price > 0.0) {
                    return Err(RulesError::InvalidInput(format!(
                        "cannot value buy order for {} at price {}",
                        order.symbol, price
                    )));
                }
                let required = self.required_cash(quantity, price, security)?;
                if required > ctx.available_cash {
                    return Ok(AdmissionResult::reject(RuleViolation::InsufficientFunds {
                        required,
                        available: ctx.available_cash,
                        shortfall: required - ctx.available_cash,
                    }));
                }
            }
            OrderSide::Sell => {
                let sellable = ctx.account.sellable_quantity(&order.symbol, ctx.current_date);
                if quantity > sellable {
                    return Ok(AdmissionResult::reject(RuleViolation::InsufficientSellable {
                        symbol: order.symbol.clone(),
                        requested: quantity,
                        sellable,
                        shortfall: quantity - sellable,
                    }));
                }
            }
        }

        if order.explicit_prices().next().is_some()
            && !security.is_new_listing(ctx.current_date, self.new_listing_unlimited_days)
        {
            let band = self.limits.band(ctx.last_price, security.classification())?;
            if let Some(price) = order.explicit_prices().find(|p| !band.contains(*p)) {
                return Ok(AdmissionResult::reject(RuleViolation::PriceOutsideBand {
                    symbol: order.symbol.clone(),
                    price,
                    reference_price: ctx.last_price,
                    lower_limit: band.lower_limit,
                    upper_limit: band.upper_limit,
                }));
            }
        }

        Ok(AdmissionResult::accept())
    }

    /// Re-validate an execution price against the daily band
    pub fn check_fill_price(
        &self,
        security: &Security,
        fill_price: Price,
        reference_price: Price,
        trade_date: NaiveDate,
    ) -> Result<AdmissionResult> {
        if security.is_new_listing(trade_date, self.new_listing_unlimited_days) {
            return Ok(AdmissionResult::accept());
        }
        let band = self.limits.band(reference_price, security.classification())?;
        if band.contains(fill_price) {
            Ok(AdmissionResult::accept())
        } else {
            Ok(AdmissionResult::reject(RuleViolation::PriceOutsideBand {
                symbol: security.symbol.clone(),
                price: fill_price,
                reference_price,
                lower_limit: band.lower_limit,
                upper_limit: band.upper_limit,
            }))
        }
    }

    fn check_lot_size(&self, quantity: Quantity) -> Option<RuleViolation> {
        let remainder = quantity % self.lot_size as f64;
        (remainder != 0.0).then(|| RuleViolation::LotSize {
            quantity,
            lot_size: self.lot_size,
            remainder,
        })
    }

    /// Trade value plus buy-side fees
    pub fn required_cash(&self, quantity: Quantity, price: Price, security: &Security) -> Result<Cash> {
        let amount = quantity.abs() * price;
        let fee = self
            .fees
            .compute_fee(amount, false, security.is_primary_exchange())?;
        Ok(amount + fee.total)
    }

    pub fn is_valid_lot(&self, quantity: Quantity) -> bool {
        quantity % self.lot_size as f64 == 0.0
    }

    /// Round down to a whole number of lots
    pub fn round_to_lot(&self, quantity: Quantity) -> Quantity {
        let lot = self.lot_size as f64;
        (quantity / lot).floor() * lot
    }

    /// Largest lot-multiple quantity whose cost including fees fits in `cash`
    pub fn max_affordable_quantity(
        &self,
        cash: Cash,
        price: Price,
        security: &Security,
    ) -> Result<Quantity> {
        if !(price > 0.0) || !price.is_finite() {
            return Err(RulesError::InvalidInput(format!(
                "price must be positive, got {}",
                price
            )));
        }
        if !cash.is_finite() {
            return Err(RulesError::InvalidInput(format!(
                "cash must be finite, got {}",
                cash
            )));
        }
        let budget = cash - self.fees.min_fee();
        if budget <= 0.0 {
            return Ok(0.0);
        }

        // Bisect on whole lots; `lo` is always affordable.
        let lot = self.lot_size as f64;
        let affordable = |lots: f64| -> Result<bool> {
            Ok(self.required_cash(lots * lot, price, security)? <= cash)
        };
        let mut lo = 0.0;
        let mut hi = (budget / price / lot).floor();
        if affordable(hi)? {
            return Ok(hi * lot);
        }
        while hi - lo > 1.0 {
            let mid = ((lo + hi) / 2.0).floor();
            if mid <= lo || mid >= hi {
                break;
            }
            if affordable(mid)? {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(lo * lot)
    }
}
