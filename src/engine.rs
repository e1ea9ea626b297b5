//! Host-facing rules engine
//!
//! Wires the admission policy, the account's settlement ledger, the session
//! clock and the cash sink together. The host calls [`RulesEngine::admit`]
//! before routing an order, the fill hooks after execution and
//! [`RulesEngine::begin_session`] at the start of each trading day.

use crate::asset::Security;
use crate::calendar::TradingClock;
use crate::config::RulesConfig;
use crate::error::{Result, RulesError};
use crate::finance::account::{AShareAccount, Account, CashSink, Holding};
use crate::finance::admission::{AdmissionContext, AdmissionResult, OrderAdmissionPolicy};
use crate::finance::commission::{FeeBreakdown, FeeCalculator};
use crate::finance::settlement::{Deduction, LedgerDump, SettlementLedger};
use crate::order::{Fill, Order, OrderSide};
use crate::types::{Cash, Price, Quantity};
use chrono::{Days, NaiveDate};
use std::sync::Arc;

/// Bookkeeping result of [`RulesEngine::on_fill`]
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub fee: FeeBreakdown,
    /// Cash debited (buys) or proceeds pending settlement (sells)
    pub cash_flow: Cash,
    /// Sellable shares consumed, for sells
    pub deduction: Option<Deduction>,
}

/// A-share trading rules engine for one account
pub struct RulesEngine {
    config: RulesConfig,
    policy: OrderAdmissionPolicy,
    account: Arc<AShareAccount>,
    sink: Arc<dyn CashSink>,
    clock: Arc<dyn TradingClock>,
    last_session: Option<NaiveDate>,
}

impl RulesEngine {
    /// Create an engine; settled cash is credited back to `account`
    pub fn new(
        config: RulesConfig,
        account: Arc<AShareAccount>,
        clock: Arc<dyn TradingClock>,
    ) -> Result<Self> {
        config.validate()?;
        if config.currency != account.ledger().currency() {
            return Err(RulesError::ConfigError(format!(
                "configured currency {} does not match the account ledger currency {}",
                config.currency,
                account.ledger().currency()
            )));
        }
        let policy = OrderAdmissionPolicy::new(FeeCalculator::new(config.fees.clone()))
            .with_lot_size(config.lot_size)
            .with_new_listing_days(config.new_listing_unlimited_days);
        let sink: Arc<dyn CashSink> = account.clone();
        Ok(Self {
            config,
            policy,
            account,
            sink,
            clock,
            last_session: None,
        })
    }

    /// Route settled cash to a different sink (e.g. the host's cash book)
    pub fn with_cash_sink(mut self, sink: Arc<dyn CashSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn policy(&self) -> &OrderAdmissionPolicy {
        &self.policy
    }

    pub fn account(&self) -> &Arc<AShareAccount> {
        &self.account
    }

    pub fn ledger(&self) -> &Arc<SettlementLedger> {
        self.account.ledger()
    }

    fn today(&self) -> NaiveDate {
        self.clock.current_trading_date()
    }

    /// Admit an order against the account's spendable cash
    pub fn admit(&self, order: &Order, security: &Security, last_price: Price) -> Result<AdmissionResult> {
        let ctx = AdmissionContext::for_account(self.account.as_ref(), self.today(), last_price);
        self.log_decision(order, self.policy.admit(order, security, &ctx))
    }

    /// Admit an order against an explicit cash amount
    pub fn admit_with_cash(
        &self,
        order: &Order,
        security: &Security,
        last_price: Price,
        available_cash: Cash,
    ) -> Result<AdmissionResult> {
        let ctx = AdmissionContext {
            available_cash,
            ..AdmissionContext::for_account(self.account.as_ref(), self.today(), last_price)
        };
        self.log_decision(order, self.policy.admit(order, security, &ctx))
    }

    fn log_decision(
        &self,
        order: &Order,
        result: Result<AdmissionResult>,
    ) -> Result<AdmissionResult> {
        if let Ok(AdmissionResult {
            accepted: false,
            reason: Some(reason),
            ..
        }) = &result
        {
            log::info!("Order {} rejected: {}", order.id, reason);
        }
        result
    }

    /// Re-check an execution price against the daily band
    pub fn validate_fill(
        &self,
        security: &Security,
        fill_price: Price,
        reference_price: Price,
    ) -> Result<AdmissionResult> {
        self.policy
            .check_fill_price(security, fill_price, reference_price, self.today())
    }

    /// Ledger hook: shares bought on `trade_date`
    pub fn on_buy_filled(&self, symbol: &str, quantity: Quantity, trade_date: NaiveDate) -> Result<()> {
        self.ledger().record_buy(symbol, quantity, trade_date)
    }

    /// Ledger hook: proceeds of a sale on `trade_date`
    pub fn on_sell_filled(&self, symbol: &str, proceeds: Cash, trade_date: NaiveDate) -> Result<()> {
        self.ledger().record_sell(symbol, proceeds, trade_date)
    }

    /// Full bookkeeping for an execution
    ///
    /// Buys pay cost plus fees at once and the shares mature T+1. Sells
    /// consume matured shares and park the net proceeds until T+1.
    pub fn on_fill(&self, security: &Security, fill: &Fill) -> Result<FillOutcome> {
        let amount = fill.amount();
        let quantity = fill.quantity.abs();
        if !amount.is_finite() || !(quantity > 0.0) {
            return Err(RulesError::InvalidInput(format!(
                "fill of {} {} at {} has no finite value",
                fill.quantity, fill.symbol, fill.price
            )));
        }
        let fee = self.policy.fee_model().compute_fee(
            amount,
            fill.side.is_sell(),
            security.is_primary_exchange(),
        )?;
        let book = self.account.cash_book();

        match fill.side {
            OrderSide::Buy => {
                let cost = amount + fee.total;
                self.on_buy_filled(&fill.symbol, quantity, fill.trade_date)?;
                book.debit_cash(cost)?;
                book.adjust_position(&fill.symbol, quantity);
                Ok(FillOutcome {
                    fee,
                    cash_flow: cost,
                    deduction: None,
                })
            }
            OrderSide::Sell => {
                let proceeds = amount - fee.total;
                let deduction =
                    self.ledger()
                        .reduce_sellable(&fill.symbol, quantity, fill.trade_date)?;
                if proceeds > 0.0 {
                    self.on_sell_filled(&fill.symbol, proceeds, fill.trade_date)?;
                }
                book.adjust_position(&fill.symbol, -quantity);
                Ok(FillOutcome {
                    fee,
                    cash_flow: proceeds.max(0.0),
                    deduction: Some(deduction),
                })
            }
        }
    }

    /// Start-of-session processing
    ///
    /// Settles every pending cash entry due by today (catching up dates
    /// that fell on non-trading days) and drops emptied lot and cash entries
    /// older than the retention window. The audit history is left alone;
    /// see [`RulesEngine::prune_history`]. Runs once per session; a failed
    /// credit leaves the session open so the next call retries.
    pub fn begin_session(&mut self) -> Result<Cash> {
        let today = self.today();
        if !self.clock.is_new_trading_session(today) || self.last_session == Some(today) {
            return Ok(0.0);
        }

        let applied = self.ledger().settle_through(today, self.sink.as_ref())?;
        let removed = self.ledger().cleanup(self.retention_cutoff(today));
        self.last_session = Some(today);

        log::info!(
            "Session {} opened: settled {:.2} {}, pruned {} ledger entries",
            today,
            applied,
            self.config.currency,
            removed
        );
        Ok(applied)
    }

    fn retention_cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(self.config.history_retention_days.max(0) as u64))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Drop audit history older than the retention window
    pub fn prune_history(&self) -> usize {
        let cutoff = self.retention_cutoff(self.today());
        self.ledger().prune_history(cutoff)
    }

    /// Settle only the cash maturing exactly on `as_of`
    pub fn sweep(&self, as_of: NaiveDate) -> Result<Cash> {
        self.ledger().sweep(as_of, self.sink.as_ref())
    }

    pub fn sellable_quantity(&self, symbol: &str) -> Quantity {
        self.account.sellable_quantity(symbol, self.today())
    }

    pub fn unsettled_cash_total(&self) -> Cash {
        self.ledger().unsettled_cash_total()
    }

    pub fn dump(&self) -> LedgerDump {
        self.ledger().dump()
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.account.holdings(self.today())
    }
}
