//! T+1 settlement ledger
//!
//! Tracks when purchased shares become sellable and when sale proceeds
//! become spendable. Entitlements are keyed by maturity date, so "what
//! matures today" is a lookup and the whole ledger can be rebuilt by
//! replaying trade history.
//!
//! All state sits behind one mutex: every read and write is mutually
//! exclusive per ledger instance.

use crate::error::{Result, RulesError};
use crate::finance::account::{CashSink, SettlementPolicy};
use crate::finance::constants::SETTLEMENT_CURRENCY;
use crate::types::{Cash, Quantity, Symbol, Timestamp};
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Kind of ledger event kept in the audit history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOperation {
    /// Shares bought, sellable from the settlement date
    Buy,
    /// Sale proceeds pending, spendable from the settlement date
    Sell,
    /// Matured shares consumed by a sale
    Deduct,
    /// Pending proceeds credited to the cash balance
    CashSettled,
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub recorded_at: Timestamp,
    pub trade_date: NaiveDate,
    pub symbol: Option<Symbol>,
    /// Shares for `Buy`/`Deduct`, money for `Sell`/`CashSettled`
    pub amount: f64,
    pub operation: SettlementOperation,
    pub settlement_date: NaiveDate,
}

/// Outcome of [`SettlementLedger::reduce_sellable`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduction {
    pub requested: Quantity,
    pub deducted: Quantity,
}

impl Deduction {
    /// Quantity that could not be deducted because it had not matured
    pub fn shortfall(&self) -> Quantity {
        (self.requested - self.deducted).max(0.0)
    }

    pub fn was_clamped(&self) -> bool {
        self.shortfall() > 0.0
    }
}

/// Read-only view of the ledger for holdings/reporting displays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDump {
    /// symbol -> maturity date -> quantity
    pub lots: BTreeMap<Symbol, BTreeMap<NaiveDate, Quantity>>,
    /// maturity date -> pending cash
    pub pending_cash: BTreeMap<NaiveDate, Cash>,
}

/// Persisted ledger layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub lots: BTreeMap<Symbol, Vec<(NaiveDate, Quantity)>>,
    pub pending_cash: Vec<(NaiveDate, Cash)>,
    pub history: Vec<SettlementRecord>,
}

#[derive(Debug, Default)]
struct LedgerState {
    lots: BTreeMap<(Symbol, NaiveDate), Quantity>,
    pending_cash: BTreeMap<NaiveDate, Cash>,
    history: Vec<SettlementRecord>,
}

impl LedgerState {
    fn matured_lots<'a>(
        &'a self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> impl Iterator<Item = (&'a (Symbol, NaiveDate), &'a Quantity)> + 'a {
        self.lots
            .range((symbol.to_string(), NaiveDate::MIN)..=(symbol.to_string(), as_of))
    }

    fn push_history(
        &mut self,
        trade_date: NaiveDate,
        symbol: Option<&str>,
        amount: f64,
        operation: SettlementOperation,
        settlement_date: NaiveDate,
    ) {
        self.history.push(SettlementRecord {
            recorded_at: Utc::now(),
            trade_date,
            symbol: symbol.map(str::to_string),
            amount,
            operation,
            settlement_date,
        });
    }
}

/// Per-account T+1 settlement ledger
#[derive(Debug)]
pub struct SettlementLedger {
    currency: String,
    state: Mutex<LedgerState>,
}

impl Default for SettlementLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn settlement_date(trade_date: NaiveDate) -> Result<NaiveDate> {
    trade_date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| RulesError::invalid(format!("no settlement date after {}", trade_date)))
}

fn require_positive(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RulesError::InvalidInput(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}

impl SettlementLedger {
    /// Empty ledger settling in CNY
    pub fn new() -> Self {
        Self::with_currency(SETTLEMENT_CURRENCY)
    }

    pub fn with_currency(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still holds a consistent ledger.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record bought shares; they become sellable the next calendar day
    pub fn record_buy(&self, symbol: &str, quantity: Quantity, trade_date: NaiveDate) -> Result<()> {
        require_positive("buy quantity", quantity)?;
        let sellable_on = settlement_date(trade_date)?;

        let mut state = self.lock();
        *state
            .lots
            .entry((symbol.to_string(), sellable_on))
            .or_insert(0.0) += quantity;
        state.push_history(
            trade_date,
            Some(symbol),
            quantity,
            SettlementOperation::Buy,
            sellable_on,
        );

        log::debug!(
            "Recorded buy of {} {} on {}, sellable from {}",
            quantity,
            symbol,
            trade_date,
            sellable_on
        );
        Ok(())
    }

    /// Record sale proceeds; they become spendable the next calendar day
    pub fn record_sell(&self, symbol: &str, proceeds: Cash, trade_date: NaiveDate) -> Result<()> {
        require_positive("sale proceeds", proceeds)?;
        let spendable_on = settlement_date(trade_date)?;

        let mut state = self.lock();
        *state.pending_cash.entry(spendable_on).or_insert(0.0) += proceeds;
        state.push_history(
            trade_date,
            Some(symbol),
            proceeds,
            SettlementOperation::Sell,
            spendable_on,
        );

        log::debug!(
            "Recorded sale of {} for {:.2} {} on {}, spendable from {}",
            symbol,
            proceeds,
            self.currency,
            trade_date,
            spendable_on
        );
        Ok(())
    }

    /// Shares of `symbol` whose maturity date is on or before `as_of`
    pub fn sellable_quantity(&self, symbol: &str, as_of: NaiveDate) -> Quantity {
        self.lock().matured_lots(symbol, as_of).map(|(_, q)| *q).sum()
    }

    pub fn is_quantity_sellable(&self, symbol: &str, quantity: Quantity, as_of: NaiveDate) -> bool {
        self.sellable_quantity(symbol, as_of) >= quantity
    }

    /// Consume matured shares, oldest maturity first
    ///
    /// Never drives a lot negative. If less has matured than requested, all
    /// matured shares are consumed and the returned [`Deduction`] reports the
    /// shortfall; callers are expected to check [`Self::sellable_quantity`]
    /// first.
    pub fn reduce_sellable(
        &self,
        symbol: &str,
        quantity: Quantity,
        as_of: NaiveDate,
    ) -> Result<Deduction> {
        if !(quantity >= 0.0) || quantity.is_infinite() {
            return Err(RulesError::InvalidInput(format!(
                "deduction quantity must be non-negative, got {}",
                quantity
            )));
        }

        let mut state = self.lock();
        let matured: Vec<(Symbol, NaiveDate)> = state
            .matured_lots(symbol, as_of)
            .map(|(key, _)| key.clone())
            .collect();

        let mut remaining = quantity;
        for key in matured {
            if remaining <= 0.0 {
                break;
            }
            let Some(lot) = state.lots.get_mut(&key) else {
                continue;
            };
            let taken = lot.min(remaining);
            *lot -= taken;
            remaining -= taken;
            if *lot <= 0.0 {
                state.lots.remove(&key);
            }
        }

        let deduction = Deduction {
            requested: quantity,
            deducted: quantity - remaining,
        };
        if deduction.deducted > 0.0 {
            state.push_history(
                as_of,
                Some(symbol),
                deduction.deducted,
                SettlementOperation::Deduct,
                as_of,
            );
        }
        drop(state);

        if deduction.was_clamped() {
            log::warn!(
                "Deduction of {} {} exceeds matured quantity on {}; clamped by {}",
                quantity,
                symbol,
                as_of,
                deduction.shortfall()
            );
        } else {
            log::debug!("Deducted {} {} sellable on {}", quantity, symbol, as_of);
        }
        Ok(deduction)
    }

    /// Settle the cash maturing on exactly `as_of`
    ///
    /// Credits the pending amount to `sink` and removes the entry. If the
    /// sink fails the entry is kept for the next sweep. Matured share lots
    /// need no transfer; they are only logged. The sink must not call back
    /// into this ledger.
    pub fn sweep(&self, as_of: NaiveDate, sink: &dyn CashSink) -> Result<Cash> {
        let mut state = self.lock();

        for ((symbol, _), quantity) in state.lots.iter().filter(|((_, d), _)| *d == as_of) {
            log::debug!("{} {} became sellable on {}", quantity, symbol, as_of);
        }

        let Some(&amount) = state.pending_cash.get(&as_of) else {
            return Ok(0.0);
        };
        self.credit_entry(&mut state, as_of, amount, sink)?;
        Ok(amount.max(0.0))
    }

    /// Settle every pending cash entry maturing on or before `as_of`
    ///
    /// Stops at the first sink failure; entries already credited stay
    /// settled and the failed one is kept.
    pub fn settle_through(&self, as_of: NaiveDate, sink: &dyn CashSink) -> Result<Cash> {
        let mut state = self.lock();
        let due: Vec<(NaiveDate, Cash)> = state
            .pending_cash
            .range(..=as_of)
            .map(|(d, a)| (*d, *a))
            .collect();

        let mut applied = 0.0;
        for (date, amount) in due {
            self.credit_entry(&mut state, date, amount, sink)?;
            applied += amount.max(0.0);
        }
        Ok(applied)
    }

    fn credit_entry(
        &self,
        state: &mut LedgerState,
        date: NaiveDate,
        amount: Cash,
        sink: &dyn CashSink,
    ) -> Result<()> {
        if amount > 0.0 {
            if let Err(e) = sink.credit_cash(amount, &self.currency) {
                log::warn!(
                    "Failed to credit {:.2} {} settling on {}: {}; will retry",
                    amount,
                    self.currency,
                    date,
                    e
                );
                return Err(e);
            }
            state.push_history(date, None, amount, SettlementOperation::CashSettled, date);
            log::debug!("Settled {:.2} {} on {}", amount, self.currency, date);
        }
        state.pending_cash.remove(&date);
        Ok(())
    }

    /// Sum of all pending cash, any date
    pub fn unsettled_cash_total(&self) -> Cash {
        self.lock().pending_cash.values().sum()
    }

    /// Pending cash maturing on `date`
    pub fn unsettled_cash_on(&self, date: NaiveDate) -> Cash {
        self.lock().pending_cash.get(&date).copied().unwrap_or(0.0)
    }

    /// Remove zero-valued entries dated strictly before `cutoff`
    ///
    /// Non-zero entries are never removed. Returns the number of entries
    /// dropped.
    pub fn cleanup(&self, cutoff: NaiveDate) -> usize {
        let mut state = self.lock();
        let before = state.lots.len() + state.pending_cash.len();
        state.lots.retain(|(_, date), q| *date >= cutoff || *q > 0.0);
        state.pending_cash.retain(|date, a| *date >= cutoff || *a > 0.0);
        let removed = before - (state.lots.len() + state.pending_cash.len());

        log::trace!("Ledger cleanup before {} removed {} entries", cutoff, removed);
        removed
    }

    /// Drop history records whose trade date is strictly before `cutoff`
    pub fn prune_history(&self, cutoff: NaiveDate) -> usize {
        let mut state = self.lock();
        let before = state.history.len();
        state.history.retain(|r| r.trade_date >= cutoff);
        before - state.history.len()
    }

    /// Retention cleanup keeping `days_to_keep` days before `current`
    pub fn cleanup_older_than(&self, current: NaiveDate, days_to_keep: i64) -> Result<usize> {
        if days_to_keep < 0 {
            return Err(RulesError::invalid(format!(
                "days_to_keep must be non-negative, got {}",
                days_to_keep
            )));
        }
        let cutoff = current
            .checked_sub_days(Days::new(days_to_keep as u64))
            .unwrap_or(NaiveDate::MIN);
        Ok(self.cleanup(cutoff) + self.prune_history(cutoff))
    }

    pub fn history(&self) -> Vec<SettlementRecord> {
        self.lock().history.clone()
    }

    pub fn dump(&self) -> LedgerDump {
        let state = self.lock();
        let mut lots: BTreeMap<Symbol, BTreeMap<NaiveDate, Quantity>> = BTreeMap::new();
        for ((symbol, date), quantity) in &state.lots {
            lots.entry(symbol.clone()).or_default().insert(*date, *quantity);
        }
        LedgerDump {
            lots,
            pending_cash: state.pending_cash.clone(),
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.lock();
        let mut lots: BTreeMap<Symbol, Vec<(NaiveDate, Quantity)>> = BTreeMap::new();
        for ((symbol, date), quantity) in &state.lots {
            lots.entry(symbol.clone()).or_default().push((*date, *quantity));
        }
        LedgerSnapshot {
            lots,
            pending_cash: state.pending_cash.iter().map(|(d, a)| (*d, *a)).collect(),
            history: state.history.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot, coalescing duplicate dates
    pub fn restore(snapshot: LedgerSnapshot, currency: impl Into<String>) -> Result<Self> {
        let mut state = LedgerState::default();
        for (symbol, entries) in snapshot.lots {
            for (date, quantity) in entries {
                if !(quantity >= 0.0) {
                    return Err(RulesError::ParseError(format!(
                        "negative lot {} for {} on {}",
                        quantity, symbol, date
                    )));
                }
                *state.lots.entry((symbol.clone(), date)).or_insert(0.0) += quantity;
            }
        }
        for (date, amount) in snapshot.pending_cash {
            if !(amount >= 0.0) {
                return Err(RulesError::ParseError(format!(
                    "negative pending cash {} on {}",
                    amount, date
                )));
            }
            *state.pending_cash.entry(date).or_insert(0.0) += amount;
        }
        state.history = snapshot.history;

        Ok(Self {
            currency: currency.into(),
            state: Mutex::new(state),
        })
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.snapshot())?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>, currency: impl Into<String>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: LedgerSnapshot = serde_json::from_reader(reader)?;
        Self::restore(snapshot, currency)
    }

    /// Write the audit history as CSV, one record per line
    pub fn write_history_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for record in self.lock().history.iter() {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl SettlementPolicy for SettlementLedger {
    fn sellable_quantity(&self, symbol: &str, as_of: NaiveDate) -> Quantity {
        SettlementLedger::sellable_quantity(self, symbol, as_of)
    }
}
