//! Account collaborators: holdings, spendable cash and settlement capability
//!
//! An account exposes an optional [`SettlementPolicy`]. Accounts without it
//! settle immediately, so everything held is sellable at once; A-share
//! accounts carry a T+1 [`SettlementLedger`] as their policy.

use crate::error::{Result, RulesError};
use crate::finance::settlement::SettlementLedger;
use crate::types::{Cash, Quantity, Symbol};
use chrono::NaiveDate;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Capability answering "how much of this symbol may be sold on this date"
pub trait SettlementPolicy: Send + Sync {
    fn sellable_quantity(&self, symbol: &str, as_of: NaiveDate) -> Quantity;
}

/// Destination for settled sale proceeds
pub trait CashSink: Send + Sync {
    fn credit_cash(&self, amount: Cash, currency: &str) -> Result<()>;
}

/// Account state consulted by order admission
pub trait Account: Send + Sync {
    /// Shares currently held
    fn position(&self, symbol: &str) -> Quantity;

    /// Cash available for new buys
    fn available_cash(&self) -> Cash;

    /// Settlement capability; `None` means immediate settlement
    fn settlement_policy(&self) -> Option<&dyn SettlementPolicy> {
        None
    }

    /// Sellable quantity, falling back to the full position without a policy
    fn sellable_quantity(&self, symbol: &str, as_of: NaiveDate) -> Quantity {
        match self.settlement_policy() {
            Some(policy) => policy.sellable_quantity(symbol, as_of),
            None => self.position(symbol),
        }
    }
}

/// Holding line for reporting displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub sellable: Quantity,
}

#[derive(Debug, Default)]
struct Book {
    cash: Cash,
    positions: HashMap<Symbol, Quantity>,
}

/// Cash account with immediate settlement
#[derive(Debug)]
pub struct CashAccount {
    currency: String,
    book: Mutex<Book>,
}

impl CashAccount {
    pub fn new(starting_cash: Cash, currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            book: Mutex::new(Book {
                cash: starting_cash,
                positions: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Spend cash on a buy (cost plus fees)
    pub fn debit_cash(&self, amount: Cash) -> Result<()> {
        if !(amount >= 0.0) {
            return Err(RulesError::invalid(format!(
                "debit must be non-negative, got {}",
                amount
            )));
        }
        self.lock().cash -= amount;
        Ok(())
    }

    /// Add (positive) or remove (negative) shares; flat positions are dropped
    pub fn adjust_position(&self, symbol: &str, delta: Quantity) {
        let mut book = self.lock();
        let position = book.positions.entry(symbol.to_string()).or_insert(0.0);
        *position += delta;
        if position.abs() < f64::EPSILON {
            book.positions.remove(symbol);
        }
    }

    pub fn positions(&self) -> Vec<(Symbol, Quantity)> {
        let mut positions: Vec<_> = self
            .lock()
            .positions
            .iter()
            .map(|(s, q)| (s.clone(), *q))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(&b.0));
        positions
    }

    /// Holdings with their sellable quantity as of `as_of`
    pub fn holdings(&self, as_of: NaiveDate) -> Vec<Holding> {
        holdings_of(self, self, as_of)
    }
}

impl Account for CashAccount {
    fn position(&self, symbol: &str) -> Quantity {
        self.lock().positions.get(symbol).copied().unwrap_or(0.0)
    }

    fn available_cash(&self) -> Cash {
        self.lock().cash
    }
}

impl CashSink for CashAccount {
    fn credit_cash(&self, amount: Cash, currency: &str) -> Result<()> {
        if currency != self.currency {
            return Err(RulesError::InvalidInput(format!(
                "cannot credit {} to a {} account",
                currency, self.currency
            )));
        }
        self.lock().cash += amount;
        Ok(())
    }
}

/// A-share account: cash book plus a T+1 settlement ledger
#[derive(Debug)]
pub struct AShareAccount {
    cash: CashAccount,
    ledger: Arc<SettlementLedger>,
}

impl AShareAccount {
    pub fn new(starting_cash: Cash, currency: impl Into<String>) -> Self {
        let currency = currency.into();
        Self {
            ledger: Arc::new(SettlementLedger::with_currency(currency.clone())),
            cash: CashAccount::new(starting_cash, currency),
        }
    }

    /// Attach an existing ledger (e.g. one restored from disk)
    pub fn with_ledger(starting_cash: Cash, ledger: Arc<SettlementLedger>) -> Self {
        Self {
            cash: CashAccount::new(starting_cash, ledger.currency().to_string()),
            ledger,
        }
    }

    pub fn ledger(&self) -> &Arc<SettlementLedger> {
        &self.ledger
    }

    pub fn cash_book(&self) -> &CashAccount {
        &self.cash
    }

    pub fn holdings(&self, as_of: NaiveDate) -> Vec<Holding> {
        holdings_of(&self.cash, self, as_of)
    }
}

impl Account for AShareAccount {
    fn position(&self, symbol: &str) -> Quantity {
        self.cash.position(symbol)
    }

    fn available_cash(&self) -> Cash {
        self.cash.available_cash()
    }

    fn settlement_policy(&self) -> Option<&dyn SettlementPolicy> {
        let policy: &dyn SettlementPolicy = &*self.ledger;
        Some(policy)
    }
}

impl CashSink for AShareAccount {
    fn credit_cash(&self, amount: Cash, currency: &str) -> Result<()> {
        self.cash.credit_cash(amount, currency)
    }
}

fn holdings_of(book: &CashAccount, account: &dyn Account, as_of: NaiveDate) -> Vec<Holding> {
    book.positions()
        .into_iter()
        .map(|(symbol, quantity)| Holding {
            sellable: account.sellable_quantity(&symbol, as_of),
            symbol,
            quantity,
        })
        .collect()
}
