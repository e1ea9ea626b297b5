//! # A-share Rules
//!
//! Trading rules of the China A-share market for backtests and simulated
//! brokers: round-lot sizing, daily price limits, the fee schedule and
//! T+1 settlement of shares and sale proceeds.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ashare_rules::prelude::*;
//! use chrono::{NaiveDate, Utc};
//! use std::sync::Arc;
//!
//! # fn main() -> ashare_rules::error::Result<()> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let clock = Arc::new(CalendarClock::new(ChinaCalendar::new(), start));
//! let account = Arc::new(AShareAccount::new(100_000.0, "CNY"));
//! let mut engine = RulesEngine::new(RulesConfig::default(), account, clock.clone())?;
//!
//! let security = Security::from_ticker("600519");
//! let order = Order::limit("600519", OrderSide::Buy, 100.0, 150.0, Utc::now());
//! let decision = engine.admit(&order, &security, 150.0)?;
//! if decision.accepted {
//!     engine.on_fill(&security, &Fill::new("600519", OrderSide::Buy, 100.0, 150.0, start))?;
//! }
//!
//! clock.advance()?;
//! engine.begin_session()?;
//! assert_eq!(engine.sellable_quantity("600519"), 100.0);
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod finance;
pub mod order;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::asset::{Security, ShareClassification, Venue};
    pub use crate::calendar::{CalendarClock, ChinaCalendar, TradingCalendar, TradingClock};
    pub use crate::config::RulesConfig;
    pub use crate::engine::{FillOutcome, RulesEngine};
    pub use crate::error::{Result, RulesError};
    pub use crate::finance::{
        AShareAccount, Account, AdmissionContext, AdmissionResult, CashAccount, CashSink,
        FeeBreakdown, FeeCalculator, FeeModel, OrderAdmissionPolicy, PriceLimitCalculator,
        RuleViolation, SettlementLedger, SettlementPolicy,
    };
    pub use crate::order::{Fill, Order, OrderSide, OrderType};
    pub use crate::types::*;
}
