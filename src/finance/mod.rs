//! Finance module - fees, price limits, settlement and order admission

pub mod account;
pub mod admission;
pub mod commission;
pub mod constants;
pub mod price_limit;
pub mod settlement;

pub use account::{AShareAccount, Account, CashAccount, CashSink, Holding, SettlementPolicy};
pub use admission::{AdmissionContext, AdmissionResult, OrderAdmissionPolicy, RuleViolation};
pub use commission::{FeeBreakdown, FeeCalculator, FeeConfig, FeeModel, ZeroFee};
pub use price_limit::{round_to_tick, PriceBand, PriceLimitCalculator};
pub use settlement::{
    Deduction, LedgerDump, LedgerSnapshot, SettlementLedger, SettlementOperation, SettlementRecord,
};
