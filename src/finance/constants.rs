//! A-share trading constants and defaults

use crate::types::{Cash, Percentage};

/// Minimum tradable unit (one "hand" = 100 shares)
pub const LOT_SIZE: u32 = 100;

/// Broker commission rate (0.03%)
pub const DEFAULT_COMMISSION_RATE: Percentage = 0.0003;

/// Minimum commission per trade
pub const DEFAULT_MIN_COMMISSION: Cash = 5.0;

/// Stamp duty rate, sell side only (0.1%)
pub const STAMP_DUTY_RATE: Percentage = 0.001;

/// Transfer fee rate, primary exchange only (0.002%)
pub const TRANSFER_FEE_RATE: Percentage = 0.00002;

/// Quoted prices carry two decimals (0.01 yuan tick)
pub const PRICE_DECIMALS: i32 = 2;

/// Daily limit for main-board stocks
pub const NORMAL_LIMIT_RATIO: Percentage = 0.10;

/// Daily limit for special-treatment (ST) stocks
pub const SPECIAL_TREATMENT_LIMIT_RATIO: Percentage = 0.05;

/// Daily limit for ChiNext / STAR market stocks
pub const GROWTH_BOARD_LIMIT_RATIO: Percentage = 0.20;

/// Ticker prefixes of the growth / innovation boards
pub const GROWTH_BOARD_PREFIXES: [&str; 3] = ["300", "301", "688"];

/// Settlement currency
pub const SETTLEMENT_CURRENCY: &str = "CNY";

/// Days of settlement history kept by default retention cleanup
pub const DEFAULT_HISTORY_RETENTION_DAYS: i64 = 30;

/// Trading days after listing during which no price band applies
pub const NEW_LISTING_UNLIMITED_DAYS: i64 = 5;
