//! Core types shared across the rules engine

use chrono::{DateTime, Utc};

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Ticker text identifying a tradable instrument (e.g. "600000")
pub type Symbol = String;

/// Price type (using f64 for precision)
pub type Price = f64;

/// Share quantity
pub type Quantity = f64;

/// Money in the settlement currency
pub type Cash = f64;

/// Percentage type (0.0 to 1.0)
pub type Percentage = f64;

/// Unique identifier for orders
pub type OrderId = uuid::Uuid;
