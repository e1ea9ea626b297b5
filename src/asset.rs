//! Security reference data and share classification

use crate::finance::constants::GROWTH_BOARD_PREFIXES;
use crate::types::Symbol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange on which a security is listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Shanghai Stock Exchange (primary venue, charges transfer fee)
    Shanghai,
    /// Shenzhen Stock Exchange
    Shenzhen,
    /// Beijing Stock Exchange
    Beijing,
}

impl Venue {
    /// Derive the venue from ticker text
    ///
    /// Shanghai codes start with `6`, Beijing codes with `4`, `8` or `92`;
    /// everything else is treated as Shenzhen.
    pub fn from_ticker(ticker: &str) -> Self {
        let ticker = ticker.trim();
        if ticker.starts_with('6') {
            Venue::Shanghai
        } else if ticker.starts_with('4') || ticker.starts_with('8') || ticker.starts_with("92") {
            Venue::Beijing
        } else {
            Venue::Shenzhen
        }
    }

    /// Whether this is the primary exchange (transfer fee applies)
    pub fn is_primary(&self) -> bool {
        matches!(self, Venue::Shanghai)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Venue::Shanghai => "SSE",
            Venue::Shenzhen => "SZSE",
            Venue::Beijing => "BSE",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price-limit classification of a share
///
/// Always recomputed from the ticker, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareClassification {
    Normal,
    SpecialTreatment,
    GrowthOrInnovationBoard,
}

impl ShareClassification {
    /// Classify ticker text
    ///
    /// Growth-board prefixes take precedence over an "ST" match.
    pub fn from_ticker(ticker: &str) -> Self {
        if GROWTH_BOARD_PREFIXES.iter().any(|p| ticker.starts_with(p)) {
            ShareClassification::GrowthOrInnovationBoard
        } else if ticker.to_ascii_uppercase().contains("ST") {
            ShareClassification::SpecialTreatment
        } else {
            ShareClassification::Normal
        }
    }

    /// Human-readable description including the daily limit
    pub fn description(&self) -> &str {
        match self {
            ShareClassification::Normal => "Main board (10% daily limit)",
            ShareClassification::SpecialTreatment => "Special treatment (5% daily limit)",
            ShareClassification::GrowthOrInnovationBoard => "ChiNext/STAR board (20% daily limit)",
        }
    }
}

impl fmt::Display for ShareClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Security as seen by the rules engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Security {
    /// Ticker text
    pub symbol: Symbol,
    /// Listing venue
    pub venue: Venue,
    /// Display name
    pub name: Option<String>,
    /// First trading day, if known
    pub listing_date: Option<NaiveDate>,
}

impl Security {
    /// Create a security with an explicit venue tag
    pub fn new(symbol: impl Into<Symbol>, venue: Venue) -> Self {
        Self {
            symbol: symbol.into(),
            venue,
            name: None,
            listing_date: None,
        }
    }

    /// Create a security, deriving the venue from the ticker
    pub fn from_ticker(symbol: impl Into<Symbol>) -> Self {
        let symbol = symbol.into();
        let venue = Venue::from_ticker(&symbol);
        Self::new(symbol, venue)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_listing_date(mut self, date: NaiveDate) -> Self {
        self.listing_date = Some(date);
        self
    }

    pub fn classification(&self) -> ShareClassification {
        ShareClassification::from_ticker(&self.symbol)
    }

    pub fn is_primary_exchange(&self) -> bool {
        self.venue.is_primary()
    }

    /// Whether the security is still inside its unlimited-price listing window
    pub fn is_new_listing(&self, current_date: NaiveDate, unlimited_days: i64) -> bool {
        self.listing_date
            .map(|listed| {
                let age = (current_date - listed).num_days();
                (0..unlimited_days).contains(&age)
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}
