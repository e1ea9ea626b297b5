//! Proposed orders and execution fills

use crate::types::{Cash, OrderId, Price, Quantity, Symbol, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn is_sell(&self) -> bool {
        matches!(self, OrderSide::Sell)
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Market order - execute at current market price
    Market,
    /// Limit order - execute at specified price or better
    Limit,
    /// Stop order - trigger market order when price reached
    Stop,
    /// Stop-limit order - trigger limit order when price reached
    StopLimit,
}

/// Order proposed for admission
///
/// `quantity` is unsigned; direction comes from `side`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier
    pub id: OrderId,
    /// Ticker of the security to trade
    pub symbol: Symbol,
    /// Order side (buy/sell)
    pub side: OrderSide,
    /// Order type
    pub order_type: OrderType,
    /// Requested quantity
    pub quantity: Quantity,
    /// Limit price (for limit orders)
    pub limit_price: Option<Price>,
    /// Stop price (for stop orders)
    pub stop_price: Option<Price>,
    /// Creation timestamp
    pub created_at: Timestamp,
}

impl Order {
    fn build(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: OrderId::new_v4(),
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            limit_price,
            stop_price,
            created_at: timestamp,
        }
    }

    /// Create a new market order
    pub fn market(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> Self {
        Self::build(symbol, side, OrderType::Market, quantity, None, None, timestamp)
    }

    /// Create a new limit order
    pub fn limit(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self::build(
            symbol,
            side,
            OrderType::Limit,
            quantity,
            Some(limit_price),
            None,
            timestamp,
        )
    }

    /// Create a new stop order
    pub fn stop(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
        stop_price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self::build(
            symbol,
            side,
            OrderType::Stop,
            quantity,
            None,
            Some(stop_price),
            timestamp,
        )
    }

    /// Create a new stop-limit order
    pub fn stop_limit(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
        stop_price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self::build(
            symbol,
            side,
            OrderType::StopLimit,
            quantity,
            Some(limit_price),
            Some(stop_price),
            timestamp,
        )
    }

    /// Quantity signed by direction (negative for sells)
    pub fn signed_quantity(&self) -> Quantity {
        match self.side {
            OrderSide::Buy => self.quantity.abs(),
            OrderSide::Sell => -self.quantity.abs(),
        }
    }

    /// Limit and trigger prices carried by the order
    pub fn explicit_prices(&self) -> impl Iterator<Item = Price> {
        self.limit_price.into_iter().chain(self.stop_price)
    }

    /// Price used to value the order: limit, then stop, then the market price
    pub fn valuation_price(&self, market_price: Price) -> Price {
        self.limit_price.or(self.stop_price).unwrap_or(market_price)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order({:?}, {}, {:?}, {})",
            self.side, self.symbol, self.order_type, self.quantity
        )
    }
}

/// Execution report handed to the fill-time hooks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub price: Price,
    pub trade_date: NaiveDate,
}

impl Fill {
    pub fn new(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        trade_date: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price,
            trade_date,
        }
    }

    /// Gross traded value
    pub fn amount(&self) -> Cash {
        (self.quantity * self.price).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_market_order() {
        let order = Order::market("600000", OrderSide::Buy, 100.0, Utc::now());

        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.quantity, 100.0);
        assert_eq!(order.signed_quantity(), 100.0);
        assert_eq!(order.explicit_prices().count(), 0);
        assert_eq!(order.valuation_price(12.5), 12.5);
    }

    #[test]
    fn test_stop_limit_prices() {
        let order = Order::stop_limit("000001", OrderSide::Sell, 200.0, 9.8, 10.1, Utc::now());

        assert_eq!(order.signed_quantity(), -200.0);
        assert_eq!(order.explicit_prices().collect::<Vec<_>>(), vec![9.8, 10.1]);
        assert_eq!(order.valuation_price(10.0), 9.8);
    }

    #[test]
    fn test_fill_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let fill = Fill::new("600000", OrderSide::Sell, 300.0, 10.5, date);
        assert_eq!(fill.amount(), 3150.0);
    }
}
