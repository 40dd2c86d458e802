use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::orders;
use crate::error::{ApiError, FieldError};

/// Side of a trade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Buy => "BUY",
            OrderType::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `"buy"`, `"Buy"` and `"BUY"` all parse.
impl FromStr for OrderType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("BUY") {
            Ok(OrderType::Buy)
        } else if s.eq_ignore_ascii_case("SELL") {
            Ok(OrderType::Sell)
        } else {
            Err(())
        }
    }
}

/// A persisted trade order, as returned by the API and carried in
/// `new_order` events.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub symbol: String,
    pub price: f64,
    pub quantity: i32,
    pub order_type: OrderType,
    pub timestamp: DateTime<Utc>,
}

/// Raw `orders` row. `order_type` is stored as text and checked on the way out.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = orders)]
pub struct OrderRow {
    pub id: i64,
    pub symbol: String,
    pub price: f64,
    pub quantity: i32,
    pub order_type: String,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ApiError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let order_type = row.order_type.parse().map_err(|_| {
            tracing::error!(order_id = row.id, order_type = %row.order_type, "corrupt order row");
            ApiError::internal("An internal error occurred")
        })?;
        Ok(Order {
            id: row.id,
            symbol: row.symbol,
            price: row.price,
            quantity: row.quantity,
            order_type,
            timestamp: row.timestamp,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow<'a> {
    pub id: i64,
    pub symbol: &'a str,
    pub price: f64,
    pub quantity: i32,
    pub order_type: &'a str,
    pub timestamp: DateTime<Utc>,
}

impl<'a> From<&'a Order> for NewOrderRow<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            id: order.id,
            symbol: &order.symbol,
            price: order.price,
            quantity: order.quantity,
            order_type: order.order_type.as_str(),
            timestamp: order.timestamp,
        }
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub symbol: String,
    pub price: f64,
    pub quantity: i32,
    /// `BUY` or `SELL`, any case.
    #[schema(example = "BUY")]
    pub order_type: String,
}

/// A create request that passed validation. The server still has to assign
/// an ID and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub symbol: String,
    pub price: f64,
    pub quantity: i32,
    pub order_type: OrderType,
}

impl OrderDraft {
    pub fn into_order(self, id: i64, timestamp: DateTime<Utc>) -> Order {
        Order {
            id,
            symbol: self.symbol,
            price: self.price,
            quantity: self.quantity,
            order_type: self.order_type,
            timestamp,
        }
    }
}

impl CreateOrderRequest {
    /// Check every field and report all failures at once.
    pub fn validate(self) -> Result<OrderDraft, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.price.is_nan() || self.price <= 0.0 {
            errors.push(FieldError::new("price", "Price must be positive"));
        }
        if self.quantity <= 0 {
            errors.push(FieldError::new("quantity", "Quantity must be positive"));
        }
        let order_type = match self.order_type.trim().parse::<OrderType>() {
            Ok(t) => Some(t),
            Err(()) => {
                errors.push(FieldError::new(
                    "order_type",
                    "Order type must be either BUY or SELL",
                ));
                None
            }
        };

        match order_type {
            Some(order_type) if errors.is_empty() => Ok(OrderDraft {
                symbol: self.symbol,
                price: self.price,
                quantity: self.quantity,
                order_type,
            }),
            _ => Err(errors),
        }
    }
}
