//! Order persistence behind a trait, so handlers don't care whether orders
//! live in PostgreSQL or in process memory.

use async_trait::async_trait;
use dashmap::DashMap;
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use crate::db::pool::DbPool;
use crate::db::schema::orders;
use crate::error::ApiError;
use crate::models::order::{NewOrderRow, Order, OrderRow};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a fully formed order and return it as stored.
    async fn insert(&self, order: Order) -> Result<Order, ApiError>;
    /// All orders, oldest (lowest ID) first.
    async fn list(&self) -> Result<Vec<Order>, ApiError>;
    async fn get(&self, id: i64) -> Result<Option<Order>, ApiError>;
    /// Returns `true` if an order was removed.
    async fn delete(&self, id: i64) -> Result<bool, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (no DATABASE_URL / tests)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<i64, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order, ApiError> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>, ApiError> {
        let mut list: Vec<Order> = self.orders.iter().map(|e| e.value().clone()).collect();
        list.sort_by_key(|o| o.id);
        Ok(list)
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, ApiError> {
        Ok(self.orders.get(&id).map(|e| e.value().clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, ApiError> {
        Ok(self.orders.remove(&id).is_some())
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL implementation
// ---------------------------------------------------------------------------

pub struct PgOrderStore {
    pool: DbPool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: Order) -> Result<Order, ApiError> {
        let mut conn = self.pool.get().await?;

        let row: OrderRow = diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(orders::table)
                .values(NewOrderRow::from(&order))
                .returning(OrderRow::as_returning()),
            &mut conn,
        )
        .await?;

        Order::try_from(row)
    }

    async fn list(&self) -> Result<Vec<Order>, ApiError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<OrderRow> = diesel_async::RunQueryDsl::load(
            orders::table
                .order(orders::id.asc())
                .select(OrderRow::as_select()),
            &mut conn,
        )
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, ApiError> {
        let mut conn = self.pool.get().await?;

        let row: Option<OrderRow> = diesel_async::RunQueryDsl::get_result(
            orders::table.find(id).select(OrderRow::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        row.map(Order::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel_async::RunQueryDsl::execute(
            diesel::delete(orders::table.find(id)),
            &mut conn,
        )
        .await?;

        Ok(deleted > 0)
    }
}
