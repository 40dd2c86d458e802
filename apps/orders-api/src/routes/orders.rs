//! Order CRUD endpoints. Successful creates and deletes are pushed to every
//! live connection on the order feed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::events::OrderEvent;
use crate::models::order::{CreateOrderRequest, Order};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{order_id}", get(get_order).delete(delete_order))
}

// ---------------------------------------------------------------------------
// POST /orders
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/orders",
    tag = "Orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
    ),
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let draft = body.validate().map_err(ApiError::validation)?;

    let order = draft.into_order(state.snowflake.generate(), Utc::now());
    let order = state.store.insert(order).await?;

    tracing::info!(
        order_id = order.id,
        symbol = %order.symbol,
        order_type = %order.order_type,
        "order created"
    );

    state.registry.publish(&OrderEvent::NewOrder(order.clone()));

    Ok((StatusCode::CREATED, Json(order)))
}

// ---------------------------------------------------------------------------
// GET /orders
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "All orders, oldest first", body = [Order]),
    ),
)]
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.store.list().await?;
    Ok(Json(orders))
}

// ---------------------------------------------------------------------------
// GET /orders/:order_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    tag = "Orders",
    params(
        ("order_id" = i64, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "The order", body = Order),
        (status = 404, description = "Not found", body = ApiErrorBody),
    ),
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .store
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// DELETE /orders/:order_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/orders/{order_id}",
    tag = "Orders",
    params(
        ("order_id" = i64, Path, description = "Order ID"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Not found", body = ApiErrorBody),
    ),
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete(order_id).await? {
        return Err(ApiError::not_found("Order not found"));
    }

    tracing::info!(order_id, "order deleted");

    state.registry.publish(&OrderEvent::DeleteOrder { id: order_id });

    Ok(StatusCode::NO_CONTENT)
}
