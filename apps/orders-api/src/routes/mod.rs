pub mod health;
pub mod orders;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .merge(orders::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Orders
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::delete_order,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::order::Order,
            crate::models::order::OrderType,
            crate::models::order::CreateOrderRequest,
            // Route request/response types
            health::HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Orders", description = "Trade order management"),
    )
)]
pub struct ApiDoc;
