pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::store::OrderStore;
use gateway::registry::BroadcastRegistry;
use orders_common::SnowflakeGenerator;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub config: Arc<Config>,
    pub snowflake: Arc<SnowflakeGenerator>,
    /// Live push connections on the order feed.
    pub registry: Arc<BroadcastRegistry>,
}

impl AppState {
    /// Build state around an order store with an empty connection registry.
    pub fn new(config: Config, store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            snowflake: Arc::new(SnowflakeGenerator::new(config.worker_id)),
            config: Arc::new(config),
            registry: Arc::new(BroadcastRegistry::new()),
        }
    }
}
