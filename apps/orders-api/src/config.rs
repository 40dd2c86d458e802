use orders_common::snowflake::MAX_WORKER_ID;

/// Orders API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When unset, orders live in memory only.
    pub database_url: Option<String>,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Worker ID mixed into snowflake order IDs (10 bits).
    pub worker_id: u16,
    /// Number of outbound messages buffered per push connection before new
    /// broadcasts are dropped for that connection.
    pub ws_outbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 8000,
            worker_id: 0,
            ws_outbox_capacity: 256,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// Panics if `WORKER_ID` is set but is not a valid 10-bit worker ID.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            port: parsed_var("PORT").unwrap_or(defaults.port),
            worker_id: std::env::var("WORKER_ID")
                .ok()
                .map(|v| worker_id(&v))
                .unwrap_or(defaults.worker_id),
            ws_outbox_capacity: parsed_var("WS_OUTBOX_CAPACITY")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.ws_outbox_capacity),
        }
    }
}

/// Parse a snowflake worker ID. Anything outside `0..=MAX_WORKER_ID` would be
/// masked onto another worker's bits, so it panics instead.
fn worker_id(value: &str) -> u16 {
    match value.trim().parse::<u16>() {
        Ok(id) if id <= MAX_WORKER_ID => id,
        _ => panic!("WORKER_ID must be an integer in 0..={MAX_WORKER_ID}, got {value:?}"),
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
