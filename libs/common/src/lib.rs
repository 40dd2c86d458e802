pub mod id;
pub mod snowflake;

pub use id::prefixed_ulid;
pub use snowflake::SnowflakeGenerator;
