use thiserror::Error;

/// Shared error taxonomy for the queue/idempotency/DB primitives that all
/// three services build on. Service-specific disposition enums (retry vs
/// DLQ vs skip) live in each binary and map onto these variants.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("missing required config: {0}")]
    MissingConfig(&'static str),

    #[error("invalid config value for {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
