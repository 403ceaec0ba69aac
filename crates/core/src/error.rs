use thiserror::Error;

use crate::task::ClientId;

/// Errors raised by the worker pool itself (never by task bodies).
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("queue of worker {worker} is full (capacity {capacity}), rejected task for client {client_id}")]
    QueueFull {
        worker: usize,
        capacity: usize,
        client_id: ClientId,
    },

    #[error("failed to spawn worker thread {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
}

pub type PoolResult<T> = Result<T, PoolError>;
