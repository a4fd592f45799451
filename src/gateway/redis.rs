//! Redis-backed [`CacheGateway`] (cargo feature `redis`).
//!
//! Keys follow [`keys`]; values are plain strings with no expiry.

use crate::gateway::{keys, CacheGateway, GatewayError};
use crate::model::{OrderId, Stage};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;

pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    /// Connects to `addr` (`host:port` or a full `redis://` URL) and pings it.
    pub async fn connect(addr: &str) -> Result<Self, GatewayError> {
        let url = connection_url(addr);
        let client = redis::Client::open(url.as_str()).map_err(unavailable)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;
        info!(%addr, "redis connected");
        Ok(Self { connection })
    }
}

/// Accepts a bare `host:port` or a full `redis://` / `rediss://` URL.
fn connection_url(addr: &str) -> String {
    if addr.starts_with("redis://") || addr.starts_with("rediss://") {
        addr.to_string()
    } else {
        format!("redis://{addr}")
    }
}

fn unavailable(e: redis::RedisError) -> GatewayError {
    GatewayError::Unavailable(e.to_string())
}

#[async_trait]
impl CacheGateway for RedisCache {
    async fn set_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError> {
        let mut con = self.connection.clone();
        con.set::<_, _, ()>(keys::cancelled(order_id), keys::CANCELLED_FLAG)
            .await
            .map_err(unavailable)
    }

    async fn get_cancelled(&self, order_id: OrderId) -> Result<bool, GatewayError> {
        let mut con = self.connection.clone();
        let value: Option<String> = con
            .get(keys::cancelled(order_id))
            .await
            .map_err(unavailable)?;
        Ok(value.as_deref() == Some(keys::CANCELLED_FLAG))
    }

    async fn set_live_stage(&self, order_id: OrderId, stage: Stage) -> Result<(), GatewayError> {
        let mut con = self.connection.clone();
        con.set::<_, _, ()>(keys::status(order_id), stage.as_str())
            .await
            .map_err(unavailable)
    }

    async fn get_live_stage(&self, order_id: OrderId) -> Result<Option<Stage>, GatewayError> {
        let mut con = self.connection.clone();
        let value: Option<String> = con.get(keys::status(order_id)).await.map_err(unavailable)?;
        value
            .map(|v| v.parse::<Stage>().map_err(|e| GatewayError::Decode(e.to_string())))
            .transpose()
    }
}
