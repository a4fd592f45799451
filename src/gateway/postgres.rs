//! Postgres-backed [`PersistenceGateway`] (cargo feature `postgres`).
//!
//! Expects an existing `orders` table:
//!
//! ```sql
//! CREATE TABLE orders (
//!     id SERIAL PRIMARY KEY,
//!     user_id INTEGER REFERENCES users(id),
//!     item TEXT NOT NULL,
//!     status TEXT NOT NULL,
//!     cancelled BOOLEAN DEFAULT FALSE,
//!     created_at TIMESTAMP DEFAULT NOW()
//! );
//! ```
//!
//! Schema creation is left to the deployment.
//!
//! Stage writes are guarded in SQL the same way the in-memory store guards
//! them: the update only matches a row that is not cancelled and sits on the
//! previous stage.

use crate::gateway::{GatewayError, PersistenceGateway};
use crate::model::{Order, OrderId, Stage, UserId};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

const ORDER_COLUMNS: &str = "id, user_id, item, status, cancelled, created_at";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Opens a pool against `url` (10 connections, 5 minute lifetime).
    pub async fn connect(url: &str) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .max_lifetime(Duration::from_secs(300))
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(classify)?;
        info!("postgres connected");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(e: sqlx::Error) -> GatewayError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => GatewayError::Unavailable(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            GatewayError::Decode(e.to_string())
        }
        other => GatewayError::Rejected(other.to_string()),
    }
}

fn to_i32(order_id: OrderId) -> Result<i32, GatewayError> {
    i32::try_from(order_id.0).map_err(|_| GatewayError::NotFound(order_id))
}

fn order_from_row(row: &PgRow) -> Result<Order, GatewayError> {
    let id: i32 = row.try_get("id").map_err(classify)?;
    let user_id: i32 = row.try_get("user_id").map_err(classify)?;
    let status: String = row.try_get("status").map_err(classify)?;
    let created_at: NaiveDateTime = row.try_get("created_at").map_err(classify)?;
    Ok(Order {
        id: OrderId(id as u64),
        user_id: UserId(user_id as u64),
        item: row.try_get("item").map_err(classify)?,
        stage: status
            .parse::<Stage>()
            .map_err(|e| GatewayError::Decode(e.to_string()))?,
        cancelled: row.try_get("cancelled").map_err(classify)?,
        created_at: created_at.and_utc(),
    })
}

#[async_trait]
impl PersistenceGateway for PgOrderStore {
    async fn create_order(&self, user_id: UserId, item: &str) -> Result<OrderId, GatewayError> {
        let user_id = i32::try_from(user_id.0)
            .map_err(|_| GatewayError::Rejected(format!("user id out of range: {user_id}")))?;
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO orders (user_id, item, status) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(item)
        .bind(Stage::Created.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        Ok(OrderId(id as u64))
    }

    async fn update_order_stage(
        &self,
        order_id: OrderId,
        stage: Stage,
    ) -> Result<(), GatewayError> {
        let previous = stage
            .previous()
            .ok_or_else(|| GatewayError::Rejected(format!("{stage} is not a pipeline stage")))?;
        let result = sqlx::query(
            "UPDATE orders SET status = $1 WHERE id = $2 AND status = $3 AND cancelled = FALSE",
        )
        .bind(stage.as_str())
        .bind(to_i32(order_id)?)
        .bind(previous.as_str())
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::Rejected(format!(
                "order {order_id} cannot move to {stage}"
            )));
        }
        Ok(())
    }

    async fn get_order_owner(&self, order_id: OrderId) -> Result<UserId, GatewayError> {
        let owner: Option<(i32,)> = sqlx::query_as("SELECT user_id FROM orders WHERE id = $1")
            .bind(to_i32(order_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        owner
            .map(|(user_id,)| UserId(user_id as u64))
            .ok_or(GatewayError::NotFound(order_id))
    }

    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError> {
        let result = sqlx::query("UPDATE orders SET cancelled = TRUE WHERE id = $1")
            .bind(to_i32(order_id)?)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(order_id));
        }
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, GatewayError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(to_i32(order_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, GatewayError> {
        let rows = match owner {
            Some(user_id) => {
                let user_id = i32::try_from(user_id.0).map_err(|_| {
                    GatewayError::Rejected(format!("user id out of range: {user_id}"))
                })?;
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(classify)?;
        rows.iter().map(order_from_row).collect()
    }
}
