//! # Order Desk
//!
//! The request-facing operations: place, cancel, list and track orders on
//! behalf of an already authenticated [`Requester`]. Each call talks to the
//! gateways and hands work to the pipeline through its two entry points.

use crate::gateway::GatewayError;
use crate::model::{Order, OrderId, Requester, Stage, UserId};
use crate::pipeline::{Admission, PipelineContext};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeskError {
    #[error("{requester} may not cancel order {order_id}")]
    Forbidden { requester: UserId, order_id: OrderId },

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl DeskError {
    fn from_gateway(order_id: OrderId, e: GatewayError) -> Self {
        match e {
            GatewayError::NotFound(_) => DeskError::NotFound(order_id),
            other => DeskError::Gateway(other),
        }
    }
}

/// A newly placed order and whether the pipeline took it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub order_id: OrderId,
    pub admission: Admission,
}

/// Where an order stands right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tracking {
    pub order_id: OrderId,
    pub stage: Stage,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct OrderDesk {
    pipeline: Arc<PipelineContext>,
}

impl OrderDesk {
    pub fn new(pipeline: Arc<PipelineContext>) -> Self {
        Self { pipeline }
    }

    /// Records the order at [`Stage::Created`] and enqueues it.
    #[instrument(skip(self, item), fields(user_id = %requester.user_id))]
    pub async fn place_order(
        &self,
        requester: Requester,
        item: &str,
    ) -> Result<Placement, DeskError> {
        let order_id = self
            .pipeline
            .persistence()
            .create_order(requester.user_id, item)
            .await?;
        let admission = self.pipeline.enqueue_order(order_id);
        info!(order_id = %order_id, ?admission, "Order placed");
        Ok(Placement {
            order_id,
            admission,
        })
    }

    /// Owners may cancel their own orders; admins may cancel any.
    #[instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn cancel_order(
        &self,
        requester: Requester,
        order_id: OrderId,
    ) -> Result<(), DeskError> {
        let persistence = self.pipeline.persistence();
        let owner = persistence
            .get_order_owner(order_id)
            .await
            .map_err(|e| DeskError::from_gateway(order_id, e))?;

        if owner != requester.user_id && !requester.is_admin() {
            warn!(order_id = %order_id, %owner, "Cancel refused");
            return Err(DeskError::Forbidden {
                requester: requester.user_id,
                order_id,
            });
        }

        persistence
            .mark_cancelled(order_id)
            .await
            .map_err(|e| DeskError::from_gateway(order_id, e))?;
        self.pipeline.signal_cancel(order_id).await;
        info!(order_id = %order_id, "Order cancelled");
        Ok(())
    }

    /// Own orders for customers, every order for admins. Newest first.
    #[instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn list_orders(&self, requester: Requester) -> Result<Vec<Order>, DeskError> {
        let owner = (!requester.is_admin()).then_some(requester.user_id);
        Ok(self.pipeline.persistence().list_orders(owner).await?)
    }

    /// Live stage from the cache, falling back to the durable record when the
    /// cache has nothing or cannot be read.
    #[instrument(skip(self))]
    pub async fn track(&self, order_id: OrderId) -> Result<Tracking, DeskError> {
        let live = match self.pipeline.cache().get_live_stage(order_id).await {
            Ok(stage) => stage,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Live stage unreadable");
                None
            }
        };

        let order = self
            .pipeline
            .persistence()
            .get_order(order_id)
            .await?
            .ok_or(DeskError::NotFound(order_id))?;

        let cancelled =
            order.cancelled || self.pipeline.registry().is_cancelled(order_id).await;
        Ok(Tracking {
            order_id,
            stage: live.unwrap_or(order.stage),
            cancelled,
        })
    }
}
