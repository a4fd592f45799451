use crate::framework::{RecordClient, StoreError};
use crate::gateway::{GatewayError, PersistenceGateway};
use crate::model::{Order, OrderCreate, OrderId, OrderPatch, Stage, UserId};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// [`PersistenceGateway`] over the in-memory order store actor.
///
/// Store plumbing failures (actor gone, reply dropped) surface as
/// [`GatewayError::Unavailable`]; refusals from the order rules surface as
/// [`GatewayError::Rejected`].
#[derive(Clone)]
pub struct OrderStoreClient {
    inner: RecordClient<Order>,
}

impl OrderStoreClient {
    pub fn new(inner: RecordClient<Order>) -> Self {
        Self { inner }
    }
}

fn map_store_error(order_id: Option<OrderId>, e: StoreError) -> GatewayError {
    match e {
        StoreError::Closed | StoreError::Dropped => GatewayError::Unavailable(e.to_string()),
        StoreError::NotFound(id) => match order_id {
            Some(order_id) => GatewayError::NotFound(order_id),
            None => GatewayError::Rejected(format!("record not found: {id}")),
        },
        StoreError::Rejected(reason) => GatewayError::Rejected(reason.to_string()),
    }
}

#[async_trait]
impl PersistenceGateway for OrderStoreClient {
    #[instrument(skip(self))]
    async fn create_order(&self, user_id: UserId, item: &str) -> Result<OrderId, GatewayError> {
        debug!("Sending insert");
        let params = OrderCreate {
            user_id,
            item: item.to_string(),
        };
        self.inner
            .insert(params)
            .await
            .map_err(|e| map_store_error(None, e))
    }

    #[instrument(skip(self))]
    async fn update_order_stage(
        &self,
        order_id: OrderId,
        stage: Stage,
    ) -> Result<(), GatewayError> {
        self.inner
            .patch(order_id, OrderPatch::Advance(stage))
            .await
            .map(|_| ())
            .map_err(|e| map_store_error(Some(order_id), e))
    }

    #[instrument(skip(self))]
    async fn get_order_owner(&self, order_id: OrderId) -> Result<UserId, GatewayError> {
        self.inner
            .fetch(order_id)
            .await
            .map_err(|e| map_store_error(Some(order_id), e))?
            .map(|order| order.user_id)
            .ok_or(GatewayError::NotFound(order_id))
    }

    #[instrument(skip(self))]
    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError> {
        self.inner
            .patch(order_id, OrderPatch::Cancel)
            .await
            .map(|_| ())
            .map_err(|e| map_store_error(Some(order_id), e))
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, GatewayError> {
        self.inner
            .fetch(order_id)
            .await
            .map_err(|e| map_store_error(Some(order_id), e))
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, GatewayError> {
        self.inner
            .scan(move |order| owner.map_or(true, |user_id| order.user_id == user_id))
            .await
            .map_err(|e| map_store_error(None, e))
    }
}
