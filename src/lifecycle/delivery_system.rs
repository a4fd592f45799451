use crate::clients::OrderStoreClient;
use crate::config::PipelineConfig;
use crate::desk::OrderDesk;
use crate::gateway::{CacheGateway, MemoryCache, PersistenceGateway};
use crate::pipeline::{self, PipelineContext, PipelineHandle};
use std::sync::Arc;
use tracing::info;

/// The runtime orchestrator for a delivery system.
///
/// `DeliverySystem` is responsible for:
/// - **Gateway wiring**: the in-memory order store actor and cache, or
///   whatever gateways the caller supplies
/// - **Pipeline startup**: the shared context and its dispatcher
/// - **Request entry**: the [`OrderDesk`] built on top of the pipeline
///
/// # Example
///
/// ```rust
/// use delivery_tracker::config::PipelineConfig;
/// use delivery_tracker::lifecycle::DeliverySystem;
/// use delivery_tracker::model::{Requester, UserId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), String> {
///     let system = DeliverySystem::new(PipelineConfig::default());
///     let placed = system
///         .desk
///         .place_order(Requester::customer(UserId(1)), "book")
///         .await
///         .map_err(|e| e.to_string())?;
///     system
///         .desk
///         .cancel_order(Requester::customer(UserId(1)), placed.order_id)
///         .await
///         .map_err(|e| e.to_string())?;
///     system.shutdown().await
/// }
/// ```
pub struct DeliverySystem {
    /// Place, cancel, list and track orders.
    pub desk: OrderDesk,

    pipeline: PipelineHandle,
}

impl DeliverySystem {
    /// Starts a self-contained system: an actor-owned order store and an
    /// in-process cache.
    pub fn new(config: PipelineConfig) -> Self {
        let (store_actor, store_client) = crate::order_store::new();
        // Detached: the actor exits once the last runner drops its client
        tokio::spawn(store_actor.run());

        Self::with_gateways(
            config,
            Arc::new(OrderStoreClient::new(store_client)),
            Arc::new(MemoryCache::new()),
        )
    }

    /// Starts the pipeline on caller-supplied gateways.
    pub fn with_gateways(
        config: PipelineConfig,
        persistence: Arc<dyn PersistenceGateway>,
        cache: Arc<dyn CacheGateway>,
    ) -> Self {
        let pipeline = pipeline::start(config, persistence, cache);
        let desk = OrderDesk::new(Arc::clone(pipeline.context()));
        Self { desk, pipeline }
    }

    /// Connects to Postgres and Redis using `config` and starts the pipeline
    /// on them.
    #[cfg(all(feature = "postgres", feature = "redis"))]
    pub async fn connect(
        config: &crate::config::AppConfig,
    ) -> Result<Self, crate::gateway::GatewayError> {
        let persistence =
            crate::gateway::postgres::PgOrderStore::connect(&config.database_url).await?;
        let cache = crate::gateway::redis::RedisCache::connect(&config.redis_addr).await?;
        Ok(Self::with_gateways(
            config.pipeline.clone(),
            Arc::new(persistence),
            Arc::new(cache),
        ))
    }

    pub fn pipeline(&self) -> &Arc<PipelineContext> {
        self.pipeline.context()
    }

    /// Stops admitting work and waits for the dispatcher to exit.
    ///
    /// Stage Runners already in flight are neither cancelled nor awaited.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down delivery system...");
        let in_flight = self.pipeline.context().active_runners();
        drop(self.desk);
        self.pipeline.shutdown().await?;
        info!(in_flight, "Delivery system shutdown complete.");
        Ok(())
    }
}
