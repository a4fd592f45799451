//! Demo: two customers place orders, one cancels, the other waits for
//! delivery.
//!
//! Set `DELIVERY_STAGE_DELAY_MS` to shorten the run. Built with both the
//! `postgres` and `redis` features, the demo connects to `DATABASE_URL` and
//! `REDIS_ADDR` instead of the in-memory stores.

use delivery_tracker::config::AppConfig;
use delivery_tracker::lifecycle::{setup_tracing, DeliverySystem};
use delivery_tracker::model::{Requester, Stage, UserId};
use std::time::Duration;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    let delay = config.pipeline.stage_delay();
    info!(delay_ms = config.pipeline.stage_delay_ms, "Starting delivery system");

    let system = start_system(config).await?;
    let alice = Requester::customer(UserId(1));
    let bob = Requester::customer(UserId(2));

    let span = tracing::info_span!("order_placement");
    let (bicycle, umbrella) = async {
        let bicycle = system.desk.place_order(alice, "bicycle").await?;
        let umbrella = system.desk.place_order(bob, "umbrella").await?;
        Ok::<_, delivery_tracker::desk::DeskError>((bicycle.order_id, umbrella.order_id))
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    // Let the first stage land, then cancel Bob's order
    tokio::time::sleep(delay + delay / 2).await;
    system
        .desk
        .cancel_order(bob, umbrella)
        .await
        .map_err(|e| e.to_string())?;

    loop {
        let tracking = system.desk.track(bicycle).await.map_err(|e| e.to_string())?;
        if tracking.stage == Stage::Delivered {
            break;
        }
        tokio::time::sleep(delay / 2).await;
    }

    let orders = system
        .desk
        .list_orders(Requester::admin(UserId(0)))
        .await
        .map_err(|e| e.to_string())?;
    for order in &orders {
        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            item = %order.item,
            stage = %order.stage,
            cancelled = order.cancelled,
            "Final state"
        );
    }

    // Give Bob's runner time to observe the cancel before exiting
    tokio::time::sleep(delay + Duration::from_millis(50)).await;
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}

/// Runs on Postgres and Redis when both backends are compiled in, otherwise
/// on the in-memory stores.
#[cfg(all(feature = "postgres", feature = "redis"))]
async fn start_system(config: AppConfig) -> Result<DeliverySystem, String> {
    DeliverySystem::connect(&config)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(not(all(feature = "postgres", feature = "redis")))]
async fn start_system(config: AppConfig) -> Result<DeliverySystem, String> {
    Ok(DeliverySystem::new(config.pipeline))
}
