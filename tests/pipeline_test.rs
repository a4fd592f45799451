use delivery_tracker::clients::OrderStoreClient;
use delivery_tracker::config::{FailurePolicy, PipelineConfig};
use delivery_tracker::gateway::mock::{MockCache, MockPersistence};
use delivery_tracker::gateway::{CacheGateway, GatewayError, PersistenceGateway};
use delivery_tracker::lifecycle::DeliverySystem;
use delivery_tracker::model::{OrderId, Stage, UserId};
use delivery_tracker::order_store;
use delivery_tracker::pipeline::Admission;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const D: Duration = Duration::from_secs(5);
const EPSILON: Duration = Duration::from_millis(100);

struct Fixture {
    system: DeliverySystem,
    persistence: MockPersistence,
    cache: MockCache,
}

impl Fixture {
    fn new(config: PipelineConfig) -> Self {
        let (actor, client) = order_store::new();
        tokio::spawn(actor.run());
        let persistence = MockPersistence::wrap(Arc::new(OrderStoreClient::new(client)));
        let cache = MockCache::new();
        let system = DeliverySystem::with_gateways(
            config,
            Arc::new(persistence.clone()),
            Arc::new(cache.clone()),
        );
        Self {
            system,
            persistence,
            cache,
        }
    }

    async fn create(&self, user: u64) -> OrderId {
        self.persistence
            .create_order(UserId(user), "parcel")
            .await
            .expect("create order")
    }

    async fn stage_of(&self, id: OrderId) -> Stage {
        self.persistence
            .get_order(id)
            .await
            .expect("get order")
            .expect("order exists")
            .stage
    }
}

/// Enqueue, let the first stage land, cancel, and nothing further is written.
#[tokio::test(start_paused = true)]
async fn test_cancel_after_first_stage_freezes_progress() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    assert_eq!(f.system.pipeline().enqueue_order(id), Admission::Accepted);

    sleep(D + EPSILON).await;
    assert_eq!(f.persistence.persisted_stages(id), vec![Stage::Dispatched]);
    assert_eq!(f.cache.published_stages(id), vec![Stage::Dispatched]);

    f.system.pipeline().signal_cancel(id).await;
    sleep(D).await;

    assert_eq!(f.persistence.persisted_stages(id), vec![Stage::Dispatched]);
    assert_eq!(f.stage_of(id).await, Stage::Dispatched);
    assert_eq!(f.system.pipeline().active_runners(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_right_after_enqueue_persists_nothing() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    let _ = f.system.pipeline().enqueue_order(id);
    f.system.pipeline().signal_cancel(id).await;

    sleep(D * 2).await;

    assert!(f.persistence.stage_writes().is_empty());
    assert_eq!(f.stage_of(id).await, Stage::Created);
    assert!(f.cache.published_stages(id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_cancels_land_in_both_tiers() {
    let f = Fixture::new(PipelineConfig::default());
    let id = OrderId(3);
    let pipeline = f.system.pipeline();

    tokio::join!(pipeline.signal_cancel(id), pipeline.signal_cancel(id));

    assert!(pipeline.registry().is_cancelled_locally(id));
    assert!(f.cache.backing().get_cancelled(id).await.unwrap());
    assert_eq!(f.cache.backing().raw("order:3:cancelled").as_deref(), Some("1"));
    assert_eq!(pipeline.registry().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_uncancelled_order_is_delivered() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    let _ = f.system.pipeline().enqueue_order(id);

    sleep(D * 3 + EPSILON).await;

    assert_eq!(f.persistence.persisted_stages(id), Stage::PIPELINE.to_vec());
    assert_eq!(f.cache.published_stages(id), Stage::PIPELINE.to_vec());
    assert_eq!(
        f.cache.get_live_stage(id).await.unwrap(),
        Some(Stage::Delivered)
    );
}

#[tokio::test(start_paused = true)]
async fn test_overflow_is_dropped_and_never_advances() {
    let capacity = 3;
    let f = Fixture::new(PipelineConfig::default().with_queue_capacity(capacity));
    let mut ids = Vec::new();
    for _ in 0..=capacity {
        ids.push(f.create(1).await);
    }

    // No await between enqueues, so the dispatcher cannot drain in between
    let pipeline = f.system.pipeline();
    let admissions: Vec<Admission> = ids.iter().map(|id| pipeline.enqueue_order(*id)).collect();
    assert_eq!(&admissions[..capacity], &[Admission::Accepted; 3]);
    assert_eq!(admissions[capacity], Admission::Dropped);
    assert_eq!(pipeline.queue().dropped(), 1);

    sleep(D * 3 + EPSILON).await;

    for id in &ids[..capacity] {
        assert_eq!(f.stage_of(*id).await, Stage::Delivered);
    }
    let dropped = ids[capacity];
    assert_eq!(f.stage_of(dropped).await, Stage::Created);
    assert!(f.persistence.persisted_stages(dropped).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_persisted_stages_are_always_a_prefix() {
    let f = Fixture::new(PipelineConfig::default());
    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(f.create(1).await);
    }
    for id in &ids {
        let _ = f.system.pipeline().enqueue_order(*id);
    }

    // Cancel one order every 2.5 s, the last never
    for id in &ids[..5] {
        sleep(D / 2).await;
        f.system.pipeline().signal_cancel(*id).await;
    }
    sleep(D * 3).await;

    for id in &ids {
        let stages = f.persistence.persisted_stages(*id);
        assert!(
            Stage::PIPELINE.starts_with(&stages),
            "order {id} persisted {stages:?}"
        );
    }
    assert!(f.persistence.persisted_stages(ids[0]).is_empty());
    assert_eq!(f.persistence.persisted_stages(ids[5]), Stage::PIPELINE.to_vec());
    // Signals alone never make the store refuse a write
    assert!(f.persistence.stage_writes().iter().all(|w| w.result.is_ok()));
}

#[tokio::test(start_paused = true)]
async fn test_signal_cancel_is_idempotent() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    let _ = f.system.pipeline().enqueue_order(id);

    sleep(D + EPSILON).await;
    for _ in 0..3 {
        f.system.pipeline().signal_cancel(id).await;
    }
    sleep(D * 2).await;

    assert_eq!(f.persistence.persisted_stages(id), vec![Stage::Dispatched]);
    assert_eq!(f.system.pipeline().registry().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_from_another_process_is_observed() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    let _ = f.system.pipeline().enqueue_order(id);

    sleep(D + EPSILON).await;
    // Written straight to the shared store, bypassing this registry
    f.cache.backing().set_cancelled(id).await.unwrap();
    sleep(D * 2).await;

    assert_eq!(f.persistence.persisted_stages(id), vec![Stage::Dispatched]);
    assert!(f.system.pipeline().registry().is_cancelled_locally(id));
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_cancel_flag_fails_open() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    f.cache.backing().set_cancelled(id).await.unwrap();
    f.cache.fail_reads(true);

    let _ = f.system.pipeline().enqueue_order(id);
    sleep(D * 3 + EPSILON).await;

    assert_eq!(f.persistence.persisted_stages(id), Stage::PIPELINE.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_write_failures_do_not_stop_the_pipeline() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    f.cache.fail_writes(true);
    f.persistence
        .fail_next_stage_write(GatewayError::Unavailable("connection reset".into()));

    let _ = f.system.pipeline().enqueue_order(id);
    sleep(D * 3 + EPSILON).await;

    let writes = f.persistence.stage_writes();
    let attempted: Vec<Stage> = writes.iter().map(|w| w.stage).collect();
    assert_eq!(attempted, Stage::PIPELINE.to_vec());
    assert!(matches!(writes[0].result, Err(GatewayError::Unavailable(_))));
    assert!(f.cache.published_stages(id).is_empty());
    assert_eq!(f.system.pipeline().active_runners(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_halt_policy_stops_on_fatal_write() {
    let config = PipelineConfig::default().with_failure_policy(FailurePolicy::Halt);
    let f = Fixture::new(config);
    let id = f.create(1).await;
    f.persistence
        .fail_next_stage_write(GatewayError::Rejected("check constraint".into()));

    let _ = f.system.pipeline().enqueue_order(id);
    sleep(D * 3 + EPSILON).await;

    assert_eq!(f.persistence.stage_writes().len(), 1);
    assert_eq!(f.stage_of(id).await, Stage::Created);
    assert_eq!(f.system.pipeline().active_runners(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellable_delay_releases_runner_early() {
    let config = PipelineConfig::default().with_cancellable_delay(true);
    let f = Fixture::new(config);
    let id = f.create(1).await;
    let _ = f.system.pipeline().enqueue_order(id);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(f.system.pipeline().active_runners(), 1);
    f.system.pipeline().signal_cancel(id).await;
    sleep(EPSILON).await;

    assert_eq!(f.system.pipeline().active_runners(), 0);
    assert!(f.persistence.stage_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_holds_runner_until_check_point() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    let _ = f.system.pipeline().enqueue_order(id);

    sleep(Duration::from_secs(1)).await;
    f.system.pipeline().signal_cancel(id).await;
    sleep(EPSILON).await;
    assert_eq!(f.system.pipeline().active_runners(), 1);

    sleep(D).await;
    assert_eq!(f.system.pipeline().active_runners(), 0);
    assert!(f.persistence.stage_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_caps_active_runners() {
    let config = PipelineConfig::default().with_max_concurrent_runners(2);
    let f = Fixture::new(config);
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(f.create(1).await);
    }
    for id in &ids {
        let _ = f.system.pipeline().enqueue_order(*id);
    }

    sleep(EPSILON).await;
    assert_eq!(f.system.pipeline().active_runners(), 2);

    sleep(D * 3).await;
    assert_eq!(f.system.pipeline().active_runners(), 2);
    assert_eq!(f.stage_of(ids[0]).await, Stage::Delivered);
    assert_eq!(f.stage_of(ids[1]).await, Stage::Delivered);
    assert_eq!(f.stage_of(ids[4]).await, Stage::Created);

    sleep(D * 6).await;
    assert_eq!(f.system.pipeline().active_runners(), 0);
    for id in &ids {
        assert_eq!(f.stage_of(*id).await, Stage::Delivered);
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_admission_but_not_runners() {
    let f = Fixture::new(PipelineConfig::default());
    let id = f.create(1).await;
    let late = f.create(1).await;
    let pipeline = Arc::clone(f.system.pipeline());
    let _ = pipeline.enqueue_order(id);

    sleep(EPSILON).await;
    f.system.shutdown().await.unwrap();
    assert_eq!(pipeline.enqueue_order(late), Admission::Dropped);

    sleep(D * 3).await;
    assert_eq!(f.persistence.persisted_stages(id), Stage::PIPELINE.to_vec());
    assert!(f.persistence.persisted_stages(late).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_waiting_for_runner_slot() {
    let config = PipelineConfig::default().with_max_concurrent_runners(1);
    let f = Fixture::new(config);
    let first = f.create(1).await;
    let second = f.create(1).await;
    let pipeline = Arc::clone(f.system.pipeline());
    let _ = pipeline.enqueue_order(first);
    let _ = pipeline.enqueue_order(second);

    sleep(EPSILON).await;
    assert_eq!(pipeline.active_runners(), 1);

    // The dispatcher is parked on the permit for `second`
    let started = tokio::time::Instant::now();
    f.system.shutdown().await.unwrap();
    assert!(started.elapsed() < EPSILON);
    assert_eq!(pipeline.active_runners(), 1);

    sleep(D * 6).await;
    assert_eq!(f.persistence.persisted_stages(first), Stage::PIPELINE.to_vec());
    assert!(f.persistence.persisted_stages(second).is_empty());
    let second_order = f.persistence.get_order(second).await.unwrap().unwrap();
    assert_eq!(second_order.stage, Stage::Created);
    assert_eq!(pipeline.active_runners(), 0);
}
