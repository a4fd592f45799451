//! Dispatcher loop and the handle that stops it.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::queue::AdmissionReceiver;
use crate::pipeline::runner::StageRunner;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};

/// The single loop that turns admitted ids into Stage Runners.
///
/// Runners are spawned and never awaited. Stopping the dispatcher stops
/// admission only; runners already spawned keep going.
pub struct Dispatcher {
    context: Arc<PipelineContext>,
    receiver: AdmissionReceiver,
    shutdown: watch::Receiver<bool>,
    limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(
        context: Arc<PipelineContext>,
        receiver: AdmissionReceiver,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let limit = context
            .config()
            .max_concurrent_runners
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        Self {
            context,
            receiver,
            shutdown,
            limit,
        }
    }

    pub async fn run(mut self) {
        info!(
            capacity = self.context.queue().capacity(),
            limit = ?self.context.config().max_concurrent_runners,
            "Dispatcher started"
        );

        while let Some(order_id) = self.receiver.dequeue(&mut self.shutdown).await {
            let permit = match &self.limit {
                Some(semaphore) => {
                    let acquire = Arc::clone(semaphore).acquire_owned();
                    tokio::select! {
                        biased;
                        _ = self.shutdown.wait_for(|stop| *stop) => break,
                        permit = acquire => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => break,
                        },
                    }
                }
                None => None,
            };

            let active = self.context.runner_started();
            let runner = StageRunner::new(order_id, Arc::clone(&self.context));
            tokio::spawn(
                async move {
                    let _active = active;
                    let _permit = permit;
                    runner.run().await;
                }
                .instrument(info_span!("stage_runner", order_id = %order_id)),
            );
        }

        info!(
            active_runners = self.context.active_runners(),
            pending = self.context.queue().pending(),
            "Dispatcher stopped"
        );
    }
}

/// A running pipeline: its shared context plus the dispatcher task.
pub struct PipelineHandle {
    context: Arc<PipelineContext>,
    shutdown: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
}

impl PipelineHandle {
    pub(crate) fn spawn(context: Arc<PipelineContext>, receiver: AdmissionReceiver) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(Arc::clone(&context), receiver, shutdown_rx);
        let dispatcher = tokio::spawn(dispatcher.run());
        Self {
            context,
            shutdown,
            dispatcher,
        }
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.context
    }

    /// Stops the dispatcher and waits for it to exit. In-flight runners are
    /// left running.
    pub async fn shutdown(self) -> Result<(), String> {
        // send_replace never fails, even if the dispatcher already exited
        self.shutdown.send_replace(true);
        self.dispatcher
            .await
            .map_err(|e| format!("Dispatcher task failed: {:?}", e))
    }
}
