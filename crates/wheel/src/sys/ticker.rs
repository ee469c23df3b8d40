use crate::events::AppEvent;
use async_channel::Sender;
use roulette::{RunId, TickSource};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Delivers ticks into the app's event channel from a tokio task.
///
/// Aborting the task can race with a tick already queued in the channel; the
/// wheel drops such ticks because their run id is no longer scheduled.
pub struct TokioTicks {
    runtime: Handle,
    tx: Sender<AppEvent>,
    task: Option<JoinHandle<()>>,
}

impl TokioTicks {
    pub fn new(runtime: Handle, tx: Sender<AppEvent>) -> Self {
        Self {
            runtime,
            tx,
            task: None,
        }
    }
}

impl TickSource for TokioTicks {
    fn schedule(&mut self, run: RunId, interval: Duration) {
        self.cancel();

        let tx = self.tx.clone();
        self.task = Some(self.runtime.spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if tx.send(AppEvent::Tick(run)).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTicks {
    fn drop(&mut self) {
        self.cancel();
    }
}
