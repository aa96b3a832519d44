use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, info, warn};
use rust_fsm::*;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::manager::{Task, TaskManager, TaskResult};

const MIN_PERIOD: Duration = Duration::from_millis(10);

state_machine! {
    #[derive(Debug)]
    pub refresh_cycle(Running)

    Running => {
        Tick => Running [Refresh],
        Shutdown => Stopped
    }
}

/// Requests a chart refresh every `period`. The first refresh fires one full
/// period after start. A failing or panicking refresh never stops the cycle.
pub struct RefreshScheduler {
    manager: TaskManager,
    period: Duration,
}

pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Periods shorter than 10ms are raised to 10ms.
    pub fn new(manager: TaskManager, period: Duration) -> Self {
        if period < MIN_PERIOD {
            warn!("Refresh period {:?} too short, using {:?}", period, MIN_PERIOD);
        }
        Self {
            manager,
            period: period.max(MIN_PERIOD),
        }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut machine = refresh_cycle::StateMachine::new();
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Auto-refresh every {:?}", self.period);

        loop {
            let input = tokio::select! {
                _ = &mut shutdown_rx => refresh_cycle::Input::Shutdown,
                _ = ticker.tick() => refresh_cycle::Input::Tick,
            };

            match machine.consume(&input) {
                Ok(Some(refresh_cycle::Output::Refresh)) => self.refresh().await,
                Ok(None) => {}
                Err(_) => error!("Scheduler input after stop ignored"),
            }

            if matches!(machine.state(), refresh_cycle::State::Stopped) {
                break;
            }
        }
        info!("Auto-refresh stopped");
    }

    async fn refresh(&self) {
        let outcome = AssertUnwindSafe(self.manager.submit_task(Task::Refresh))
            .catch_unwind()
            .await;
        match outcome {
            Ok(TaskResult::Success(_)) => debug!("Auto-refresh complete"),
            Ok(TaskResult::Failure(e)) => error!("Auto-refresh error: {}", e),
            Ok(TaskResult::Unavailable) => error!("Auto-refresh error: task did not complete"),
            Err(_) => error!("Auto-refresh error: refresh panicked"),
        }
    }
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Stops the cycle and waits for an in-flight refresh to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.join.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
    }
}
