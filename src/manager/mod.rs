use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error, info};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::errors::{Error, Result};
use crate::models::{Asset, StationarityVerdict};
use crate::services::{ChartReport, ForecastReport, Pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    ShowChart,
    StationarityTest,
    Forecast,
    /// Periodic chart refresh; failures are logged, never notified.
    Refresh,
    Select(Asset),
}

#[derive(Debug)]
pub enum TaskOutput {
    Chart(ChartReport),
    Stationarity(Asset, StationarityVerdict),
    Forecast(ForecastReport),
    Selected(Asset),
}

#[derive(Debug)]
pub enum TaskResult {
    Success(TaskOutput),
    Failure(Error),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Info { title: String, message: String },
    Error { title: String, message: String },
}

impl Notification {
    pub fn info(title: &str, message: impl Into<String>) -> Self {
        Notification::Info {
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn error(err: &Error) -> Self {
        Notification::Error {
            title: err.title().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum Event {
    ChartUpdated(ChartReport),
    Notification(Notification),
}

/// The selection shared between user actions and the refresh cycle.
#[derive(Debug, Default)]
pub struct AppState {
    selection: RwLock<Asset>,
}

impl AppState {
    pub fn new(asset: Asset) -> Self {
        Self {
            selection: RwLock::new(asset),
        }
    }

    pub async fn selected(&self) -> Asset {
        *self.selection.read().await
    }

    pub async fn select(&self, asset: Asset) {
        *self.selection.write().await = asset;
    }
}

type Job = (Task, oneshot::Sender<Result<TaskOutput>>);

/// Serializes every analysis task onto one consumer, so a refresh and a user
/// action never interleave their writes to the chart or the CSV.
#[derive(Clone)]
pub struct TaskManager {
    tx: mpsc::Sender<Job>,
    state: Arc<AppState>,
}

impl TaskManager {
    pub fn new(pipeline: Pipeline, state: Arc<AppState>) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, mut rx) = mpsc::channel::<Job>(100);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let worker = TaskWorker {
            pipeline,
            state: state.clone(),
            events: event_tx,
        };

        tokio::spawn(async move {
            while let Some((task, result_tx)) = rx.recv().await {
                debug!("Received task: {:?}", task);
                match AssertUnwindSafe(worker.process(task)).catch_unwind().await {
                    Ok(result) => {
                        worker.publish(task, &result);
                        let _ = result_tx.send(result);
                    }
                    Err(_) => error!("Task {:?} panicked", task),
                }
            }
            debug!("Task queue closed");
        });

        (Self { tx, state }, event_rx)
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub async fn submit_task(&self, task: Task) -> TaskResult {
        let (result_tx, result_rx) = oneshot::channel();
        if self.tx.send((task, result_tx)).await.is_err() {
            return TaskResult::Unavailable;
        }
        match result_rx.await {
            Ok(Ok(output)) => TaskResult::Success(output),
            Ok(Err(e)) => TaskResult::Failure(e),
            Err(_) => TaskResult::Unavailable,
        }
    }

    pub async fn show_chart(&self) -> TaskResult {
        self.submit_task(Task::ShowChart).await
    }

    pub async fn test_stationarity(&self) -> TaskResult {
        self.submit_task(Task::StationarityTest).await
    }

    pub async fn forecast(&self) -> TaskResult {
        self.submit_task(Task::Forecast).await
    }

    pub async fn select(&self, asset: Asset) -> TaskResult {
        self.submit_task(Task::Select(asset)).await
    }
}

struct TaskWorker {
    pipeline: Pipeline,
    state: Arc<AppState>,
    events: mpsc::UnboundedSender<Event>,
}

impl TaskWorker {
    async fn process(&self, task: Task) -> Result<TaskOutput> {
        match task {
            Task::Select(asset) => {
                self.state.select(asset).await;
                info!("Selected {}", asset);
                Ok(TaskOutput::Selected(asset))
            }
            Task::ShowChart | Task::Refresh => {
                let asset = self.state.selected().await;
                Ok(TaskOutput::Chart(self.pipeline.chart(asset).await?))
            }
            Task::StationarityTest => {
                let asset = self.state.selected().await;
                let verdict = self.pipeline.stationarity(asset).await?;
                Ok(TaskOutput::Stationarity(asset, verdict))
            }
            Task::Forecast => {
                let asset = self.state.selected().await;
                Ok(TaskOutput::Forecast(self.pipeline.forecast(asset).await?))
            }
        }
    }

    fn publish(&self, task: Task, result: &Result<TaskOutput>) {
        let event = match result {
            Ok(TaskOutput::Chart(report)) => Event::ChartUpdated(report.clone()),
            Ok(TaskOutput::Stationarity(_, verdict)) => {
                Event::Notification(Notification::info("Stationarity Test", verdict.to_string()))
            }
            Ok(TaskOutput::Forecast(report)) => Event::Notification(Notification::info(
                "Saved",
                format!("Forecast saved to {}", report.csv_path.display()),
            )),
            Ok(TaskOutput::Selected(_)) => return,
            Err(e) if task == Task::Refresh => {
                error!("Auto-refresh error: {}", e);
                return;
            }
            Err(e) => {
                error!("{} failed: {}", e.title(), e);
                Event::Notification(Notification::error(e))
            }
        };
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::errors::FetchError;
    use crate::market_data::{FetchRequest, MarketDataSource, MarketSimulator};
    use crate::models::Candle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PanickingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataSource for PanickingSource {
        async fn fetch_candles(
            &self,
            _request: &FetchRequest,
        ) -> std::result::Result<Vec<Candle>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("source blew up");
        }
    }

    fn manager_with(
        source: Arc<dyn MarketDataSource>,
    ) -> (TaskManager, mpsc::UnboundedReceiver<Event>) {
        let config = AnalysisConfig {
            output_dir: std::env::temp_dir(),
            render_charts: false,
            ..Default::default()
        };
        let state = Arc::new(AppState::new(config.initial_asset));
        TaskManager::new(Pipeline::new(source, config), state)
    }

    #[tokio::test]
    async fn test_selection_applies_to_following_tasks() {
        let (manager, _events) = manager_with(Arc::new(MarketSimulator::new(2)));
        assert!(matches!(
            manager.select(Asset::BtcUsd).await,
            TaskResult::Success(TaskOutput::Selected(Asset::BtcUsd))
        ));
        assert_eq!(manager.state().selected().await, Asset::BtcUsd);

        match manager.show_chart().await {
            TaskResult::Success(TaskOutput::Chart(report)) => {
                assert_eq!(report.asset, Asset::BtcUsd)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tasks_run_in_submission_order() {
        let (manager, _events) = manager_with(Arc::new(MarketSimulator::new(2)));
        let (selected, charted) = tokio::join!(manager.select(Asset::BtcUsd), manager.show_chart());
        assert!(matches!(selected, TaskResult::Success(TaskOutput::Selected(Asset::BtcUsd))));
        match charted {
            TaskResult::Success(TaskOutput::Chart(report)) => {
                assert_eq!(report.asset, Asset::BtcUsd)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chart_emits_update_event() {
        let (manager, mut events) = manager_with(Arc::new(MarketSimulator::new(2)));
        manager.show_chart().await;
        match events.recv().await {
            Some(Event::ChartUpdated(report)) => assert_eq!(report.asset, Asset::EthUsd),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_notifies_user() {
        let (manager, mut events) = manager_with(Arc::new(MarketSimulator::new(2).with_bars(0)));
        match manager.test_stationarity().await {
            TaskResult::Failure(Error::Fetch(FetchError::Empty(symbol))) => {
                assert_eq!(symbol, "ETH-USD")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match events.recv().await {
            Some(Event::Notification(Notification::Error { title, .. })) => {
                assert_eq!(title, "Data Error")
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_is_silent() {
        let (manager, mut events) = manager_with(Arc::new(MarketSimulator::new(2).with_bars(0)));
        assert!(matches!(manager.submit_task(Task::Refresh).await, TaskResult::Failure(_)));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stationarity_notification() {
        let (manager, mut events) = manager_with(Arc::new(MarketSimulator::new(4)));
        manager.test_stationarity().await;
        match events.recv().await {
            Some(Event::Notification(Notification::Info { title, message })) => {
                assert_eq!(title, "Stationarity Test");
                assert!(message.contains("stationary"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_consumer_survives_panicking_task() {
        let source = Arc::new(PanickingSource {
            calls: AtomicUsize::new(0),
        });
        let (manager, _events) = manager_with(source.clone());
        assert!(matches!(manager.show_chart().await, TaskResult::Unavailable));
        assert!(matches!(manager.show_chart().await, TaskResult::Unavailable));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            manager.select(Asset::BtcUsd).await,
            TaskResult::Success(TaskOutput::Selected(_))
        ));
    }
}
