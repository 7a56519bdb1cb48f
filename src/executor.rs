use crate::harvest::pipeline::{DocumentPipeline, HarvestResult, HarvestStats};
use crate::model::{AnalysisResult, DocumentTask};
use crate::traits::DocumentFetcher;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_WORKERS: usize = 50;

/// Counters for one executor run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub submitted: usize,
    pub analysed: usize,
    pub dropped: usize, // fetched, but no format for the extension
    pub failed: usize,  // fetch or analysis error
    /// Bytes downloaded for analysed documents
    pub bytes_fetched: u64,
    pub fetch_ms: u64,
    pub analysis_ms: u64,
}

impl RunStats {
    fn record(&mut self, harvest: &HarvestStats) {
        self.analysed += 1;
        self.bytes_fetched += harvest.size_bytes;
        self.fetch_ms += harvest.fetch_duration_ms;
        self.analysis_ms += harvest.analysis_duration_ms;
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<AnalysisResult>, // arrival order, not submission order
    pub stats: RunStats,
}

enum WorkerEvent {
    Analysed(Box<HarvestResult>),
    Dropped,
    Failed,
}

type TaskQueue = Arc<Mutex<mpsc::Receiver<DocumentTask>>>;

/// Fixed-size worker pool. Each worker pulls tasks off a shared queue until
/// it is closed and drained; results flow to a single collector.
pub struct HarvesterExecutor {
    workers: usize,
}

impl Default for HarvesterExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl HarvesterExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Sets the pool size; zero is raised to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    #[instrument(skip(self, pipeline, tasks), fields(workers = self.workers, documents = tasks.len()))]
    pub async fn execute<F>(
        &self,
        pipeline: Arc<DocumentPipeline<F>>,
        tasks: Vec<DocumentTask>,
    ) -> RunReport
    where
        F: DocumentFetcher + 'static,
    {
        let submitted = tasks.len();
        let (task_tx, task_rx) = mpsc::channel::<DocumentTask>(self.workers);
        let task_rx: TaskQueue = Arc::new(Mutex::new(task_rx));
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(self.workers);

        let collector = tokio::spawn(collect(event_rx));

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(worker(id, pipeline.clone(), task_rx.clone(), event_tx.clone()));
        }
        // the collector finishes once every worker has dropped its sender
        drop(event_tx);

        info!("Starting harvest of {} documents", submitted);
        for task in tasks {
            if task_tx.send(task).await.is_err() {
                warn!("All workers exited before the queue was drained");
                break;
            }
        }
        drop(task_tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Worker task aborted");
            }
        }

        let mut report = match collector.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Result collector aborted");
                RunReport::default()
            }
        };
        report.stats.submitted = submitted;

        info!(
            analysed = report.stats.analysed,
            dropped = report.stats.dropped,
            failed = report.stats.failed,
            bytes = report.stats.bytes_fetched,
            fetch_ms = report.stats.fetch_ms,
            analysis_ms = report.stats.analysis_ms,
            "Finished harvest"
        );
        report
    }
}

async fn worker<F>(
    id: usize,
    pipeline: Arc<DocumentPipeline<F>>,
    queue: TaskQueue,
    events: mpsc::Sender<WorkerEvent>,
) where
    F: DocumentFetcher + 'static,
{
    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        let event = match pipeline.execute(task).await {
            Ok(Some(harvest)) => WorkerEvent::Analysed(Box::new(harvest)),
            Ok(None) => WorkerEvent::Dropped,
            Err(e) => {
                pipeline.notifier().failure(&e);
                WorkerEvent::Failed
            }
        };

        if events.send(event).await.is_err() {
            break;
        }
    }
    debug!(worker = id, "Worker drained");
}

async fn collect(mut events: mpsc::Receiver<WorkerEvent>) -> RunReport {
    let mut report = RunReport::default();
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Analysed(harvest) => {
                let HarvestResult { analysis, stats } = *harvest;
                report.stats.record(&stats);
                report.results.push(analysis);
            }
            WorkerEvent::Dropped => report.stats.dropped += 1,
            WorkerEvent::Failed => report.stats.failed += 1,
        }
    }
    report
}
