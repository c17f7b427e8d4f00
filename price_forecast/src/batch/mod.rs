//! Batch runs across every stored segment
//!
//! A run walks the segments in sorted order on one background thread,
//! analyzing each and training every configured variant. Failures inside a
//! segment are recorded and the run moves on; only failures of the run
//! itself (segment enumeration, results log) end it in `error`.

use crate::data::SegmentKey;
use crate::error::{ForecastError, Result};
use crate::models::ModelVariant;
use crate::pipeline::Pipeline;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{info, warn};

pub mod progress;
pub mod results;

pub use progress::{BatchProgress, BatchStatus, ProgressTracker};
pub use results::{ModelResultRow, ResultsLog};

/// Drives [`Pipeline`] over all segments and tracks progress
#[derive(Clone)]
pub struct BatchOrchestrator {
    pipeline: Arc<Pipeline>,
    tracker: Arc<ProgressTracker>,
    results: Arc<ResultsLog>,
    variants: Vec<ModelVariant>,
    cancel: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

/// Handle on a running batch
#[derive(Debug)]
pub struct BatchHandle {
    worker: JoinHandle<BatchProgress>,
    cancel: Arc<AtomicBool>,
}

impl BatchHandle {
    /// Stop after the segment in progress; the run still ends as finished
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and return the final progress snapshot
    pub fn join(self) -> Result<BatchProgress> {
        self.worker
            .join()
            .map_err(|_| ForecastError::DataError("Batch worker panicked".to_string()))
    }
}

impl BatchOrchestrator {
    /// Orchestrator with progress and results at the configured paths
    pub fn new(pipeline: Pipeline) -> Result<Self> {
        let storage = &pipeline.config().storage;
        let tracker = ProgressTracker::open(storage.progress_path())?;
        let results = ResultsLog::new(storage.results_path());
        let variants = pipeline.configured_variants()?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            tracker: Arc::new(tracker),
            results: Arc::new(results),
            variants,
            cancel: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_variants(mut self, variants: Vec<ModelVariant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn progress(&self) -> BatchProgress {
        self.tracker.snapshot()
    }

    /// Whether a run started by this orchestrator still owns the progress record
    pub fn is_running(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn results(&self) -> &ResultsLog {
        &self.results
    }

    /// Start a run on a background thread
    pub fn start(&self) -> Result<BatchHandle> {
        let (generation, cancel) = self.claim()?;
        let worker = {
            let orchestrator = self.clone();
            let cancel = Arc::clone(&cancel);
            thread::Builder::new()
                .name("fuelcast-batch".to_string())
                .spawn(move || orchestrator.run(generation, &cancel))?
        };
        Ok(BatchHandle { worker, cancel })
    }

    /// Run to completion on the calling thread
    pub fn run_blocking(&self) -> Result<BatchProgress> {
        let (generation, cancel) = self.claim()?;
        Ok(self.run(generation, &cancel))
    }

    /// Return the record to idle and cancel any run in flight
    pub fn reset_progress(&self) -> Result<()> {
        if let Ok(mut slot) = self.cancel.lock() {
            if let Some(flag) = slot.take() {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.tracker.reset()
    }

    fn claim(&self) -> Result<(u64, Arc<AtomicBool>)> {
        let generation = self.tracker.begin_run()?;
        let cancel = Arc::new(AtomicBool::new(false));
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = Some(Arc::clone(&cancel));
        }
        Ok((generation, cancel))
    }

    fn run(&self, generation: u64, cancel: &AtomicBool) -> BatchProgress {
        let status = match self.execute(generation, cancel) {
            Ok(()) => BatchStatus::Finished,
            Err(err) => {
                warn!("Batch run failed: {}", err);
                let message = err.to_string();
                if let Err(err) = self
                    .tracker
                    .update(generation, |p| p.errors.push(format!("batch: {}", message)))
                {
                    warn!("Could not record batch failure: {}", err);
                }
                BatchStatus::Error
            }
        };
        if let Err(err) = self.tracker.finish(generation, status) {
            warn!("Could not record end of batch run: {}", err);
        }
        self.tracker.snapshot()
    }

    fn execute(&self, generation: u64, cancel: &AtomicBool) -> Result<()> {
        self.results.ensure_header()?;
        let segments = self.pipeline.store().segments()?;
        info!("Batch run over {} segments", segments.len());

        for key in segments {
            if cancel.load(Ordering::SeqCst) {
                info!("Batch run cancelled");
                break;
            }
            let label = key.to_string();
            if !self
                .tracker
                .update(generation, |p| p.current = Some(label.clone()))?
            {
                break;
            }

            match self.process(&key) {
                Ok(rows) => {
                    for row in &rows {
                        self.results.append(row)?;
                    }
                    self.tracker.update(generation, |p| p.complete(&label))?;
                }
                Err(err) => {
                    warn!("Segment {} failed: {}", label, err);
                    let message = err.to_string();
                    self.tracker
                        .update(generation, |p| p.fail(&label, &message))?;
                }
            }
        }
        Ok(())
    }

    fn process(&self, key: &SegmentKey) -> Result<Vec<ModelResultRow>> {
        self.pipeline.analyze(key)?;

        let mut rows = Vec::with_capacity(self.variants.len());
        for variant in &self.variants {
            let started = Instant::now();
            let evaluation = self.pipeline.train(key, *variant)?;
            rows.push(ModelResultRow {
                province: key.province.clone(),
                product: key.product.clone(),
                model: variant.name().to_string(),
                mae: evaluation.metrics.mae,
                rmse: evaluation.metrics.rmse,
                elapsed: started.elapsed().as_secs_f64(),
            });
        }
        Ok(rows)
    }
}
