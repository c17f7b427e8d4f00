//! Shared progress record of the batch run
//!
//! The record lives behind an `RwLock`; every mutation rewrites the JSON
//! document atomically while the write lock is held, so readers and the
//! file always see whole snapshots. Mutations carry the generation of the
//! run that issued them and are dropped once a reset has moved on.

use crate::error::{ForecastError, Result};
use crate::utils::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Idle,
    Running,
    Finished,
    Error,
}

/// Snapshot of the batch run as written to the progress document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub status: BatchStatus,
    pub current: Option<String>,
    pub completed: Vec<String>,
    /// `"{segment}: {message}"`
    pub errors: Vec<String>,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self {
            status: BatchStatus::Idle,
            current: None,
            completed: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl BatchProgress {
    /// Add a completed segment, keeping order and skipping duplicates
    pub fn complete(&mut self, segment: &str) {
        if !self.completed.iter().any(|s| s == segment) {
            self.completed.push(segment.to_string());
        }
    }

    pub fn fail(&mut self, segment: &str, message: &str) {
        self.errors.push(format!("{}: {}", segment, message));
    }
}

#[derive(Debug)]
struct TrackerState {
    generation: u64,
    active: bool,
    progress: BatchProgress,
}

/// Progress record plus its persisted JSON document
#[derive(Debug)]
pub struct ProgressTracker {
    path: PathBuf,
    state: RwLock<TrackerState>,
}

impl ProgressTracker {
    /// Tracker backed by `path`; an existing document is loaded for reporting.
    /// A document that does not parse is replaced by an idle record on the next write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let progress = if path.is_file() {
            match serde_json::from_slice(&fs::read(&path)?) {
                Ok(progress) => progress,
                Err(err) => {
                    warn!(
                        "Ignoring unreadable progress document {}: {}",
                        path.display(),
                        err
                    );
                    BatchProgress::default()
                }
            }
        } else {
            BatchProgress::default()
        };
        Ok(Self {
            path,
            state: RwLock::new(TrackerState {
                generation: 0,
                active: false,
                progress,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> BatchProgress {
        match self.state.read() {
            Ok(state) => state.progress.clone(),
            Err(poisoned) => poisoned.into_inner().progress.clone(),
        }
    }

    /// Whether a run currently owns the record
    pub fn is_active(&self) -> bool {
        self.state.read().map(|s| s.active).unwrap_or(false)
    }

    /// Claim the record for a new run and return its generation
    pub fn begin_run(&self) -> Result<u64> {
        let mut state = self.write_state()?;
        if state.active {
            return Err(ForecastError::BatchAlreadyRunning);
        }
        state.generation += 1;
        state.active = true;
        state.progress = BatchProgress {
            status: BatchStatus::Running,
            ..BatchProgress::default()
        };
        self.persist(&state.progress)?;
        Ok(state.generation)
    }

    /// Apply `change` if `generation` is still current; returns whether it was applied
    pub fn update<F>(&self, generation: u64, change: F) -> Result<bool>
    where
        F: FnOnce(&mut BatchProgress),
    {
        let mut state = self.write_state()?;
        if state.generation != generation || !state.active {
            return Ok(false);
        }
        change(&mut state.progress);
        self.persist(&state.progress)?;
        Ok(true)
    }

    /// End the run with `status`, releasing the record
    pub fn finish(&self, generation: u64, status: BatchStatus) -> Result<bool> {
        let mut state = self.write_state()?;
        if state.generation != generation || !state.active {
            return Ok(false);
        }
        state.active = false;
        state.progress.status = status;
        state.progress.current = None;
        self.persist(&state.progress)?;
        Ok(true)
    }

    /// Back to idle; any in-flight run becomes stale
    pub fn reset(&self) -> Result<()> {
        let mut state = self.write_state()?;
        state.generation += 1;
        state.active = false;
        state.progress = BatchProgress::default();
        self.persist(&state.progress)
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, TrackerState>> {
        self.state
            .write()
            .map_err(|_| ForecastError::DataError("Progress lock poisoned".to_string()))
    }

    fn persist(&self, progress: &BatchProgress) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_vec_pretty(progress)?)
    }
}
