//! Best-fitness history
//!
//! [`FitnessStore`] records the best individual of every step into a
//! [`FitnessHistory`] handle that stays readable after the engine is gone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::traits::AnalysisPlugin;
use crate::engine::engine::EngineView;
use crate::error::EngineResult;
use crate::population::population::Population;

/// One recorded step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessRecord {
    /// Generation the record was taken at
    pub generation: usize,
    /// Raw objective value of the best individual
    pub ori_fmax: f64,
    /// Decoded solution of the best individual
    pub solution: Vec<f64>,
}

/// Shared, clonable view of recorded steps
#[derive(Debug, Clone, Default)]
pub struct FitnessHistory {
    records: Arc<Mutex<Vec<FitnessRecord>>>,
}

impl FitnessHistory {
    fn lock(&self) -> MutexGuard<'_, Vec<FitnessRecord>> {
        // Records are plain data; a panic mid-push cannot leave them inconsistent.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: FitnessRecord) {
        self.lock().push(record);
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<FitnessRecord> {
        self.lock().clone()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The last record, if any
    pub fn last(&self) -> Option<FitnessRecord> {
        self.lock().last().cloned()
    }
}

/// Records generation, best raw fitness and best solution at every step
///
/// Runs on the coordinator only.
#[derive(Debug, Clone)]
pub struct FitnessStore {
    interval: usize,
    history: FitnessHistory,
}

impl FitnessStore {
    /// Record every generation
    pub fn new() -> Self {
        Self::with_interval(1)
    }

    /// Record every `interval` generations
    pub fn with_interval(interval: usize) -> Self {
        Self {
            interval,
            history: FitnessHistory::default(),
        }
    }

    /// Handle to the records, valid after the plugin moved into an engine
    pub fn history(&self) -> FitnessHistory {
        self.history.clone()
    }
}

impl Default for FitnessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisPlugin for FitnessStore {
    fn name(&self) -> &str {
        "fitness_store"
    }

    fn interval(&self) -> usize {
        self.interval
    }

    fn master_only(&self) -> bool {
        true
    }

    fn register_step(
        &mut self,
        generation: usize,
        _population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        if let Some(best) = engine.best_individual() {
            self.history.push(FitnessRecord {
                generation,
                ori_fmax: engine.ori_fmax(),
                solution: best.solution().to_vec(),
            });
        }
        Ok(())
    }

    fn finalize(&mut self, _population: &Population, _engine: &EngineView<'_>) -> EngineResult<()> {
        debug!(records = self.history.len(), "fitness history complete");
        Ok(())
    }
}
