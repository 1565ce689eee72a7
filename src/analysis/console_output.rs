//! Progress reporting through `tracing`

use tracing::info;

use crate::analysis::traits::AnalysisPlugin;
use crate::engine::engine::EngineView;
use crate::error::EngineResult;
use crate::population::population::Population;

/// Logs the best fitness each step and the optimum at the end
///
/// Runs on the coordinator only. Output goes through `tracing`, so nothing
/// is shown unless the application installs a subscriber.
#[derive(Debug, Clone)]
pub struct ConsoleOutput {
    interval: usize,
    generations: usize,
}

impl ConsoleOutput {
    /// Report every generation
    pub fn new() -> Self {
        Self::with_interval(1)
    }

    /// Report every `interval` generations
    pub fn with_interval(interval: usize) -> Self {
        Self {
            interval,
            generations: 0,
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisPlugin for ConsoleOutput {
    fn name(&self) -> &str {
        "console_output"
    }

    fn interval(&self) -> usize {
        self.interval
    }

    fn master_only(&self) -> bool {
        true
    }

    fn setup(
        &mut self,
        generations: usize,
        population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        self.generations = generations;
        info!(
            generations,
            population_size = population.size(),
            chromosome_bits = population.encoding().total_bits(),
            participants = engine.world_size(),
            "starting evolution"
        );
        Ok(())
    }

    fn register_step(
        &mut self,
        generation: usize,
        _population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        info!(
            generation,
            generations = self.generations,
            best = engine.ori_fmax(),
            "generation"
        );
        Ok(())
    }

    fn finalize(&mut self, _population: &Population, engine: &EngineView<'_>) -> EngineResult<()> {
        if let Some(best) = engine.best_individual() {
            info!(
                solution = ?best.solution(),
                fitness = engine.ori_fmax(),
                "optimal solution"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::adapter::FitnessAdapter;
    use crate::fitness::normalization::{Direction, Normalization};
    use crate::genome::encoding::BinaryEncoding;
    use rand::SeedableRng;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_step_logs_structured_fields() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let encoding = BinaryEncoding::new(vec![(0.0, 2.0)], 0.01).unwrap();
        let population = Population::initialize(encoding, 4, &mut rng).unwrap();
        let raw: Vec<f64> = population.iter().map(|i| i.solution()[0]).collect();
        let mut fitness = FitnessAdapter::new(Direction::Maximize, Normalization::ShiftByMinimum).unwrap();
        fitness.update(&raw, 3);
        let normalized = fitness.normalize_all(&raw);
        let view = EngineView::new(&fitness, &population, &raw, &normalized, 3, 0, 1);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut output = ConsoleOutput::new();
        tracing::subscriber::with_default(subscriber, || {
            output.setup(10, &population, &view).unwrap();
            output.register_step(3, &population, &view).unwrap();
        });

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let step = logged
            .lines()
            .find(|line| line.contains("generation=3"))
            .unwrap();
        assert!(step.contains("generations=10"));
        assert!(step.contains(&format!("best={:?}", fitness.ori_fmax())));
    }
}
