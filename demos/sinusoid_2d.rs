//! Two-Dimensional Sinusoid
//!
//! Finds the global maximum of f(x, y) = y sin(2πx) + x cos(2πy) on
//! [-2, 2]². Big mutation occasionally inverts a block of the chromosome to
//! escape the many local optima of this surface.
//!
//! The evaluation is shared between two in-process participants connected
//! by a `LocalCluster`; only the coordinator reports progress.
//!
//! Run with `cargo run --example sinusoid_2d`.

use std::f64::consts::PI;
use std::thread;

use evo_engine::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const PARTICIPANTS: usize = 2;
const GENERATIONS: usize = 100;

fn objective(x: &[f64]) -> f64 {
    let (x, y) = (x[0], x[1]);
    y * (2.0 * PI * x).sin() + x * (2.0 * PI * y).cos()
}

fn participant(endpoint: LocalEndpoint) -> EngineResult<Option<(Vec<f64>, f64)>> {
    let mut rng = StdRng::seed_from_u64(7);
    let encoding = BinaryEncoding::new(vec![(-2.0, 2.0), (-2.0, 2.0)], 0.001)?;
    let population = Population::initialize(encoding, 50, &mut rng)?;

    let mut engine = EngineBuilder::new()
        .population(population)
        .selection(Selection::from(TournamentSelection::binary()))
        .crossover(UniformCrossover::new(0.8, 0.5)?)
        .mutation(Mutation::from(FlipBitBigMutation::new(0.1, 0.55, 0.6)?))
        .analysis(ConsoleOutput::with_interval(10))
        .elitism(true)
        .seed(7)
        .collective(endpoint)
        .build()?;

    engine.fitness_register(objective)?;
    engine.run(GENERATIONS)?;

    Ok(engine
        .is_coordinator()
        .then(|| engine.best_individual().map(|b| (b.solution().to_vec(), engine.ori_fmax())))
        .flatten())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let handles: Vec<_> = LocalCluster::new(PARTICIPANTS)
        .into_iter()
        .map(|endpoint| thread::spawn(move || participant(endpoint)))
        .collect();

    for handle in handles {
        let outcome = handle
            .join()
            .map_err(|_| "participant thread panicked")??;
        if let Some((solution, fitness)) = outcome {
            println!(
                "Best (x, y) = ({:.4}, {:.4}), f = {:.4}",
                solution[0], solution[1], fitness
            );
        }
    }

    Ok(())
}
