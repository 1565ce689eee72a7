//! One-Dimensional Sinusoid
//!
//! Finds the global maximum of f(x) = x + 10 sin(5x) + 7 cos(4x) on [0, 10]
//! with tournament selection, uniform crossover and bit-flip mutation.
//!
//! Run with `cargo run --example sinusoid_1d`.

use evo_engine::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut rng = StdRng::seed_from_u64(42);

    // 14 bits resolve [0, 10] to 0.001
    let encoding = BinaryEncoding::new(vec![(0.0, 10.0)], 0.001)?;
    let population = Population::initialize(encoding, 50, &mut rng)?;

    let store = FitnessStore::new();
    let history = store.history();

    let mut engine = EngineBuilder::new()
        .population(population)
        .selection(Selection::from(TournamentSelection::binary()))
        .crossover(UniformCrossover::new(0.8, 0.5)?)
        .mutation(Mutation::from(FlipBitMutation::new(0.1)?))
        .analysis(ConsoleOutput::with_interval(10))
        .analysis(store)
        .seed(42)
        .build()?;

    engine.fitness_register(|x| {
        let x = x[0];
        x + 10.0 * (5.0 * x).sin() + 7.0 * (4.0 * x).cos()
    })?;

    engine.run(100)?;

    if let Some(best) = history.last() {
        println!("Best x = {:.4}, f(x) = {:.4}", best.solution[0], best.ori_fmax);
    }
    println!("Recorded {} generations", history.len());

    Ok(())
}
