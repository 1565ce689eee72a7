//! Evolution engine
//!
//! This module implements the generational loop: selection, crossover and
//! mutation produce the next population on the coordinator, every
//! participant evaluates its share of it, and analysis plugins observe the
//! result.

use std::ops::Range;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::analysis::traits::{AnalysisPlugin, PluginSlot};
use crate::distributed::{split_range, Collective, CollectiveExt, SingleProcess, COORDINATOR_RANK};
use crate::engine::config::EngineConfig;
use crate::error::{CommError, ConfigError, EngineError, EngineResult, ObjectiveError, StateError};
use crate::fitness::adapter::FitnessAdapter;
use crate::fitness::normalization::{Direction, Normalization};
use crate::genome::bit_string::BitString;
use crate::operators::traits::{CrossoverOperator, MutationOperator, SelectionOperator};
use crate::population::individual::Individual;
use crate::population::population::{best_of, worst_of, Population};

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Built, objective and plugins may still be registered
    Initialized,
    /// Inside the generation loop
    Running {
        /// Generation being produced
        generation: usize,
    },
    /// Finalizing plugins after the last generation
    Finalizing,
    /// The run completed
    Done,
    /// The run aborted with an error
    Failed,
}

/// Builder for [`Engine`]
pub struct EngineBuilder<S, C, M, Comm> {
    config: EngineConfig,
    population: Option<Population>,
    selection: Option<S>,
    crossover: Option<C>,
    mutation: Option<M>,
    analysis: Vec<Box<dyn AnalysisPlugin>>,
    collective: Comm,
}

impl EngineBuilder<(), (), (), SingleProcess> {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            population: None,
            selection: None,
            crossover: None,
            mutation: None,
            analysis: Vec::new(),
            collective: SingleProcess,
        }
    }
}

impl Default for EngineBuilder<(), (), (), SingleProcess> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C, M, Comm> EngineBuilder<S, C, M, Comm> {
    /// Set the initial population
    pub fn population(mut self, population: Population) -> Self {
        self.population = Some(population);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the operator RNG
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Enable or disable elitism
    pub fn elitism(mut self, enabled: bool) -> Self {
        self.config.elitism = enabled;
        self
    }

    /// Minimize the objective instead of maximizing it
    pub fn minimize(mut self) -> Self {
        self.config.direction = Direction::Minimize;
        self
    }

    /// Set the fitness normalization
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.config.normalization = normalization;
        self
    }

    /// Attach an analysis plugin; may be called repeatedly
    pub fn analysis<P>(mut self, plugin: P) -> Self
    where
        P: AnalysisPlugin + 'static,
    {
        self.analysis.push(Box::new(plugin));
        self
    }

    /// Set the selection operator
    pub fn selection<NewS>(self, selection: NewS) -> EngineBuilder<NewS, C, M, Comm>
    where
        NewS: SelectionOperator,
    {
        EngineBuilder {
            config: self.config,
            population: self.population,
            selection: Some(selection),
            crossover: self.crossover,
            mutation: self.mutation,
            analysis: self.analysis,
            collective: self.collective,
        }
    }

    /// Set the crossover operator
    pub fn crossover<NewC>(self, crossover: NewC) -> EngineBuilder<S, NewC, M, Comm>
    where
        NewC: CrossoverOperator,
    {
        EngineBuilder {
            config: self.config,
            population: self.population,
            selection: self.selection,
            crossover: Some(crossover),
            mutation: self.mutation,
            analysis: self.analysis,
            collective: self.collective,
        }
    }

    /// Set the mutation operator
    pub fn mutation<NewM>(self, mutation: NewM) -> EngineBuilder<S, C, NewM, Comm>
    where
        NewM: MutationOperator,
    {
        EngineBuilder {
            config: self.config,
            population: self.population,
            selection: self.selection,
            crossover: self.crossover,
            mutation: Some(mutation),
            analysis: self.analysis,
            collective: self.collective,
        }
    }

    /// Run as one participant of a distributed job
    pub fn collective<NewComm>(self, collective: NewComm) -> EngineBuilder<S, C, M, NewComm>
    where
        NewComm: Collective,
    {
        EngineBuilder {
            config: self.config,
            population: self.population,
            selection: self.selection,
            crossover: self.crossover,
            mutation: self.mutation,
            analysis: self.analysis,
            collective,
        }
    }
}

impl<S, C, M, Comm> EngineBuilder<S, C, M, Comm>
where
    S: SelectionOperator,
    C: CrossoverOperator,
    M: MutationOperator,
    Comm: Collective,
{
    /// Validate everything and build the engine
    pub fn build(self) -> Result<Engine<S, C, M, Comm>, ConfigError> {
        self.config.validate()?;

        let population = self.population.ok_or(ConfigError::Missing("population"))?;
        if population.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }
        let selection = self.selection.ok_or(ConfigError::Missing("selection operator"))?;
        let crossover = self.crossover.ok_or(ConfigError::Missing("crossover operator"))?;
        let mutation = self.mutation.ok_or(ConfigError::Missing("mutation operator"))?;

        let fitness = FitnessAdapter::new(self.config.direction, self.config.normalization)?;
        let is_coordinator = self.collective.is_coordinator();
        let plugins = self
            .analysis
            .into_iter()
            .map(|plugin| PluginSlot::new(plugin, is_coordinator))
            .collect::<Result<Vec<_>, _>>()?;

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Engine {
            config: self.config,
            population,
            selection,
            crossover,
            mutation,
            fitness,
            plugins,
            collective: self.collective,
            rng,
            state: EngineState::Initialized,
            generation: 0,
            raw_fitness: Vec::new(),
            normalized: Vec::new(),
        })
    }
}

/// Generational evolution engine
///
/// Engines are single-use: after [`Engine::run`] returns, every further call
/// fails with a [`StateError`]. In a distributed job every participant
/// builds an engine from the same template and population size, registers
/// the same objective and calls `run` with the same generation count.
pub struct Engine<S, C, M, Comm = SingleProcess> {
    config: EngineConfig,
    population: Population,
    selection: S,
    crossover: C,
    mutation: M,
    fitness: FitnessAdapter,
    plugins: Vec<PluginSlot>,
    collective: Comm,
    rng: StdRng,
    state: EngineState,
    generation: usize,
    raw_fitness: Vec<f64>,
    normalized: Vec<f64>,
}

impl<S, C, M, Comm> Engine<S, C, M, Comm>
where
    S: SelectionOperator,
    C: CrossoverOperator,
    M: MutationOperator,
    Comm: Collective,
{
    /// Register the objective: decoded solution in, raw score out
    pub fn fitness_register<F>(&mut self, objective: F) -> EngineResult<()>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.ensure_registration_open()?;
        Ok(self.fitness.register(objective)?)
    }

    /// Register a fallible objective; its errors abort the run unchanged
    pub fn try_fitness_register<F, E>(&mut self, objective: F) -> EngineResult<()>
    where
        F: Fn(&[f64]) -> Result<f64, E> + Send + Sync + 'static,
        E: Into<ObjectiveError>,
    {
        self.ensure_registration_open()?;
        Ok(self.fitness.try_register(objective)?)
    }

    /// Attach an analysis plugin before the run
    pub fn analysis_register<P>(&mut self, plugin: P) -> EngineResult<()>
    where
        P: AnalysisPlugin + 'static,
    {
        self.ensure_registration_open()?;
        let slot = PluginSlot::new(Box::new(plugin), self.collective.is_coordinator())?;
        self.plugins.push(slot);
        Ok(())
    }

    fn ensure_registration_open(&self) -> Result<(), StateError> {
        match self.state {
            EngineState::Initialized => Ok(()),
            _ => Err(StateError::RegistrationClosed),
        }
    }

    /// Evolve for `generations` generations, then finalize every plugin
    ///
    /// Returns only once the engine is done. Any error aborts the run on
    /// every participant and leaves the engine in [`EngineState::Failed`].
    #[instrument(skip(self), fields(rank = self.collective.rank()))]
    pub fn run(&mut self, generations: usize) -> EngineResult<()> {
        match self.state {
            EngineState::Initialized => {}
            EngineState::Failed => return Err(StateError::Aborted.into()),
            _ => return Err(StateError::AlreadyRun.into()),
        }

        let result = self.run_generations(generations);
        match &result {
            Ok(()) => {
                self.state = EngineState::Done;
                info!(
                    generations,
                    ori_fmax = self.fitness.ori_fmax(),
                    "evolution finished"
                );
            }
            Err(err) => {
                self.state = EngineState::Failed;
                warn!(error = %err, "evolution aborted");
            }
        }
        result
    }

    fn run_generations(&mut self, generations: usize) -> EngineResult<()> {
        // All participants agree on readiness before any payload is exchanged.
        let ready = if self.fitness.is_registered() {
            Ok(())
        } else {
            Err(ConfigError::MissingObjective.into())
        };
        self.agree(ready)?;

        info!(
            generations,
            population_size = self.population.size(),
            participants = self.collective.size(),
            "evolution started"
        );

        self.state = EngineState::Running { generation: 0 };
        let initial = self
            .collective
            .is_coordinator()
            .then(|| Ok(self.population.clone()));
        let (population, raw) = self.evaluate(initial)?;
        self.install(population, raw, 0);
        debug!(
            ori_fmax = self.fitness.ori_fmax(),
            ori_fmin = self.fitness.ori_fmin(),
            "initial population evaluated"
        );

        let setup = self.start_plugins(generations);
        self.agree(setup)?;

        for generation in 0..generations {
            self.state = EngineState::Running { generation };

            let candidate = self.collective.is_coordinator().then(|| self.breed());
            let (population, raw) = self.evaluate(candidate)?;
            self.install(population, raw, generation);
            debug!(
                generation,
                ori_fmax = self.fitness.ori_fmax(),
                ori_fmin = self.fitness.ori_fmin(),
                "generation evaluated"
            );

            let stepped = self.step_plugins(generation);
            self.agree(stepped)?;
        }

        self.state = EngineState::Finalizing;
        let finalized = self.finalize_plugins();
        self.agree(finalized)
    }

    // Selection, crossover, mutation and elitism; coordinator only.
    fn breed(&mut self) -> EngineResult<Population> {
        let selected = self
            .selection
            .select(&self.population, &self.normalized, &mut self.rng)?;
        let crossed = self.crossover.cross_population(&selected, &mut self.rng)?;
        let mut next = self.mutation.mutate_population(crossed, &mut self.rng);

        if self.config.elitism {
            if let Some(best) = self.best_index() {
                let encoding = Arc::clone(next.encoding());
                let mut individuals = next.into_individuals();
                if let Some(first) = individuals.first_mut() {
                    *first = self.population[best].clone();
                }
                next = Population::with_template(encoding, individuals);
            }
        }
        Ok(next)
    }

    fn install(&mut self, population: Population, raw: Vec<f64>, generation: usize) {
        self.fitness.update(&raw, generation);
        self.normalized = self.fitness.normalize_all(&raw);
        self.raw_fitness = raw;
        self.population = population;
        self.generation = generation;
    }

    fn start_plugins(&mut self, generations: usize) -> EngineResult<()> {
        let view = EngineView::new(
            &self.fitness,
            &self.population,
            &self.raw_fitness,
            &self.normalized,
            self.generation,
            self.collective.rank(),
            self.collective.size(),
        );
        self.plugins
            .iter_mut()
            .try_for_each(|slot| slot.start(generations, &self.population, &view))
    }

    fn step_plugins(&mut self, generation: usize) -> EngineResult<()> {
        let view = EngineView::new(
            &self.fitness,
            &self.population,
            &self.raw_fitness,
            &self.normalized,
            generation,
            self.collective.rank(),
            self.collective.size(),
        );
        self.plugins
            .iter_mut()
            .try_for_each(|slot| slot.step(generation, &self.population, &view).map(|_| ()))
    }

    // Every plugin is finalized even if an earlier one fails.
    fn finalize_plugins(&mut self) -> EngineResult<()> {
        let view = EngineView::new(
            &self.fitness,
            &self.population,
            &self.raw_fitness,
            &self.normalized,
            self.generation,
            self.collective.rank(),
            self.collective.size(),
        );
        let mut outcome = Ok(());
        for slot in self.plugins.iter_mut() {
            let finished = slot.finish(&self.population, &view);
            if outcome.is_ok() {
                outcome = finished;
            }
        }
        outcome
    }

    /// Evaluate a population on every participant
    ///
    /// The coordinator passes the candidate (or the error that prevented
    /// producing one); workers pass `None`. On success every participant
    /// returns the same population and raw fitness vector.
    fn evaluate(
        &mut self,
        candidate: Option<EngineResult<Population>>,
    ) -> EngineResult<(Population, Vec<f64>)> {
        if self.collective.size() == 1 {
            let population = candidate.unwrap_or_else(|| Ok(self.population.clone()))?;
            let raw = self.fitness.evaluate_all(population.individuals())?;
            return Ok((population, raw));
        }

        let rank = self.collective.rank();

        // Broadcast the chromosomes, or the coordinator's failure.
        let mut failure = None;
        let announcement: Option<Result<Vec<BitString>, String>> = candidate.map(|c| match c {
            Ok(population) => Ok(population.iter().map(|i| i.chromosome().clone()).collect()),
            Err(err) => {
                let message = err.to_string();
                failure = Some(err);
                Err(message)
            }
        });
        let received: Result<Vec<BitString>, String> =
            self.collective.broadcast_value(announcement.as_ref())?;
        let chromosomes = match received {
            Ok(chromosomes) => chromosomes,
            Err(message) => {
                return Err(failure.unwrap_or(EngineError::Remote {
                    rank: COORDINATOR_RANK,
                    message,
                }))
            }
        };
        let expected = chromosomes.len();

        // Scatter contiguous work ranges.
        let ranges = self
            .collective
            .is_coordinator()
            .then(|| split_range(expected, self.collective.size()));
        let range: Range<usize> = self.collective.scatter_values(ranges.as_deref())?;

        let evaluated = self
            .rebuild(chromosomes)
            .and_then(|population| {
                let share = population.individuals().get(range.clone()).ok_or_else(|| {
                    CommError::Protocol(format!("work range {range:?} out of bounds"))
                })?;
                let values = self.fitness.evaluate_all(share)?;
                Ok((population, values))
            });

        // f64 travels as raw bits so every participant sees identical values.
        let (report, kept): (Result<Vec<u64>, String>, EngineResult<Population>) = match evaluated {
            Ok((population, values)) => (
                Ok(values.iter().map(|v| v.to_bits()).collect()),
                Ok(population),
            ),
            Err(err) => (Err(err.to_string()), Err(err)),
        };

        let reports = self.collective.gather_value(&report)?;
        let verdict = reports.map(|reports| {
            merge_reports(reports).and_then(|chunks| {
                let values: Vec<u64> = chunks.into_iter().flatten().collect();
                if values.len() == expected {
                    Ok(values)
                } else {
                    Err((
                        COORDINATOR_RANK,
                        format!("gathered {} fitness values for {expected} individuals", values.len()),
                    ))
                }
            })
        });
        let verdict: Result<Vec<u64>, (usize, String)> =
            self.collective.broadcast_value(verdict.as_ref())?;

        match (verdict, kept) {
            (Ok(bits), Ok(population)) => {
                Ok((population, bits.into_iter().map(f64::from_bits).collect()))
            }
            (Err((failed, _)), Err(err)) if failed == rank => Err(err),
            (Err((failed, message)), _) => {
                warn!(failed_rank = failed, %message, "participant failed");
                Err(EngineError::Remote {
                    rank: failed,
                    message,
                })
            }
            // A local failure always produces a failing verdict.
            (Ok(_), Err(err)) => Err(err),
        }
    }

    fn rebuild(&self, chromosomes: Vec<BitString>) -> EngineResult<Population> {
        let encoding = Arc::clone(self.population.encoding());
        let individuals = chromosomes
            .into_iter()
            .map(|bits| Individual::from_chromosome(Arc::clone(&encoding), bits))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Population::with_template(encoding, individuals))
    }

    /// Turn a local outcome into a job-wide one
    ///
    /// The participant that failed gets its own error back; all others get
    /// [`EngineError::Remote`]. A no-op for a single process.
    fn agree(&mut self, local: EngineResult<()>) -> EngineResult<()> {
        if self.collective.size() == 1 {
            return local;
        }

        let report: Result<(), String> = local.as_ref().map(|_| ()).map_err(ToString::to_string);
        let reports = self.collective.gather_value(&report)?;
        let verdict = reports.map(|reports| merge_reports(reports).map(|_| ()));
        let verdict: Result<(), (usize, String)> = self.collective.broadcast_value(verdict.as_ref())?;

        match verdict {
            Ok(()) => local,
            Err((failed, _)) if failed == self.collective.rank() && local.is_err() => local,
            Err((failed, message)) => {
                warn!(failed_rank = failed, %message, "participant failed");
                Err(EngineError::Remote {
                    rank: failed,
                    message,
                })
            }
        }
    }
}

impl<S, C, M, Comm> Engine<S, C, M, Comm>
where
    Comm: Collective,
{
    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current population
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The fitness adapter
    pub fn fitness(&self) -> &FitnessAdapter {
        &self.fitness
    }

    /// Registered plugins and their lifecycle state
    pub fn plugins(&self) -> &[PluginSlot] {
        &self.plugins
    }

    /// Last evaluated generation
    pub fn current_generation(&self) -> usize {
        self.generation
    }

    /// Raw objective values of the current population
    pub fn raw_fitness(&self) -> &[f64] {
        &self.raw_fitness
    }

    /// Selection weights of the current population
    pub fn normalized_fitness(&self) -> &[f64] {
        &self.normalized
    }

    /// Raw value of the best individual of the current generation
    pub fn ori_fmax(&self) -> f64 {
        self.fitness.ori_fmax()
    }

    /// Raw value of the worst individual of the current generation
    pub fn ori_fmin(&self) -> f64 {
        self.fitness.ori_fmin()
    }

    /// Index of the best individual of the current generation
    pub fn best_index(&self) -> Option<usize> {
        self.view().best_index()
    }

    /// The best individual of the current generation
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best_index().map(|i| &self.population[i])
    }

    /// This participant's rank
    pub fn rank(&self) -> usize {
        self.collective.rank()
    }

    /// Whether this participant is the coordinator
    pub fn is_coordinator(&self) -> bool {
        self.collective.is_coordinator()
    }

    /// Read-only snapshot of the engine state
    pub fn view(&self) -> EngineView<'_> {
        EngineView::new(
            &self.fitness,
            &self.population,
            &self.raw_fitness,
            &self.normalized,
            self.generation,
            self.collective.rank(),
            self.collective.size(),
        )
    }
}

impl<S, C, M, Comm> std::fmt::Debug for Engine<S, C, M, Comm>
where
    Comm: Collective,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("population_size", &self.population.size())
            .field("rank", &self.collective.rank())
            .field("fitness", &self.fitness)
            .field("plugins", &self.plugins)
            .finish()
    }
}

// First failure by rank, or every participant's payload in rank order.
fn merge_reports<T>(reports: Vec<Result<T, String>>) -> Result<Vec<T>, (usize, String)> {
    reports
        .into_iter()
        .enumerate()
        .map(|(rank, report)| report.map_err(|message| (rank, message)))
        .collect()
}

/// Read-only view of the engine handed to analysis plugins
#[derive(Debug, Clone, Copy)]
pub struct EngineView<'a> {
    fitness: &'a FitnessAdapter,
    population: &'a Population,
    raw: &'a [f64],
    normalized: &'a [f64],
    generation: usize,
    rank: usize,
    world_size: usize,
}

impl<'a> EngineView<'a> {
    pub(crate) fn new(
        fitness: &'a FitnessAdapter,
        population: &'a Population,
        raw: &'a [f64],
        normalized: &'a [f64],
        generation: usize,
        rank: usize,
        world_size: usize,
    ) -> Self {
        Self {
            fitness,
            population,
            raw,
            normalized,
            generation,
            rank,
            world_size,
        }
    }

    /// Raw value of the best individual
    pub fn ori_fmax(&self) -> f64 {
        self.fitness.ori_fmax()
    }

    /// Raw value of the worst individual
    pub fn ori_fmin(&self) -> f64 {
        self.fitness.ori_fmin()
    }

    /// Mean raw value
    pub fn ori_fmean(&self) -> f64 {
        self.fitness.ori_fmean()
    }

    /// Highest selection weight
    pub fn fmax(&self) -> f64 {
        best_of(self.normalized).map_or(f64::NAN, |i| self.normalized[i])
    }

    /// Lowest selection weight
    pub fn fmin(&self) -> f64 {
        worst_of(self.normalized).map_or(f64::NAN, |i| self.normalized[i])
    }

    /// Mean selection weight
    pub fn fmean(&self) -> f64 {
        if self.normalized.is_empty() {
            return f64::NAN;
        }
        self.normalized.iter().sum::<f64>() / self.normalized.len() as f64
    }

    /// Index of the first best individual
    pub fn best_index(&self) -> Option<usize> {
        let scores: Vec<f64> = self.raw.iter().map(|&r| self.fitness.score(r)).collect();
        best_of(&scores)
    }

    /// The first best individual
    pub fn best_individual(&self) -> Option<&'a Individual> {
        self.best_index().and_then(|i| self.population.get(i))
    }

    /// Raw objective values, in population order
    pub fn raw_fitness(&self) -> &'a [f64] {
        self.raw
    }

    /// Selection weights, in population order
    pub fn normalized_fitness(&self) -> &'a [f64] {
        self.normalized
    }

    /// Optimization direction
    pub fn direction(&self) -> Direction {
        self.fitness.direction()
    }

    /// Re-evaluate the raw objective for any individual
    pub fn fitness(&self, individual: &Individual) -> EngineResult<f64> {
        self.fitness.evaluate(individual)
    }

    /// Generation this view describes
    pub fn current_generation(&self) -> usize {
        self.generation
    }

    /// Rank of the participant holding this view
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of participants
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    /// Whether the participant holding this view is the coordinator
    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::traits::PluginState;
    use crate::genome::encoding::BinaryEncoding;
    use crate::operators::crossover::UniformCrossover;
    use crate::operators::mutation::{FlipBitMutation, Mutation};
    use crate::operators::selection::{Selection, TournamentSelection};
    use std::sync::Mutex;

    type TestEngine = Engine<Selection, UniformCrossover, Mutation>;

    fn engine(size: usize, seed: u64) -> TestEngine {
        let encoding = BinaryEncoding::new(vec![(0.0, 10.0)], 0.001).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let population = Population::initialize(encoding, size, &mut rng).unwrap();
        EngineBuilder::new()
            .population(population)
            .selection(Selection::from(TournamentSelection::binary()))
            .crossover(UniformCrossover::new(0.8, 0.5).unwrap())
            .mutation(Mutation::from(FlipBitMutation::new(0.1).unwrap()))
            .seed(seed)
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        steps: Arc<Mutex<Vec<usize>>>,
    }

    impl AnalysisPlugin for Recorder {
        fn register_step(
            &mut self,
            generation: usize,
            population: &Population,
            engine: &EngineView<'_>,
        ) -> EngineResult<()> {
            assert_eq!(engine.raw_fitness().len(), population.len());
            self.steps.lock().unwrap().push(generation);
            Ok(())
        }

        fn finalize(&mut self, _population: &Population, _engine: &EngineView<'_>) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_builder_requires_population() {
        let err = EngineBuilder::new()
            .selection(Selection::default())
            .crossover(UniformCrossover::default())
            .mutation(Mutation::from(FlipBitMutation::new(0.1).unwrap()))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("population"));
    }

    #[test]
    fn test_run_without_objective() {
        let mut engine = engine(8, 1);
        let err = engine.run(3).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::MissingObjective)));
        assert_eq!(engine.state(), EngineState::Failed);
        assert!(matches!(
            engine.run(3),
            Err(EngineError::State(StateError::Aborted))
        ));
    }

    #[test]
    fn test_run_is_single_use() {
        let mut engine = engine(8, 2);
        engine.fitness_register(|x| x[0]).unwrap();
        engine.run(2).unwrap();
        assert_eq!(engine.state(), EngineState::Done);
        assert!(matches!(
            engine.run(2),
            Err(EngineError::State(StateError::AlreadyRun))
        ));
        assert!(matches!(
            engine.fitness_register(|x| x[0]),
            Err(EngineError::State(StateError::RegistrationClosed))
        ));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |seed| {
            let mut engine = engine(20, seed);
            engine.fitness_register(|x| (x[0] - 3.0).powi(2)).unwrap();
            engine.run(15).unwrap();
            engine.raw_fitness().to_vec()
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn test_extrema_track_current_population() {
        let mut engine = engine(16, 3);
        engine.fitness_register(|x| x[0].sin()).unwrap();
        engine.run(4).unwrap();

        let raw = engine.raw_fitness();
        let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
        assert_eq!(engine.ori_fmax(), max);
        assert_eq!(engine.ori_fmin(), min);
        assert!(engine.normalized_fitness().iter().all(|&w| w >= 0.0));

        let best = engine.best_individual().unwrap();
        assert_eq!(best.solution()[0].sin(), max);
    }

    #[test]
    fn test_minimize_reports_raw_values() {
        let encoding = BinaryEncoding::new(vec![(0.0, 10.0)], 0.001).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let population = Population::initialize(encoding, 16, &mut rng).unwrap();
        let mut engine = EngineBuilder::new()
            .population(population)
            .selection(Selection::default())
            .crossover(UniformCrossover::default())
            .mutation(Mutation::from(FlipBitMutation::new(0.05).unwrap()))
            .minimize()
            .seed(4)
            .build()
            .unwrap();
        engine.fitness_register(|x| x[0]).unwrap();
        engine.run(3).unwrap();

        let raw = engine.raw_fitness();
        let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
        assert_eq!(engine.ori_fmax(), min);
        assert!(engine.ori_fmin() >= engine.ori_fmax());
    }

    #[test]
    fn test_elitism_keeps_best_so_far() {
        let encoding = BinaryEncoding::new(vec![(0.0, 10.0)], 0.001).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let population = Population::initialize(encoding, 10, &mut rng).unwrap();
        let mut engine = EngineBuilder::new()
            .population(population)
            .selection(Selection::default())
            .crossover(UniformCrossover::default())
            .mutation(Mutation::from(FlipBitMutation::new(0.3).unwrap()))
            .elitism(true)
            .seed(6)
            .analysis(BestTracker::default())
            .build()
            .unwrap();
        engine.fitness_register(|x| x[0]).unwrap();
        engine.run(10).unwrap();
    }

    // Fails the test if the best raw value ever drops between generations.
    #[derive(Default)]
    struct BestTracker {
        previous: Option<f64>,
    }

    impl AnalysisPlugin for BestTracker {
        fn register_step(
            &mut self,
            _generation: usize,
            _population: &Population,
            engine: &EngineView<'_>,
        ) -> EngineResult<()> {
            if let Some(previous) = self.previous {
                assert!(engine.ori_fmax() >= previous);
            }
            self.previous = Some(engine.ori_fmax());
            Ok(())
        }

        fn finalize(&mut self, _population: &Population, _engine: &EngineView<'_>) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_plugin_interval_and_lifecycle() {
        struct EveryThird(Recorder);

        impl AnalysisPlugin for EveryThird {
            fn interval(&self) -> usize {
                3
            }

            fn register_step(
                &mut self,
                generation: usize,
                population: &Population,
                engine: &EngineView<'_>,
            ) -> EngineResult<()> {
                self.0.register_step(generation, population, engine)
            }

            fn finalize(&mut self, population: &Population, engine: &EngineView<'_>) -> EngineResult<()> {
                self.0.finalize(population, engine)
            }
        }

        let recorder = Recorder::default();
        let steps = Arc::clone(&recorder.steps);
        let mut engine = engine(6, 7);
        engine.analysis_register(EveryThird(recorder)).unwrap();
        assert_eq!(engine.plugins()[0].state(), PluginState::Registered);

        engine.fitness_register(|x| x[0]).unwrap();
        engine.run(7).unwrap();

        assert_eq!(*steps.lock().unwrap(), vec![0, 3, 6]);
        assert_eq!(engine.plugins()[0].state(), PluginState::Finalized);
        assert_eq!(engine.plugins()[0].invocations(), 3);
    }

    #[test]
    fn test_zero_interval_rejected() {
        struct Never;

        impl AnalysisPlugin for Never {
            fn interval(&self) -> usize {
                0
            }

            fn register_step(&mut self, _: usize, _: &Population, _: &EngineView<'_>) -> EngineResult<()> {
                Ok(())
            }

            fn finalize(&mut self, _: &Population, _: &EngineView<'_>) -> EngineResult<()> {
                Ok(())
            }
        }

        let mut engine = engine(4, 8);
        assert!(matches!(
            engine.analysis_register(Never),
            Err(EngineError::Config(ConfigError::InvalidParameter { name: "interval", .. }))
        ));
    }

    #[test]
    fn test_objective_error_aborts_run() {
        let mut engine = engine(8, 9);
        engine
            .try_fitness_register(|x| {
                if x[0] >= 0.0 {
                    Err("objective rejected input")
                } else {
                    Ok(x[0])
                }
            })
            .unwrap();
        let err = engine.run(5).unwrap_err();
        assert!(matches!(err, EngineError::Objective(_)));
        assert_eq!(err.to_string(), "objective rejected input");
        assert_eq!(engine.state(), EngineState::Failed);
    }

    #[test]
    fn test_merge_reports() {
        let ok: Vec<Result<u8, String>> = vec![Ok(1), Ok(2)];
        assert_eq!(merge_reports(ok), Ok(vec![1, 2]));

        let failed: Vec<Result<u8, String>> = vec![Ok(1), Err("a".into()), Err("b".into())];
        assert_eq!(merge_reports(failed), Err((1, "a".to_string())));
    }
}
