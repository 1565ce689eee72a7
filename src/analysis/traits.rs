//! Analysis plugin contract and lifecycle
//!
//! A plugin observes the run: it is set up once before the first
//! generation, stepped at generations where `generation % interval == 0`,
//! and finalized exactly once after the loop. Plugins only ever see shared
//! references to the population and engine state.

use serde::{Deserialize, Serialize};

use crate::engine::engine::EngineView;
use crate::error::{ConfigError, EngineResult};
use crate::population::population::Population;

/// Observer invoked during and after a run
pub trait AnalysisPlugin: Send {
    /// Human-readable name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Step every `interval` generations; must be positive
    fn interval(&self) -> usize {
        1
    }

    /// Run only on the coordinator in distributed mode
    fn master_only(&self) -> bool {
        false
    }

    /// Called once before the first generation
    fn setup(
        &mut self,
        _generations: usize,
        _population: &Population,
        _engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Called at generations where `generation % interval == 0`
    fn register_step(
        &mut self,
        generation: usize,
        population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()>;

    /// Called exactly once after the last generation
    fn finalize(&mut self, population: &Population, engine: &EngineView<'_>) -> EngineResult<()>;
}

impl<P: AnalysisPlugin + ?Sized> AnalysisPlugin for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn interval(&self) -> usize {
        (**self).interval()
    }

    fn master_only(&self) -> bool {
        (**self).master_only()
    }

    fn setup(
        &mut self,
        generations: usize,
        population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        (**self).setup(generations, population, engine)
    }

    fn register_step(
        &mut self,
        generation: usize,
        population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        (**self).register_step(generation, population, engine)
    }

    fn finalize(&mut self, population: &Population, engine: &EngineView<'_>) -> EngineResult<()> {
        (**self).finalize(population, engine)
    }
}

/// Where a plugin is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginState {
    /// Attached to an engine that has not started
    Registered,
    /// The run is in progress
    Active,
    /// `finalize` has been called (or is never called on this participant)
    Finalized,
}

/// What happened to a plugin at one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Not due, or not run on this participant
    Skipped,
    /// `register_step` was called
    Invoked,
}

/// A registered plugin together with its lifecycle bookkeeping
pub struct PluginSlot {
    plugin: Box<dyn AnalysisPlugin>,
    interval: usize,
    enabled: bool,
    state: PluginState,
    invocations: usize,
}

impl PluginSlot {
    /// Attach a plugin; `enabled` is false for master-only plugins on workers
    pub fn new(plugin: Box<dyn AnalysisPlugin>, is_coordinator: bool) -> Result<Self, ConfigError> {
        let interval = plugin.interval();
        if interval == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "interval",
                reason: format!("plugin {} must report at a positive interval", plugin.name()),
            });
        }
        let enabled = is_coordinator || !plugin.master_only();
        Ok(Self {
            plugin,
            interval,
            enabled,
            state: PluginState::Registered,
            invocations: 0,
        })
    }

    /// Plugin name
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    /// Current lifecycle state
    pub fn state(&self) -> PluginState {
        self.state
    }

    /// Whether this participant runs the plugin's hooks at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of `register_step` calls so far
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Whether the plugin is due at `generation`
    pub fn is_due(&self, generation: usize) -> bool {
        generation % self.interval == 0
    }

    pub(crate) fn start(
        &mut self,
        generations: usize,
        population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<()> {
        self.state = PluginState::Active;
        if self.enabled {
            self.plugin.setup(generations, population, engine)?;
        }
        Ok(())
    }

    pub(crate) fn step(
        &mut self,
        generation: usize,
        population: &Population,
        engine: &EngineView<'_>,
    ) -> EngineResult<Invocation> {
        if !self.enabled || !self.is_due(generation) {
            return Ok(Invocation::Skipped);
        }
        self.plugin.register_step(generation, population, engine)?;
        self.invocations += 1;
        Ok(Invocation::Invoked)
    }

    pub(crate) fn finish(&mut self, population: &Population, engine: &EngineView<'_>) -> EngineResult<()> {
        if self.state == PluginState::Finalized {
            return Ok(());
        }
        self.state = PluginState::Finalized;
        if self.enabled {
            self.plugin.finalize(population, engine)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PluginSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSlot")
            .field("name", &self.name())
            .field("interval", &self.interval)
            .field("enabled", &self.enabled)
            .field("state", &self.state)
            .field("invocations", &self.invocations)
            .finish()
    }
}
