//! Time stepping of a cell population coupled to a field solver.
//!
//! Each step runs in a fixed order: solve the field at the next time,
//! update every cell cycle, apply the killers, remove dead cells, add the
//! daughters of dividing cells, remesh and validate.

use nalgebra::SVector;
use tracing::{debug, info};

use crate::cell::CellProliferativeType;
use crate::config::TissueConfig;
use crate::cycle::CycleContext;
use crate::error::{Result, TissueError};
use crate::field::{FieldSolver, NodeField, SourceTerm};
use crate::killers::{CellKiller, KillerContext};
use crate::population::{CellId, CellPopulation};
use crate::random::RandomSource;

/// What happened during one call to [`TissueSimulation::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummary {
    pub time: f64,
    pub births: usize,
    pub deaths: usize,
    pub cells: usize,
}

pub struct TissueSimulation<const D: usize> {
    population: CellPopulation<D>,
    killers: Vec<Box<dyn CellKiller<D>>>,
    config: TissueConfig,
    rng: Box<dyn RandomSource>,
    time: f64,
    steps_taken: usize,
    births: usize,
    deaths: usize,
    cycle_models_initialised: bool,
    field: Option<NodeField>,
}

impl<const D: usize> TissueSimulation<D> {
    pub fn new(
        population: CellPopulation<D>,
        config: TissueConfig,
        rng: impl RandomSource + 'static,
    ) -> Result<Self> {
        config.validate()?;
        population.validate()?;
        Ok(Self {
            population,
            killers: Vec::new(),
            config,
            rng: Box::new(rng),
            time: 0.0,
            steps_taken: 0,
            births: 0,
            deaths: 0,
            cycle_models_initialised: false,
            field: None,
        })
    }

    pub fn with_start_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn add_killer(&mut self, killer: Box<dyn CellKiller<D>>) {
        self.killers.push(killer);
    }

    pub fn population(&self) -> &CellPopulation<D> {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut CellPopulation<D> {
        &mut self.population
    }

    pub fn config(&self) -> &TissueConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Total divisions since construction.
    pub fn births(&self) -> usize {
        self.births
    }

    /// Total cells removed since construction.
    pub fn deaths(&self) -> usize {
        self.deaths
    }

    /// The field from the most recent step.
    pub fn field(&self) -> Option<&NodeField> {
        self.field.as_ref()
    }

    /// Source term per node: living, non-necrotic cells consume at the
    /// configured linear rate; every other node contributes nothing.
    pub fn source_terms(&self) -> Vec<SourceTerm> {
        let mut sources = vec![SourceTerm::default(); self.population.num_nodes()];
        for (id, cell) in self.population.iter() {
            if cell.is_dead(self.time) || cell.cell_type() == CellProliferativeType::Necrotic {
                continue;
            }
            if let Ok(location) = self.population.location_of(id) {
                sources[location].linear_in_u = self.config.simulation.consumption_coefficient;
            }
        }
        sources
    }

    /// Runs steps until the configured end time is reached.
    pub fn solve(&mut self, solver: &mut dyn FieldSolver<D>) -> Result<()> {
        let dt = self.config.simulation.dt;
        let remaining = self.config.simulation.end_time - self.time;
        let steps = (remaining / dt).round().max(0.0) as usize;
        info!(
            start = self.time,
            end = self.config.simulation.end_time,
            steps,
            cells = self.population.num_cells(),
            "starting tissue simulation"
        );
        for _ in 0..steps {
            self.step(solver)?;
        }
        info!(
            time = self.time,
            cells = self.population.num_cells(),
            births = self.births,
            deaths = self.deaths,
            "finished tissue simulation"
        );
        Ok(())
    }

    /// Advances the population by one time step.
    ///
    /// The clock and step counter only move once the step has completed and the
    /// population validates, so a failed step can be retried at the same time.
    /// Cells removed or born before a failure stay counted.
    pub fn step(&mut self, solver: &mut dyn FieldSolver<D>) -> Result<StepSummary> {
        let dt = self.config.simulation.dt;
        let time = self.time + dt;

        let sources = self.source_terms();
        let field = solver
            .solve(time, self.population.nodes(), &sources)
            .map_err(|err| TissueError::numerical("field solve", err))?;
        if field.len() != self.population.num_nodes() {
            return Err(TissueError::Usage(format!(
                "field solver returned {} values for {} nodes",
                field.len(),
                self.population.num_nodes()
            )));
        }

        if !self.cycle_models_initialised {
            self.initialise_cycle_models(&field, time)?;
        }
        let ready = self.update_cell_cycles(&field, time)?;

        let mut killer_ctx = KillerContext {
            time,
            dt,
            field: Some(&field),
            params: &self.config.cell_cycle,
            rng: &mut *self.rng,
        };
        for killer in &mut self.killers {
            let flagged = killer.apply(&mut self.population, &mut killer_ctx)?;
            if flagged > 0 {
                debug!(killer = killer.name(), flagged, "killer applied");
            }
        }

        let deaths = self.population.remove_dead_cells(time);
        self.deaths += deaths;
        let births = if self.config.simulation.no_birth {
            0
        } else {
            self.divide_cells(&ready, &field, time)?
        };

        if self.config.simulation.remesh {
            self.population.remesh()?;
        }
        self.population.validate()?;
        self.time = time;
        self.field = Some(field);
        self.steps_taken += 1;

        let summary = StepSummary {
            time,
            births,
            deaths,
            cells: self.population.num_cells(),
        };
        debug!(?summary, "completed step");
        Ok(summary)
    }

    fn initialise_cycle_models(&mut self, field: &NodeField, time: f64) -> Result<()> {
        for id in self.population.cell_ids() {
            let value = field.value(self.population.location_of(id)?)?;
            let mut ctx = CycleContext::new(
                time,
                self.config.simulation.dt,
                &self.config.cell_cycle,
                &mut *self.rng,
            )
            .with_field(value);
            self.population
                .cell_mut(id)?
                .initialise_cycle_model(&mut ctx)
                .map_err(|err| with_cell_context(err, id))?;
        }
        self.cycle_models_initialised = true;
        Ok(())
    }

    fn update_cell_cycles(&mut self, field: &NodeField, time: f64) -> Result<Vec<CellId>> {
        let mut ready = Vec::new();
        for id in self.population.cell_ids() {
            let value = field.value(self.population.location_of(id)?)?;
            let mut ctx = CycleContext::new(
                time,
                self.config.simulation.dt,
                &self.config.cell_cycle,
                &mut *self.rng,
            )
            .with_field(value);
            if self
                .population
                .cell_mut(id)?
                .ready_to_divide(&mut ctx)
                .map_err(|err| with_cell_context(err, id))?
            {
                ready.push(id);
            }
        }
        Ok(ready)
    }

    fn divide_cells(&mut self, ready: &[CellId], field: &NodeField, time: f64) -> Result<usize> {
        let separation = self.config.simulation.division_separation;
        let mut births = 0;
        for &id in ready {
            let Ok(parent) = self.population.cell(id) else {
                continue;
            };
            if parent.has_apoptosis_begun() || parent.is_dead(time) {
                continue;
            }
            if self.population.num_cells() >= self.config.simulation.max_cells {
                return Err(TissueError::CapacityExceeded {
                    max: self.config.simulation.max_cells,
                });
            }

            let centre = self.population.position_of(id)?;
            let offset = random_direction::<D>(&mut *self.rng) * (0.5 * separation);
            let value = field.value(self.population.location_of(id)?)?;
            let mut ctx = CycleContext::new(
                time,
                self.config.simulation.dt,
                &self.config.cell_cycle,
                &mut *self.rng,
            )
            .with_field(value);
            let daughter = self
                .population
                .cell_mut(id)?
                .divide(&mut ctx)
                .map_err(|err| with_cell_context(err, id))?;

            self.population.move_cell(id, centre - offset)?;
            let daughter_id = self.population.add_cell(daughter, centre + offset);
            debug!(parent = ?id, daughter = ?daughter_id, time, "cell divided");
            births += 1;
            self.births += 1;
        }
        Ok(births)
    }
}

/// Uniformly distributed unit vector.
fn random_direction<const D: usize>(rng: &mut dyn RandomSource) -> SVector<f64, D> {
    if D == 0 {
        return SVector::zeros();
    }
    loop {
        let v = SVector::<f64, D>::from_fn(|_, _| rng.normal_deviate(0.0, 1.0));
        let norm = v.norm();
        if norm > 1e-12 {
            return v / norm;
        }
    }
}

fn with_cell_context(err: TissueError, id: CellId) -> TissueError {
    match err {
        TissueError::Numerical { context, message } => TissueError::Numerical {
            context: format!("cell {id:?} ({context})"),
            message,
        },
        other => other,
    }
}
