use crate::cell::CellProperties;
use crate::cycle::{
    advance_generation, cycle_complete, demote_stem_daughter, mean_g1_duration, phase_for_age,
    sample_g1_duration, CellCycleModel, CellCyclePhase, CycleContext,
};
use crate::error::Result;

/// Like [`super::FixedDurationCellCycleModel`], but G1 lasts a normally
/// distributed time (sd one hour) drawn at birth and again at each division.
#[derive(Debug, Clone)]
pub struct StochasticDurationCellCycleModel {
    birth_time: f64,
    generation: u32,
    phase: CellCyclePhase,
    g1_duration: Option<f64>,
}

impl StochasticDurationCellCycleModel {
    pub fn new(birth_time: f64) -> Self {
        Self {
            birth_time,
            generation: 0,
            phase: CellCyclePhase::M,
            g1_duration: None,
        }
    }

    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The sampled G1 duration, once drawn.
    pub fn g1_duration(&self) -> Option<f64> {
        self.g1_duration
    }

    fn resample(&mut self, properties: &CellProperties, ctx: &mut CycleContext<'_>) {
        self.g1_duration = sample_g1_duration(properties.cell_type, ctx.params, &mut *ctx.rng);
    }
}

impl CellCycleModel for StochasticDurationCellCycleModel {
    fn name(&self) -> &'static str {
        "StochasticDurationCellCycleModel"
    }

    fn birth_time(&self) -> f64 {
        self.birth_time
    }

    fn phase(&self) -> CellCyclePhase {
        self.phase
    }

    fn initialise(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.resample(properties, ctx);
        Ok(())
    }

    fn ready_to_divide(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        if self.g1_duration.is_none() {
            self.resample(properties, ctx);
        }
        let g1 = mean_g1_duration(properties.cell_type, ctx.params).and(self.g1_duration);
        let age = self.age(ctx.time);
        self.phase = phase_for_age(age, g1, ctx.params);
        Ok(cycle_complete(age, g1, ctx.params))
    }

    fn reset_for_division(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.birth_time = ctx.time;
        self.phase = CellCyclePhase::M;
        advance_generation(&mut self.generation, properties, ctx.params);
        self.resample(properties, ctx);
        Ok(())
    }

    fn create_daughter(&self) -> Box<dyn CellCycleModel> {
        Box::new(self.clone())
    }

    fn initialise_daughter(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        demote_stem_daughter(properties);
        self.resample(properties, ctx);
        Ok(())
    }
}
