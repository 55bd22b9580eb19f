use crate::cell::CellProperties;
use crate::cycle::{
    advance_generation, cycle_complete, demote_stem_daughter, mean_g1_duration, phase_for_age,
    CellCycleModel, CellCyclePhase, CycleContext,
};
use crate::error::Result;

/// Deterministic durations taken from the parameter table by cell type, with
/// generation counting for transit cells.
#[derive(Debug, Clone)]
pub struct FixedDurationCellCycleModel {
    birth_time: f64,
    generation: u32,
    phase: CellCyclePhase,
}

impl FixedDurationCellCycleModel {
    pub fn new(birth_time: f64) -> Self {
        Self {
            birth_time,
            generation: 0,
            phase: CellCyclePhase::M,
        }
    }

    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl CellCycleModel for FixedDurationCellCycleModel {
    fn name(&self) -> &'static str {
        "FixedDurationCellCycleModel"
    }

    fn birth_time(&self) -> f64 {
        self.birth_time
    }

    fn phase(&self) -> CellCyclePhase {
        self.phase
    }

    fn ready_to_divide(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        let g1 = mean_g1_duration(properties.cell_type, ctx.params);
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
        Ok(())
    }

    fn create_daughter(&self) -> Box<dyn CellCycleModel> {
        Box::new(self.clone())
    }

    fn initialise_daughter(
        &mut self,
        properties: &mut CellProperties,
        _ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        demote_stem_daughter(properties);
        Ok(())
    }
}
