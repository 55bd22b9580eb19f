use crate::cell::CellProperties;
use crate::cycle::{
    cycle_complete, mean_g1_duration, phase_for_age, CellCycleModel, CellCyclePhase, CycleContext,
};
use crate::error::Result;

/// Fixed durations, except that G1 is stretched while the local oxygen
/// concentration is below the quiescent level.
///
/// Each update spent in G1 at concentration `c < c_q` adds
/// `(1 - max(c, 0) / c_q) * dt` to the G1 duration.
#[derive(Debug, Clone)]
pub struct OxygenBasedCellCycleModel {
    birth_time: f64,
    phase: CellCyclePhase,
    g1_duration: Option<f64>,
}

impl OxygenBasedCellCycleModel {
    pub fn new(birth_time: f64) -> Self {
        Self {
            birth_time,
            phase: CellCyclePhase::M,
            g1_duration: None,
        }
    }

    pub fn g1_duration(&self) -> Option<f64> {
        self.g1_duration
    }
}

impl CellCycleModel for OxygenBasedCellCycleModel {
    fn name(&self) -> &'static str {
        "OxygenBasedCellCycleModel"
    }

    fn birth_time(&self) -> f64 {
        self.birth_time
    }

    fn phase(&self) -> CellCyclePhase {
        self.phase
    }

    fn requires_field(&self) -> bool {
        true
    }

    fn initialise(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.g1_duration = mean_g1_duration(properties.cell_type, ctx.params);
        Ok(())
    }

    fn ready_to_divide(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        let oxygen = ctx.field_value(self.name(), "oxygen")?;
        let params = ctx.params;
        let Some(base) = mean_g1_duration(properties.cell_type, params) else {
            self.phase = CellCyclePhase::G0;
            return Ok(false);
        };
        let mut g1 = self.g1_duration.unwrap_or(base);

        let age = self.age(ctx.time);
        if phase_for_age(age, Some(g1), params) == CellCyclePhase::G1
            && oxygen < params.quiescent_concentration
        {
            g1 += (1.0 - oxygen.max(0.0) / params.quiescent_concentration) * ctx.dt;
        }
        self.g1_duration = Some(g1);

        self.phase = phase_for_age(age, Some(g1), params);
        Ok(cycle_complete(age, Some(g1), params))
    }

    fn reset_for_division(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.birth_time = ctx.time;
        self.phase = CellCyclePhase::M;
        self.g1_duration = mean_g1_duration(properties.cell_type, ctx.params);
        Ok(())
    }

    fn create_daughter(&self) -> Box<dyn CellCycleModel> {
        Box::new(self.clone())
    }
}
