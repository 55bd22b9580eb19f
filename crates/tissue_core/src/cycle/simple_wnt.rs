use crate::cell::{CellProliferativeType, CellProperties};
use crate::cycle::{
    cycle_complete, phase_for_age, sample_g1_duration, CellCycleModel, CellCyclePhase,
    CycleContext,
};
use crate::error::Result;

/// Cells cycle while the Wnt level at their node reaches the threshold for
/// their mutation state and differentiate otherwise.
///
/// Proliferating cells are classified as transit cells and use the transit
/// G1 duration, optionally perturbed as in
/// [`super::StochasticDurationCellCycleModel`].
#[derive(Debug, Clone)]
pub struct SimpleWntCellCycleModel {
    birth_time: f64,
    phase: CellCyclePhase,
    stochastic_g1: bool,
    g1_duration: Option<f64>,
}

impl SimpleWntCellCycleModel {
    pub fn new(birth_time: f64) -> Self {
        Self {
            birth_time,
            phase: CellCyclePhase::M,
            stochastic_g1: false,
            g1_duration: None,
        }
    }

    /// Draw G1 from N(transit G1, 1) instead of using it directly.
    pub fn with_stochastic_g1(mut self) -> Self {
        self.stochastic_g1 = true;
        self
    }

    fn draw_g1(&mut self, ctx: &mut CycleContext<'_>) {
        self.g1_duration = if self.stochastic_g1 {
            sample_g1_duration(CellProliferativeType::Transit, ctx.params, &mut *ctx.rng)
        } else {
            Some(ctx.params.transit_g1_duration)
        };
    }

    fn classify(properties: &mut CellProperties, wnt_level: f64, ctx: &CycleContext<'_>) {
        if properties.cell_type == CellProliferativeType::Necrotic {
            return;
        }
        let threshold = ctx.params.wnt_division_threshold(properties.mutation_state);
        properties.cell_type = if wnt_level >= threshold {
            CellProliferativeType::Transit
        } else {
            CellProliferativeType::Differentiated
        };
    }
}

impl CellCycleModel for SimpleWntCellCycleModel {
    fn name(&self) -> &'static str {
        "SimpleWntCellCycleModel"
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
        self.draw_g1(ctx);
        if let Some(level) = ctx.field {
            Self::classify(properties, level, ctx);
        }
        Ok(())
    }

    fn ready_to_divide(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        let level = ctx.field_value(self.name(), "Wnt")?;
        if self.g1_duration.is_none() {
            self.draw_g1(ctx);
        }
        Self::classify(properties, level, ctx);

        let g1 = match properties.cell_type {
            CellProliferativeType::Transit => self.g1_duration,
            _ => None,
        };
        let age = self.age(ctx.time);
        self.phase = phase_for_age(age, g1, ctx.params);
        Ok(cycle_complete(age, g1, ctx.params))
    }

    fn reset_for_division(
        &mut self,
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.birth_time = ctx.time;
        self.phase = CellCyclePhase::M;
        self.draw_g1(ctx);
        Ok(())
    }

    fn create_daughter(&self) -> Box<dyn CellCycleModel> {
        Box::new(self.clone())
    }

    fn initialise_daughter(
        &mut self,
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.draw_g1(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellMutationState;
    use crate::config::CellCycleParameters;
    use crate::error::ErrorKind;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn cell(mutation_state: CellMutationState) -> CellProperties {
        CellProperties {
            cell_type: CellProliferativeType::Stem,
            mutation_state,
        }
    }

    #[test]
    fn apc_two_hit_cycles_without_wnt() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut model = SimpleWntCellCycleModel::new(0.0);
        let mut properties = cell(CellMutationState::ApcTwoHit);

        for (time, phase, ready) in [
            (0.5, CellCyclePhase::M, false),
            (2.0, CellCyclePhase::G1, false),
            (4.0, CellCyclePhase::S, false),
            (9.0, CellCyclePhase::G2, false),
            (12.0, CellCyclePhase::M, true),
        ] {
            let mut ctx = CycleContext::new(time, 0.1, &params, &mut rng).with_field(0.0);
            assert_eq!(model.ready_to_divide(&mut properties, &mut ctx).expect("update"), ready);
            assert_eq!(properties.cell_type, CellProliferativeType::Transit);
            assert_eq!(model.phase(), phase, "phase at t = {time}");
        }
    }

    #[test]
    fn healthy_cells_differentiate_below_threshold() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut model = SimpleWntCellCycleModel::new(0.0);
        let mut properties = cell(CellMutationState::Healthy);

        let mut ctx = CycleContext::new(50.0, 0.1, &params, &mut rng).with_field(0.6);
        assert!(!model.ready_to_divide(&mut properties, &mut ctx).expect("update"));
        assert_eq!(properties.cell_type, CellProliferativeType::Differentiated);
        assert_eq!(model.phase(), CellCyclePhase::G0);

        let mut ctx = CycleContext::new(50.0, 0.1, &params, &mut rng).with_field(0.65);
        assert!(model.ready_to_divide(&mut properties, &mut ctx).expect("update"));
        assert_eq!(properties.cell_type, CellProliferativeType::Transit);
    }

    #[test]
    fn missing_wnt_level_is_a_usage_error() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut model = SimpleWntCellCycleModel::new(0.0);
        let mut properties = cell(CellMutationState::Healthy);
        let mut ctx = CycleContext::new(1.0, 0.1, &params, &mut rng);
        let err = model
            .ready_to_divide(&mut properties, &mut ctx)
            .expect_err("field required");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(model.requires_field());
    }

    #[test]
    fn stochastic_g1_varies_between_daughters() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(99);
        let mut model = SimpleWntCellCycleModel::new(0.0).with_stochastic_g1();
        let mut properties = cell(CellMutationState::Healthy);
        let mut ctx = CycleContext::new(0.0, 0.1, &params, &mut rng).with_field(1.0);
        model.initialise(&mut properties, &mut ctx).expect("initialise");
        let first = model.g1_duration.expect("drawn");
        model.reset_for_division(&mut properties, &mut ctx).expect("reset");
        let second = model.g1_duration.expect("drawn");
        assert_ne!(first, second);
    }
}
