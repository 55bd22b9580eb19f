use crate::cell::CellProperties;
use crate::config::TissueConfig;
use crate::cycle::{
    advance_generation, cycle_complete, demote_stem_daughter, mean_g1_duration, phase_for_age,
    sample_g1_duration, CellCycleModel, CellCyclePhase, CycleContext, OdeCycleState,
};
use crate::error::{Result, TissueError};
use crate::odes::delta_notch::{DELTA, MEAN_DELTA, NOTCH};
use crate::odes::DeltaNotchOde;
use crate::solvers::{IvpMethod, OdeSolverSettings};

/// Stochastic-duration cycle carrying a Delta-Notch signalling state.
///
/// Division timing is independent of the signalling network; the ODE is
/// advanced on every update with the mean Delta of the cell's neighbours
/// (the field value) pinned, and daughters inherit the parent's levels.
#[derive(Debug, Clone)]
pub struct DeltaNotchCellCycleModel {
    system: DeltaNotchOde,
    settings: OdeSolverSettings,
    ode: Option<OdeCycleState>,
    birth_time: f64,
    generation: u32,
    phase: CellCyclePhase,
    g1_duration: Option<f64>,
}

impl DeltaNotchCellCycleModel {
    pub fn default_solver_settings() -> OdeSolverSettings {
        OdeSolverSettings::new(IvpMethod::Rk4, 0.01)
    }

    pub fn new(birth_time: f64) -> Self {
        Self::with_solver_settings(birth_time, Self::default_solver_settings())
    }

    pub fn with_solver_settings(birth_time: f64, settings: OdeSolverSettings) -> Self {
        Self {
            system: DeltaNotchOde,
            settings,
            ode: None,
            birth_time,
            generation: 0,
            phase: CellCyclePhase::M,
            g1_duration: None,
        }
    }

    pub fn from_config(birth_time: f64, config: &TissueConfig) -> Self {
        let settings = config
            .ode_solver
            .unwrap_or_else(Self::default_solver_settings);
        Self::with_solver_settings(birth_time, settings)
    }

    pub fn notch(&self) -> Result<f64> {
        self.level(NOTCH)
    }

    pub fn delta(&self) -> Result<f64> {
        self.level(DELTA)
    }

    pub fn mean_delta(&self) -> Result<f64> {
        self.level(MEAN_DELTA)
    }

    fn level(&self, slot: usize) -> Result<f64> {
        Ok(self.protein_concentrations()?[slot])
    }

    fn advance_signalling(&mut self, mean_delta: f64, time: f64) -> Result<()> {
        let name = self.name();
        let settings = self.settings;
        let ode = self.ode.get_or_insert_with(|| {
            OdeCycleState::new(DeltaNotchOde::initial_conditions(mean_delta), time, settings)
        });
        ode.pin(MEAN_DELTA, mean_delta)
            .map_err(|err| TissueError::numerical(name, err))?;
        ode.solve_to_time(&self.system, time)
            .map_err(|err| TissueError::numerical(name, err))?;
        Ok(())
    }
}

impl CellCycleModel for DeltaNotchCellCycleModel {
    fn name(&self) -> &'static str {
        "DeltaNotchCellCycleModel"
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
        self.g1_duration = sample_g1_duration(properties.cell_type, ctx.params, &mut *ctx.rng);
        let mean_delta = ctx.field_value(self.name(), "mean Delta")?;
        self.ode = Some(OdeCycleState::new(
            DeltaNotchOde::initial_conditions(mean_delta),
            ctx.time,
            self.settings,
        ));
        Ok(())
    }

    fn ready_to_divide(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        let mean_delta = ctx.field_value(self.name(), "mean Delta")?;
        self.advance_signalling(mean_delta, ctx.time)?;

        if self.g1_duration.is_none() {
            self.g1_duration = sample_g1_duration(properties.cell_type, ctx.params, &mut *ctx.rng);
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
        self.g1_duration = sample_g1_duration(properties.cell_type, ctx.params, &mut *ctx.rng);
        if let Some(ode) = self.ode.as_mut() {
            ode.restart(ctx.time);
        }
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
        self.g1_duration = sample_g1_duration(properties.cell_type, ctx.params, &mut *ctx.rng);
        Ok(())
    }

    fn protein_concentrations(&self) -> Result<&[f64]> {
        self.ode
            .as_ref()
            .map(|ode| ode.state())
            .ok_or(TissueError::WrongVariant {
                accessor: "protein_concentrations",
                model: "an uninitialised DeltaNotchCellCycleModel",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellMutationState, CellProliferativeType};
    use crate::config::CellCycleParameters;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn transit() -> CellProperties {
        CellProperties {
            cell_type: CellProliferativeType::Transit,
            mutation_state: CellMutationState::Healthy,
        }
    }

    #[test]
    fn neighbour_delta_drives_notch_up_and_delta_down() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut model = DeltaNotchCellCycleModel::new(0.0);
        let mut properties = transit();

        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng).with_field(1.0);
        model.initialise(&mut properties, &mut ctx).expect("initialise");
        let mut ctx = CycleContext::new(5.0, 0.01, &params, &mut rng).with_field(1.0);
        assert!(!model.ready_to_divide(&mut properties, &mut ctx).expect("update"));

        let notch = model.notch().expect("initialised");
        let delta = model.delta().expect("initialised");
        assert!(notch > 0.98, "notch = {notch}");
        assert!(delta < 0.05, "delta = {delta}");
        assert_eq!(model.mean_delta().expect("initialised"), 1.0);
    }

    #[test]
    fn daughter_inherits_signalling_state() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut model = DeltaNotchCellCycleModel::new(0.0);
        let mut properties = transit();
        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng).with_field(0.2);
        model.initialise(&mut properties, &mut ctx).expect("initialise");
        let mut ctx = CycleContext::new(2.0, 0.01, &params, &mut rng).with_field(0.2);
        model.ready_to_divide(&mut properties, &mut ctx).expect("update");

        model.reset_for_division(&mut properties, &mut ctx).expect("reset");
        let mut daughter_props = properties;
        let mut daughter = model.create_daughter();
        daughter
            .initialise_daughter(&mut daughter_props, &mut ctx)
            .expect("daughter");
        assert_eq!(
            daughter.protein_concentrations().expect("inherited"),
            model.protein_concentrations().expect("initialised")
        );
    }

    #[test]
    fn requires_mean_delta() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut model = DeltaNotchCellCycleModel::new(0.0);
        let mut properties = transit();
        let mut ctx = CycleContext::new(1.0, 0.01, &params, &mut rng);
        let err = model
            .ready_to_divide(&mut properties, &mut ctx)
            .expect_err("field required");
        assert!(err.to_string().contains("mean Delta"));
        assert!(model.notch().is_err());
    }

    #[test]
    fn initialise_requires_mean_delta() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut model = DeltaNotchCellCycleModel::new(0.0);
        let mut properties = transit();
        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng);
        let err = model
            .initialise(&mut properties, &mut ctx)
            .expect_err("field required");
        assert!(matches!(err, TissueError::MissingField { field: "mean Delta", .. }));
        assert!(model.notch().is_err());
    }
}
