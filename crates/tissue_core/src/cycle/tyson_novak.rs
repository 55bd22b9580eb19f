use crate::cell::CellProperties;
use crate::config::TissueConfig;
use crate::cycle::{demote_stem_daughter, CellCycleModel, CellCyclePhase, CycleContext, OdeCycleState};
use crate::error::{Result, TissueError};
use crate::odes::tyson_novak::MASS;
use crate::odes::TysonNovakOde;
use crate::solvers::{IvpMethod, OdeSolverSettings};

/// Division is triggered by mitotic exit in the Tyson-Novak network. The
/// parent keeps its concentrations with mass halved, and the daughter starts
/// from the same state.
#[derive(Debug, Clone)]
pub struct TysonNovakCellCycleModel {
    system: TysonNovakOde,
    ode: OdeCycleState,
    birth_time: f64,
    phase: CellCyclePhase,
}

impl TysonNovakCellCycleModel {
    /// Backward Euler with a step of 0.1 minutes; the system is stiff.
    pub fn default_solver_settings() -> OdeSolverSettings {
        OdeSolverSettings::new(IvpMethod::BackwardEuler, 0.1 / 60.0)
    }

    pub fn new(birth_time: f64) -> Self {
        Self::with_solver_settings(birth_time, Self::default_solver_settings())
    }

    pub fn with_solver_settings(birth_time: f64, settings: OdeSolverSettings) -> Self {
        Self {
            system: TysonNovakOde::new(),
            ode: OdeCycleState::new(TysonNovakOde::initial_conditions(), birth_time, settings),
            birth_time,
            phase: CellCyclePhase::G1,
        }
    }

    pub fn from_config(birth_time: f64, config: &TissueConfig) -> Self {
        let settings = config
            .ode_solver
            .unwrap_or_else(Self::default_solver_settings);
        Self::with_solver_settings(birth_time, settings)
    }

    pub fn ode_stop_time(&self) -> Option<f64> {
        self.ode.stopping_time()
    }
}

impl CellCycleModel for TysonNovakCellCycleModel {
    fn name(&self) -> &'static str {
        "TysonNovakCellCycleModel"
    }

    fn birth_time(&self) -> f64 {
        self.birth_time
    }

    fn phase(&self) -> CellCyclePhase {
        self.phase
    }

    fn ready_to_divide(
        &mut self,
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        let finished = self
            .ode
            .solve_to_time(&self.system, ctx.time)
            .map_err(|err| TissueError::numerical(self.name(), err))?;
        if finished {
            self.phase = CellCyclePhase::M;
        }
        Ok(finished)
    }

    fn reset_for_division(
        &mut self,
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        self.ode.state_mut()[MASS] *= 0.5;
        self.ode.restart(ctx.time);
        self.birth_time = ctx.time;
        self.phase = CellCyclePhase::G1;
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

    fn protein_concentrations(&self) -> Result<&[f64]> {
        Ok(self.ode.state())
    }
}
