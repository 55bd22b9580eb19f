use crate::cell::CellProperties;
use crate::config::TissueConfig;
use crate::cycle::{demote_stem_daughter, CellCycleModel, CellCyclePhase, CycleContext, OdeCycleState};
use crate::error::{Result, TissueError};
use crate::odes::wnt::WNT_LEVEL;
use crate::odes::WntCellCycleOde;
use crate::solvers::{IvpMethod, OdeSolverSettings};

/// Number of leading state variables that make up the G1/S network. The
/// remaining β-catenin variables carry over division unchanged.
const CELL_CYCLE_VARIABLES: usize = 5;

/// G1 lasts until E2F1 crosses its threshold in the Wnt-driven network;
/// S, G2 and M then take their fixed durations before the cell divides.
///
/// The Wnt level at the cell's node is written into the pinned state slot
/// before every solve.
#[derive(Debug, Clone)]
pub struct WntCellCycleModel {
    system: WntCellCycleOde,
    settings: OdeSolverSettings,
    ode: Option<OdeCycleState>,
    birth_time: f64,
    phase: CellCyclePhase,
    divide_time: Option<f64>,
}

impl WntCellCycleModel {
    pub fn default_solver_settings() -> OdeSolverSettings {
        OdeSolverSettings::new(IvpMethod::Rk4, 1e-4)
    }

    pub fn new(birth_time: f64) -> Self {
        Self::with_solver_settings(birth_time, Self::default_solver_settings())
    }

    pub fn with_solver_settings(birth_time: f64, settings: OdeSolverSettings) -> Self {
        Self {
            system: WntCellCycleOde::new(),
            settings,
            ode: None,
            birth_time,
            phase: CellCyclePhase::G1,
            divide_time: None,
        }
    }

    pub fn from_config(birth_time: f64, config: &TissueConfig) -> Self {
        let settings = config
            .ode_solver
            .unwrap_or_else(Self::default_solver_settings);
        Self::with_solver_settings(birth_time, settings)
    }

    /// When the cell will be ready to divide, once E2F1 has crossed.
    pub fn divide_time(&self) -> Option<f64> {
        self.divide_time
    }

    fn start_ode(&mut self, wnt_level: f64, time: f64) {
        let initial = self.system.initial_conditions(wnt_level);
        self.ode = Some(OdeCycleState::new(initial, time, self.settings));
    }

    fn post_commitment_phase(&self, time: f64, stop: f64, ctx: &CycleContext<'_>) -> CellCyclePhase {
        let elapsed = time - stop;
        if elapsed < ctx.params.s_duration {
            CellCyclePhase::S
        } else if elapsed < ctx.params.s_duration + ctx.params.g2_duration {
            CellCyclePhase::G2
        } else {
            CellCyclePhase::M
        }
    }
}

impl CellCycleModel for WntCellCycleModel {
    fn name(&self) -> &'static str {
        "WntCellCycleModel"
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
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        let level = ctx.field_value(self.name(), "Wnt")?;
        self.start_ode(level, ctx.time);
        Ok(())
    }

    fn ready_to_divide(
        &mut self,
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool> {
        let name = self.name();
        let level = ctx.field_value(name, "Wnt")?;
        if self.ode.is_none() {
            self.start_ode(level, ctx.time);
        }
        let Some(ode) = self.ode.as_mut() else {
            return Ok(false);
        };

        if !ode.finished() {
            ode.pin(WNT_LEVEL, level)
                .map_err(|err| TissueError::numerical(name, err))?;
            if ode
                .solve_to_time(&self.system, ctx.time)
                .map_err(|err| TissueError::numerical(name, err))?
            {
                if let Some(stop) = ode.stopping_time() {
                    self.divide_time = Some(stop + ctx.params.sg2m_duration());
                }
            }
        }

        self.phase = match self.ode.as_ref().and_then(|o| o.stopping_time()) {
            Some(stop) => self.post_commitment_phase(ctx.time, stop, ctx),
            None => CellCyclePhase::G1,
        };
        Ok(self.divide_time.is_some_and(|t| ctx.time >= t))
    }

    fn reset_for_division(
        &mut self,
        _properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        let name = self.name();
        let Some(ode) = self.ode.as_mut() else {
            return Err(TissueError::Usage(format!(
                "{name} was reset before its ODE state was initialised"
            )));
        };
        let level = ode.state()[WNT_LEVEL];
        let fresh = self.system.initial_conditions(level);
        ode.state_mut()[..CELL_CYCLE_VARIABLES].copy_from_slice(&fresh[..CELL_CYCLE_VARIABLES]);
        ode.restart(ctx.time);

        self.divide_time = None;
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
        self.ode
            .as_ref()
            .map(|ode| ode.state())
            .ok_or(TissueError::WrongVariant {
                accessor: "protein_concentrations",
                model: "an uninitialised WntCellCycleModel",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellMutationState, CellProliferativeType};
    use crate::config::CellCycleParameters;
    use crate::odes::wnt::{BETA_CATENIN, E2F1};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn transit() -> CellProperties {
        CellProperties {
            cell_type: CellProliferativeType::Transit,
            mutation_state: CellMutationState::Healthy,
        }
    }

    #[test]
    fn initial_state_reflects_local_wnt() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut low = WntCellCycleModel::new(0.0);
        let mut high = WntCellCycleModel::new(0.0);
        let mut properties = transit();

        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng).with_field(0.1);
        low.initialise(&mut properties, &mut ctx).expect("initialise");
        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng).with_field(1.0);
        high.initialise(&mut properties, &mut ctx).expect("initialise");

        let low_state = low.protein_concentrations().expect("initialised");
        let high_state = high.protein_concentrations().expect("initialised");
        assert!(high_state[BETA_CATENIN] > low_state[BETA_CATENIN]);
        assert_eq!(high_state[WNT_LEVEL], 1.0);
    }

    #[test]
    fn wnt_slot_is_pinned_to_the_field() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut model = WntCellCycleModel::new(0.0);
        let mut properties = transit();

        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng).with_field(1.0);
        model.initialise(&mut properties, &mut ctx).expect("initialise");
        let mut ctx = CycleContext::new(0.1, 0.01, &params, &mut rng).with_field(0.4);
        assert!(!model.ready_to_divide(&mut properties, &mut ctx).expect("solve"));

        let state = model.protein_concentrations().expect("initialised");
        assert_eq!(state[WNT_LEVEL], 0.4);
        assert!(state[E2F1] < WntCellCycleOde::E2F1_THRESHOLD);
        assert_eq!(model.phase(), CellCyclePhase::G1);
        assert!(model.divide_time().is_none());
    }

    #[test]
    fn commits_at_e2f1_crossing_and_divides_after_sg2m() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut model = WntCellCycleModel::new(0.0);
        let mut properties = transit();
        let mut ctx = CycleContext::new(0.0, 0.1, &params, &mut rng).with_field(1.0);
        model.initialise(&mut properties, &mut ctx).expect("initialise");

        let mut time = 0.0;
        while model.divide_time().is_none() {
            time += 0.1;
            assert!(time < 30.0, "E2F1 never crossed its threshold");
            let mut ctx = CycleContext::new(time, 0.1, &params, &mut rng).with_field(1.0);
            assert!(!model.ready_to_divide(&mut properties, &mut ctx).expect("solve"));
        }
        let divide_time = model.divide_time().expect("committed");
        let stop = divide_time - params.sg2m_duration();
        assert!(stop > 0.0 && stop <= time, "stop = {stop}, detected at {time}");
        assert!(model.protein_concentrations().expect("initialised")[E2F1] > WntCellCycleOde::E2F1_THRESHOLD);
        assert_eq!(model.phase(), CellCyclePhase::S);

        let mut query = |at: f64, model: &mut WntCellCycleModel| {
            let mut ctx = CycleContext::new(at, 0.1, &params, &mut rng).with_field(1.0);
            let ready = model.ready_to_divide(&mut properties, &mut ctx).expect("solve");
            (model.phase(), ready)
        };
        assert_eq!(query(stop + 2.0, &mut model), (CellCyclePhase::S, false));
        assert_eq!(query(stop + 7.0, &mut model), (CellCyclePhase::G2, false));
        assert_eq!(query(stop + 9.5, &mut model), (CellCyclePhase::M, false));
        assert_eq!(query(divide_time, &mut model), (CellCyclePhase::M, true));
        assert_eq!(query(divide_time, &mut model), (CellCyclePhase::M, true));
        assert_eq!(query(divide_time + 1.0, &mut model), (CellCyclePhase::M, true));
        assert_eq!(model.divide_time(), Some(divide_time));
    }

    #[test]
    fn uninitialised_model_has_no_concentrations() {
        let model = WntCellCycleModel::new(0.0);
        assert!(model.protein_concentrations().is_err());
        assert!(model.requires_field());
    }

    #[test]
    fn reset_restores_the_g1_network_and_keeps_beta_catenin() {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut model = WntCellCycleModel::new(0.0);
        let mut properties = transit();
        let mut ctx = CycleContext::new(0.0, 0.01, &params, &mut rng).with_field(1.0);
        model.initialise(&mut properties, &mut ctx).expect("initialise");
        let mut ctx = CycleContext::new(0.5, 0.01, &params, &mut rng).with_field(1.0);
        model.ready_to_divide(&mut properties, &mut ctx).expect("solve");
        let before = model.protein_concentrations().expect("initialised").to_vec();

        model.reset_for_division(&mut properties, &mut ctx).expect("reset");
        let daughter = model.create_daughter();
        let after = model.protein_concentrations().expect("initialised");
        let fresh = WntCellCycleOde::new().initial_conditions(1.0);
        assert_eq!(&after[..CELL_CYCLE_VARIABLES], &fresh[..CELL_CYCLE_VARIABLES]);
        assert_eq!(after[BETA_CATENIN], before[BETA_CATENIN]);
        assert_eq!(daughter.protein_concentrations().expect("inherited"), after);
        assert_eq!(model.birth_time(), 0.5);
    }
}
