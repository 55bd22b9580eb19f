//! Parameter tables and simulation settings.
//!
//! These replace process-wide parameter singletons: the simulation driver owns
//! one [`TissueConfig`] and hands references to the components that need them.

use serde::{Deserialize, Serialize};

use crate::cell::CellMutationState;
use crate::error::{Result, TissueError};
use crate::solvers::OdeSolverSettings;

/// Durations (hours) and thresholds shared by the cell cycle models and killers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellCycleParameters {
    pub stem_g1_duration: f64,
    pub transit_g1_duration: f64,
    pub s_duration: f64,
    pub g2_duration: f64,
    pub m_duration: f64,
    pub max_transit_generations: u32,
    /// Lower bound applied to sampled gap-phase durations.
    pub minimum_gap_duration: f64,
    pub apoptosis_duration: f64,
    pub wnt_threshold_healthy: f64,
    pub wnt_threshold_apc_one_hit: f64,
    pub wnt_threshold_beta_catenin_one_hit: f64,
    pub wnt_threshold_apc_two_hit: f64,
    pub hypoxic_concentration: f64,
    pub quiescent_concentration: f64,
    pub critical_hypoxic_duration: f64,
}

impl Default for CellCycleParameters {
    fn default() -> Self {
        Self {
            stem_g1_duration: 14.0,
            transit_g1_duration: 2.0,
            s_duration: 5.0,
            g2_duration: 4.0,
            m_duration: 1.0,
            max_transit_generations: 3,
            minimum_gap_duration: 0.01,
            apoptosis_duration: 0.25,
            wnt_threshold_healthy: 0.65,
            wnt_threshold_apc_one_hit: 0.5,
            wnt_threshold_beta_catenin_one_hit: 0.1,
            wnt_threshold_apc_two_hit: 0.0,
            hypoxic_concentration: 0.1,
            quiescent_concentration: 0.3,
            critical_hypoxic_duration: 2.0,
        }
    }
}

impl CellCycleParameters {
    /// Combined length of the S, G2 and M phases.
    pub fn sg2m_duration(&self) -> f64 {
        self.s_duration + self.g2_duration + self.m_duration
    }

    /// Wnt level at or above which a cell with this mutation keeps cycling.
    pub fn wnt_division_threshold(&self, mutation: CellMutationState) -> f64 {
        match mutation {
            CellMutationState::Healthy | CellMutationState::Labelled => self.wnt_threshold_healthy,
            CellMutationState::ApcOneHit => self.wnt_threshold_apc_one_hit,
            CellMutationState::BetaCateninOneHit => self.wnt_threshold_beta_catenin_one_hit,
            CellMutationState::ApcTwoHit => self.wnt_threshold_apc_two_hit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("stem_g1_duration", self.stem_g1_duration),
            ("transit_g1_duration", self.transit_g1_duration),
            ("s_duration", self.s_duration),
            ("g2_duration", self.g2_duration),
            ("m_duration", self.m_duration),
            ("minimum_gap_duration", self.minimum_gap_duration),
            ("apoptosis_duration", self.apoptosis_duration),
            ("critical_hypoxic_duration", self.critical_hypoxic_duration),
        ];
        for (name, value) in durations {
            if !(value > 0.0) || !value.is_finite() {
                return Err(TissueError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.quiescent_concentration <= 0.0 {
            return Err(TissueError::InvalidConfig(
                "quiescent_concentration must be positive".into(),
            ));
        }
        if self.hypoxic_concentration <= 0.0 {
            return Err(TissueError::InvalidConfig(
                "hypoxic_concentration must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time step in hours.
    pub dt: f64,
    pub end_time: f64,
    pub max_cells: usize,
    pub no_birth: bool,
    pub remesh: bool,
    /// Distance between parent and daughter centres right after division.
    pub division_separation: f64,
    /// Linear-in-u source coefficient contributed by each living cell.
    pub consumption_coefficient: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 120.0,
            end_time: 1.0,
            max_cells: 10_000,
            no_birth: false,
            remesh: true,
            division_separation: 0.3,
            consumption_coefficient: -0.03,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(TissueError::InvalidConfig(format!(
                "dt must be positive and finite, got {}",
                self.dt
            )));
        }
        if self.end_time < 0.0 {
            return Err(TissueError::InvalidConfig("end_time must not be negative".into()));
        }
        if self.max_cells == 0 {
            return Err(TissueError::InvalidConfig("max_cells must be at least one".into()));
        }
        if self.division_separation < 0.0 {
            return Err(TissueError::InvalidConfig(
                "division_separation must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a simulation run is configured with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TissueConfig {
    pub cell_cycle: CellCycleParameters,
    pub simulation: SimulationConfig,
    /// Overrides the per-model default ODE solver when present.
    pub ode_solver: Option<OdeSolverSettings>,
}

impl TissueConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TissueConfig = serde_json::from_str(json)
            .map_err(|err| TissueError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cell_cycle.validate()?;
        self.simulation.validate()?;
        if let Some(settings) = &self.ode_solver {
            if !(settings.dt > 0.0) {
                return Err(TissueError::InvalidConfig(
                    "ode_solver.dt must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}
