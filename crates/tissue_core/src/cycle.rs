//! Cell cycle models.
//!
//! Every model implements [`CellCycleModel`]. The simple models derive the
//! phase from the cell's age against M, G1, S and G2 durations (M first,
//! since a cell is born at the end of mitosis). The ODE models integrate a
//! biochemical network through [`OdeCycleState`] and divide once its
//! stopping event has fired.

mod delta_notch;
mod fixed;
mod ode_state;
mod oxygen;
mod simple_wnt;
mod stochastic;
mod tyson_novak;
mod wnt;

pub use delta_notch::DeltaNotchCellCycleModel;
pub use fixed::FixedDurationCellCycleModel;
pub use ode_state::OdeCycleState;
pub use oxygen::OxygenBasedCellCycleModel;
pub use simple_wnt::SimpleWntCellCycleModel;
pub use stochastic::StochasticDurationCellCycleModel;
pub use tyson_novak::TysonNovakCellCycleModel;
pub use wnt::WntCellCycleModel;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cell::{CellProliferativeType, CellProperties};
use crate::config::CellCycleParameters;
use crate::error::{Result, TissueError};
use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellCyclePhase {
    G0,
    G1,
    S,
    G2,
    M,
}

impl CellCyclePhase {
    pub const ALL: [CellCyclePhase; 5] = [
        CellCyclePhase::G0,
        CellCyclePhase::G1,
        CellCyclePhase::S,
        CellCyclePhase::G2,
        CellCyclePhase::M,
    ];
}

/// Everything a cycle model may consult while updating: the clock, the
/// parameter table, the random source and the field value at the cell's node.
pub struct CycleContext<'a> {
    pub time: f64,
    pub dt: f64,
    pub field: Option<f64>,
    pub params: &'a CellCycleParameters,
    pub rng: &'a mut dyn RandomSource,
}

impl<'a> CycleContext<'a> {
    pub fn new(
        time: f64,
        dt: f64,
        params: &'a CellCycleParameters,
        rng: &'a mut dyn RandomSource,
    ) -> Self {
        Self {
            time,
            dt,
            field: None,
            params,
            rng,
        }
    }

    pub fn with_field(mut self, value: f64) -> Self {
        self.field = Some(value);
        self
    }

    pub fn field_value(&self, model: &'static str, field: &'static str) -> Result<f64> {
        self.field
            .ok_or(TissueError::MissingField { model, field })
    }
}

/// Decides when a cell divides and what its daughter's cycle looks like.
///
/// Calls arrive in the order `initialise`, then `ready_to_divide` once per
/// step until it returns `true`, then `reset_for_division` on the parent,
/// `create_daughter` and `initialise_daughter` on the new model.
pub trait CellCycleModel: fmt::Debug {
    fn name(&self) -> &'static str;

    fn birth_time(&self) -> f64;

    fn phase(&self) -> CellCyclePhase;

    /// Time since birth, never negative.
    fn age(&self, now: f64) -> f64 {
        (now - self.birth_time()).max(0.0)
    }

    /// Whether `ready_to_divide` needs [`CycleContext::field`].
    fn requires_field(&self) -> bool {
        false
    }

    fn initialise(
        &mut self,
        _properties: &mut CellProperties,
        _ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    /// Brings the model up to `ctx.time` and reports whether the cell should
    /// divide now. May reclassify the cell's proliferative type.
    fn ready_to_divide(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<bool>;

    fn reset_for_division(
        &mut self,
        properties: &mut CellProperties,
        ctx: &mut CycleContext<'_>,
    ) -> Result<()>;

    /// A model for the daughter, built from this (already reset) model.
    fn create_daughter(&self) -> Box<dyn CellCycleModel>;

    fn initialise_daughter(
        &mut self,
        _properties: &mut CellProperties,
        _ctx: &mut CycleContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn protein_concentrations(&self) -> Result<&[f64]> {
        Err(TissueError::WrongVariant {
            accessor: "protein_concentrations",
            model: self.name(),
        })
    }
}

/// G1 duration for a proliferative type. `None` for cells that never cycle.
pub(crate) fn mean_g1_duration(
    cell_type: CellProliferativeType,
    params: &CellCycleParameters,
) -> Option<f64> {
    match cell_type {
        CellProliferativeType::Stem => Some(params.stem_g1_duration),
        CellProliferativeType::Transit => Some(params.transit_g1_duration),
        CellProliferativeType::Differentiated | CellProliferativeType::Necrotic => None,
    }
}

pub(crate) fn sample_g1_duration(
    cell_type: CellProliferativeType,
    params: &CellCycleParameters,
    rng: &mut dyn RandomSource,
) -> Option<f64> {
    mean_g1_duration(cell_type, params)
        .map(|mean| rng.normal_deviate(mean, 1.0).max(params.minimum_gap_duration))
}

pub(crate) fn phase_for_age(
    age: f64,
    g1_duration: Option<f64>,
    params: &CellCycleParameters,
) -> CellCyclePhase {
    let Some(g1) = g1_duration else {
        return CellCyclePhase::G0;
    };
    let mut boundary = params.m_duration;
    if age < boundary {
        return CellCyclePhase::M;
    }
    boundary += g1;
    if age < boundary {
        return CellCyclePhase::G1;
    }
    boundary += params.s_duration;
    if age < boundary {
        return CellCyclePhase::S;
    }
    boundary += params.g2_duration;
    if age < boundary {
        return CellCyclePhase::G2;
    }
    CellCyclePhase::M
}

pub(crate) fn cycle_complete(
    age: f64,
    g1_duration: Option<f64>,
    params: &CellCycleParameters,
) -> bool {
    g1_duration.is_some_and(|g1| age >= g1 + params.sg2m_duration())
}

/// Generation bookkeeping applied to the parent at division. Stem cells stay
/// at generation zero; transit cells past the limit stop cycling.
pub(crate) fn advance_generation(
    generation: &mut u32,
    properties: &mut CellProperties,
    params: &CellCycleParameters,
) {
    *generation += 1;
    if *generation > params.max_transit_generations {
        properties.cell_type = CellProliferativeType::Differentiated;
    }
    if properties.cell_type == CellProliferativeType::Stem {
        *generation = 0;
    }
}

/// The daughter of a stem cell is a transit cell.
pub(crate) fn demote_stem_daughter(properties: &mut CellProperties) {
    if properties.cell_type == CellProliferativeType::Stem {
        properties.cell_type = CellProliferativeType::Transit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellMutationState;

    #[test]
    fn phases_follow_age_with_mitosis_first() {
        let params = CellCycleParameters::default();
        let g1 = Some(2.0);
        assert_eq!(phase_for_age(0.5, g1, &params), CellCyclePhase::M);
        assert_eq!(phase_for_age(1.5, g1, &params), CellCyclePhase::G1);
        assert_eq!(phase_for_age(3.5, g1, &params), CellCyclePhase::S);
        assert_eq!(phase_for_age(8.5, g1, &params), CellCyclePhase::G2);
        assert_eq!(phase_for_age(12.5, g1, &params), CellCyclePhase::M);
        assert_eq!(phase_for_age(12.5, None, &params), CellCyclePhase::G0);
        assert!(!cycle_complete(11.9, g1, &params));
        assert!(cycle_complete(12.0, g1, &params));
        assert!(!cycle_complete(1e6, None, &params));
    }

    #[test]
    fn transit_cells_differentiate_after_max_generations() {
        let params = CellCycleParameters::default();
        let mut properties = CellProperties {
            cell_type: CellProliferativeType::Transit,
            mutation_state: CellMutationState::Healthy,
        };
        let mut generation = 0;
        for _ in 0..params.max_transit_generations {
            advance_generation(&mut generation, &mut properties, &params);
            assert_eq!(properties.cell_type, CellProliferativeType::Transit);
        }
        advance_generation(&mut generation, &mut properties, &params);
        assert_eq!(properties.cell_type, CellProliferativeType::Differentiated);
    }

    #[test]
    fn stem_cells_stay_at_generation_zero() {
        let params = CellCycleParameters::default();
        let mut properties = CellProperties {
            cell_type: CellProliferativeType::Stem,
            mutation_state: CellMutationState::Healthy,
        };
        let mut generation = 0;
        advance_generation(&mut generation, &mut properties, &params);
        assert_eq!(generation, 0);
        demote_stem_daughter(&mut properties);
        assert_eq!(properties.cell_type, CellProliferativeType::Transit);
    }

    #[test]
    fn missing_field_names_the_model() {
        let params = CellCycleParameters::default();
        let mut rng = <rand::rngs::SmallRng as rand::SeedableRng>::seed_from_u64(0);
        let ctx = CycleContext::new(0.0, 0.1, &params, &mut rng);
        let err = ctx.field_value("SimpleWntCellCycleModel", "Wnt").expect_err("no field");
        assert!(err.to_string().contains("SimpleWntCellCycleModel has no Wnt"));
    }
}
