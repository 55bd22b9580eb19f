//! Cell removal policies.
//!
//! A killer only flags cells, either dead at once or entering apoptosis.
//! Removal happens afterwards in [`CellPopulation::remove_dead_cells`], so
//! the set of cells being scanned never changes under a killer.

mod hypoxia;
mod plane;
mod random;

pub use hypoxia::HypoxiaCellKiller;
pub use plane::PlaneCellKiller;
pub use random::RandomCellKiller;

use crate::config::CellCycleParameters;
use crate::field::NodeField;
use crate::population::CellPopulation;
use crate::error::Result;
use crate::random::RandomSource;

pub struct KillerContext<'a> {
    pub time: f64,
    pub dt: f64,
    pub field: Option<&'a NodeField>,
    pub params: &'a CellCycleParameters,
    pub rng: &'a mut dyn RandomSource,
}

pub trait CellKiller<const D: usize> {
    fn name(&self) -> &'static str;

    /// Flags cells for death or apoptosis and returns how many were flagged.
    fn apply(&mut self, population: &mut CellPopulation<D>, ctx: &mut KillerContext<'_>) -> Result<usize>;
}
