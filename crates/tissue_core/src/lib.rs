/// The `tissue_core` crate models a population of cells attached to the nodes of
/// a spatial structure and advances it with ODE-driven cell cycles.
///
/// Key components:
/// - **Population**: `CellPopulation`, the node store and the node/cell bijection.
/// - **Cells**: `Cell` lifecycle (division, apoptosis, death) over a pluggable `CellCycleModel`.
/// - **Cycle models**: fixed, stochastic, Wnt, oxygen, Tyson–Novak and Delta–Notch variants.
/// - **Solvers**: Numerical integrators (Forward Euler, RK4, Backward Euler) with stopping events.
/// - **Simulation**: `TissueSimulation`, the per-step update order coupled to a `FieldSolver`.
pub mod cell;
pub mod config;
pub mod cycle;
pub mod error;
pub mod field;
pub mod killers;
pub mod odes;
pub mod population;
pub mod random;
pub mod simulation;
pub mod solvers;
pub mod traits;

pub use cell::{Cell, CellMutationState, CellProliferativeType, CellStatus};
pub use config::{CellCycleParameters, SimulationConfig, TissueConfig};
pub use cycle::{CellCycleModel, CellCyclePhase, CycleContext};
pub use error::{ErrorKind, Result, TissueError};
pub use field::{FieldSolver, NodeField, SourceTerm};
pub use killers::{CellKiller, KillerContext};
pub use population::{CellId, CellPopulation, Node};
pub use random::RandomSource;
pub use simulation::{StepSummary, TissueSimulation};
