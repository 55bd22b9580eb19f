//! Biochemical ODE systems driving the ODE-based cell cycle models.
//!
//! All systems are written in hours. Slots holding an external field value
//! (Wnt level, mean neighbour Delta) have a zero derivative so the value stays
//! pinned across a solve.

pub mod delta_notch;
pub mod tyson_novak;
pub mod wnt;

pub use delta_notch::DeltaNotchOde;
pub use tyson_novak::TysonNovakOde;
pub use wnt::WntCellCycleOde;
