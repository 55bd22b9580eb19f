use tracing::debug;

use crate::error::{Result, TissueError};
use crate::killers::{CellKiller, KillerContext};
use crate::population::{CellId, CellPopulation};

/// Sends each living cell into apoptosis with a fixed probability per hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomCellKiller {
    probability_per_hour: f64,
}

impl RandomCellKiller {
    pub fn new(probability_per_hour: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability_per_hour) {
            return Err(TissueError::Usage(format!(
                "death probability must lie in [0, 1], got {probability_per_hour}"
            )));
        }
        Ok(Self {
            probability_per_hour,
        })
    }

    pub fn probability_per_hour(&self) -> f64 {
        self.probability_per_hour
    }
}

impl<const D: usize> CellKiller<D> for RandomCellKiller {
    fn name(&self) -> &'static str {
        "RandomCellKiller"
    }

    fn apply(
        &mut self,
        population: &mut CellPopulation<D>,
        ctx: &mut KillerContext<'_>,
    ) -> Result<usize> {
        let probability = self.probability_per_hour * ctx.dt;
        let candidates: Vec<CellId> = population
            .iter()
            .filter(|(_, cell)| !cell.has_apoptosis_begun() && !cell.is_dead(ctx.time))
            .map(|(id, _)| id)
            .collect();

        let mut flagged = 0;
        for id in candidates {
            if ctx.rng.uniform() < probability {
                population
                    .cell_mut(id)?
                    .start_apoptosis(ctx.time, ctx.params.apoptosis_duration)?;
                flagged += 1;
            }
        }
        if flagged > 0 {
            debug!(flagged, "random killer started apoptosis");
        }
        Ok(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellMutationState, CellProliferativeType, CellStatus};
    use crate::config::CellCycleParameters;
    use crate::cycle::FixedDurationCellCycleModel;
    use nalgebra::Vector1;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn population(n: usize) -> CellPopulation<1> {
        let positions = (0..n).map(|i| Vector1::new(i as f64)).collect();
        let cells = (0..n)
            .map(|_| {
                Cell::new(
                    CellProliferativeType::Differentiated,
                    CellMutationState::Healthy,
                    Box::new(FixedDurationCellCycleModel::new(0.0)),
                )
            })
            .collect();
        CellPopulation::new(positions, cells).expect("population")
    }

    fn apply(killer: &mut RandomCellKiller, population: &mut CellPopulation<1>, dt: f64) -> usize {
        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut ctx = KillerContext {
            time: 1.0,
            dt,
            field: None,
            params: &params,
            rng: &mut rng,
        };
        killer.apply(population, &mut ctx).expect("apply")
    }

    #[test]
    fn certain_death_starts_apoptosis_everywhere() {
        let mut cells = population(20);
        let mut killer = RandomCellKiller::new(1.0).expect("killer");
        assert_eq!(apply(&mut killer, &mut cells, 1.0), 20);
        assert!(cells
            .iter()
            .all(|(_, cell)| cell.status(1.1) == CellStatus::Apoptotic));
        // Already apoptotic cells are skipped rather than re-flagged.
        assert_eq!(apply(&mut killer, &mut cells, 1.0), 0);
    }

    #[test]
    fn zero_probability_spares_everyone() {
        let mut cells = population(20);
        let mut killer = RandomCellKiller::new(0.0).expect("killer");
        assert_eq!(apply(&mut killer, &mut cells, 1.0), 0);
        assert!(RandomCellKiller::new(1.5).is_err());
    }

    #[test]
    fn rate_scales_with_time_step() {
        let mut cells = population(2000);
        let mut killer = RandomCellKiller::new(0.5).expect("killer");
        let flagged = apply(&mut killer, &mut cells, 0.1);
        // Expect 100 of 2000 at probability 0.05 per step.
        assert!((50..150).contains(&flagged), "flagged {flagged}");
    }
}
