use nalgebra::SVector;
use tracing::debug;

use crate::error::{Result, TissueError};
use crate::killers::{CellKiller, KillerContext};
use crate::population::{CellId, CellPopulation};

/// Kills every cell strictly on the side of a plane that its normal points to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneCellKiller<const D: usize> {
    point: SVector<f64, D>,
    normal: SVector<f64, D>,
}

impl<const D: usize> PlaneCellKiller<D> {
    pub fn new(point: SVector<f64, D>, normal: SVector<f64, D>) -> Result<Self> {
        let length = normal.norm();
        if !(length > 0.0) || !length.is_finite() {
            return Err(TissueError::Usage(
                "plane normal must be a non-zero vector".into(),
            ));
        }
        Ok(Self {
            point,
            normal: normal / length,
        })
    }

    pub fn point(&self) -> &SVector<f64, D> {
        &self.point
    }

    /// The unit normal.
    pub fn normal(&self) -> &SVector<f64, D> {
        &self.normal
    }

    fn beyond_plane(&self, position: &SVector<f64, D>) -> bool {
        (position - self.point).dot(&self.normal) > 0.0
    }
}

impl<const D: usize> CellKiller<D> for PlaneCellKiller<D> {
    fn name(&self) -> &'static str {
        "PlaneCellKiller"
    }

    fn apply(
        &mut self,
        population: &mut CellPopulation<D>,
        ctx: &mut KillerContext<'_>,
    ) -> Result<usize> {
        let mut doomed: Vec<CellId> = Vec::new();
        for (id, cell) in population.iter() {
            if cell.is_dead(ctx.time) {
                continue;
            }
            if self.beyond_plane(&population.position_of(id)?) {
                doomed.push(id);
            }
        }
        for &id in &doomed {
            population.cell_mut(id)?.kill();
        }
        if !doomed.is_empty() {
            debug!(killed = doomed.len(), "plane killer");
        }
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellMutationState, CellProliferativeType};
    use crate::config::CellCycleParameters;
    use crate::cycle::FixedDurationCellCycleModel;
    use nalgebra::Vector2;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn kills_cells_with_positive_x_only() {
        let xs = [-1.0, -0.2, 0.0, 0.3, 2.0];
        let positions = xs.iter().map(|&x| Vector2::new(x, x * 0.5)).collect();
        let cells = xs
            .iter()
            .map(|_| {
                Cell::new(
                    CellProliferativeType::Differentiated,
                    CellMutationState::Healthy,
                    Box::new(FixedDurationCellCycleModel::new(0.0)),
                )
            })
            .collect();
        let mut population = CellPopulation::new(positions, cells).expect("population");
        let mut killer =
            PlaneCellKiller::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)).expect("killer");

        let params = CellCycleParameters::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut ctx = KillerContext {
            time: 0.0,
            dt: 0.01,
            field: None,
            params: &params,
            rng: &mut rng,
        };
        assert_eq!(killer.apply(&mut population, &mut ctx).expect("apply"), 2);

        for (index, &x) in xs.iter().enumerate() {
            let id = population.cell_at_location(index).expect("cell");
            assert_eq!(population.cell(id).expect("live").is_dead(0.0), x > 0.0, "x = {x}");
        }
        assert_eq!(population.num_cells(), xs.len());
        // Cells already flagged are not counted a second time.
        assert_eq!(killer.apply(&mut population, &mut ctx).expect("apply"), 0);
        assert_eq!(population.remove_dead_cells(0.0), 2);
    }

    #[test]
    fn normal_is_normalised_and_must_be_non_zero() {
        let killer =
            PlaneCellKiller::new(Vector2::new(1.0, 1.0), Vector2::new(0.0, -4.0)).expect("killer");
        assert_eq!(killer.normal(), &Vector2::new(0.0, -1.0));
        assert!(PlaneCellKiller::new(Vector2::new(0.0, 0.0), Vector2::zeros()).is_err());
    }
}
