use slotmap::SecondaryMap;
use tracing::{debug, trace};

use crate::cell::CellProliferativeType;
use crate::error::{Result, TissueError};
use crate::killers::{CellKiller, KillerContext};
use crate::population::{CellId, CellPopulation};

/// Turns cells necrotic after prolonged hypoxia and starts apoptosis in
/// necrotic cells.
///
/// A cell whose oxygen level has stayed below the hypoxic concentration for
/// longer than the critical hypoxic duration becomes necrotic with
/// probability `0.9 - 0.5 * c / c_hypoxic` on each application.
#[derive(Debug, Clone, Default)]
pub struct HypoxiaCellKiller {
    hypoxia_onset: SecondaryMap<CellId, f64>,
}

impl HypoxiaCellKiller {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long `id` has been continuously hypoxic at `now`.
    pub fn hypoxic_duration(&self, id: CellId, now: f64) -> f64 {
        self.hypoxia_onset
            .get(id)
            .map(|onset| now - onset)
            .unwrap_or(0.0)
    }
}

impl<const D: usize> CellKiller<D> for HypoxiaCellKiller {
    fn name(&self) -> &'static str {
        "HypoxiaCellKiller"
    }

    fn apply(
        &mut self,
        population: &mut CellPopulation<D>,
        ctx: &mut KillerContext<'_>,
    ) -> Result<usize> {
        let field = ctx.field.ok_or(TissueError::MissingField {
            model: "HypoxiaCellKiller",
            field: "oxygen",
        })?;
        let hypoxic_level = ctx.params.hypoxic_concentration;

        let mut became_necrotic = Vec::new();
        let mut to_apoptose = Vec::new();
        for (id, cell) in population.iter() {
            if cell.has_apoptosis_begun() || cell.is_dead(ctx.time) {
                continue;
            }
            if cell.cell_type() == CellProliferativeType::Necrotic {
                to_apoptose.push(id);
                continue;
            }
            let oxygen = field.value(population.location_of(id)?)?;
            if oxygen >= hypoxic_level {
                self.hypoxia_onset.remove(id);
                continue;
            }
            let onset = match self.hypoxia_onset.get(id) {
                Some(&onset) => onset,
                None => {
                    self.hypoxia_onset.insert(id, ctx.time);
                    ctx.time
                }
            };
            if ctx.time - onset > ctx.params.critical_hypoxic_duration {
                let probability_of_death = 0.9 - 0.5 * oxygen / hypoxic_level;
                if ctx.rng.uniform() < probability_of_death {
                    trace!(?id, oxygen, "cell became necrotic");
                    became_necrotic.push(id);
                }
            }
        }

        for &id in &became_necrotic {
            population.cell_mut(id)?.set_cell_type(CellProliferativeType::Necrotic);
            self.hypoxia_onset.remove(id);
        }
        to_apoptose.extend(became_necrotic);
        for &id in &to_apoptose {
            population
                .cell_mut(id)?
                .start_apoptosis(ctx.time, ctx.params.apoptosis_duration)?;
        }
        self.hypoxia_onset.retain(|id, _| population.contains(id));

        if !to_apoptose.is_empty() {
            debug!(flagged = to_apoptose.len(), "hypoxia killer started apoptosis");
        }
        Ok(to_apoptose.len())
    }
}
