use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cycle::{CellCycleModel, CellCyclePhase, CycleContext};
use crate::error::{Result, TissueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellProliferativeType {
    Stem,
    Transit,
    Differentiated,
    Necrotic,
}

impl CellProliferativeType {
    pub const ALL: [CellProliferativeType; 4] = [
        CellProliferativeType::Stem,
        CellProliferativeType::Transit,
        CellProliferativeType::Differentiated,
        CellProliferativeType::Necrotic,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellMutationState {
    Healthy,
    Labelled,
    ApcOneHit,
    ApcTwoHit,
    BetaCateninOneHit,
}

impl CellMutationState {
    pub const ALL: [CellMutationState; 5] = [
        CellMutationState::Healthy,
        CellMutationState::Labelled,
        CellMutationState::ApcOneHit,
        CellMutationState::ApcTwoHit,
        CellMutationState::BetaCateninOneHit,
    ];
}

/// Life status, orthogonal to the cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStatus {
    Alive,
    Apoptotic,
    Dead,
}

/// The part of a cell its cycle model may inspect and reclassify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellProperties {
    pub cell_type: CellProliferativeType,
    pub mutation_state: CellMutationState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Apoptosis {
    onset: f64,
    death_time: f64,
}

/// A biological cell. Its location in space is owned by the population.
pub struct Cell {
    properties: CellProperties,
    cycle_model: Box<dyn CellCycleModel>,
    ancestor: Option<usize>,
    apoptosis: Option<Apoptosis>,
    dead: bool,
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("properties", &self.properties)
            .field("cycle_model", &self.cycle_model.name())
            .field("phase", &self.cycle_model.phase())
            .field("ancestor", &self.ancestor)
            .field("apoptosis", &self.apoptosis)
            .field("dead", &self.dead)
            .finish()
    }
}

impl Cell {
    pub fn new(
        cell_type: CellProliferativeType,
        mutation_state: CellMutationState,
        cycle_model: Box<dyn CellCycleModel>,
    ) -> Self {
        Self {
            properties: CellProperties {
                cell_type,
                mutation_state,
            },
            cycle_model,
            ancestor: None,
            apoptosis: None,
            dead: false,
        }
    }

    pub fn properties(&self) -> CellProperties {
        self.properties
    }

    pub fn cell_type(&self) -> CellProliferativeType {
        self.properties.cell_type
    }

    pub fn set_cell_type(&mut self, cell_type: CellProliferativeType) {
        self.properties.cell_type = cell_type;
    }

    pub fn mutation_state(&self) -> CellMutationState {
        self.properties.mutation_state
    }

    pub fn set_mutation_state(&mut self, mutation_state: CellMutationState) {
        self.properties.mutation_state = mutation_state;
    }

    pub fn ancestor(&self) -> Option<usize> {
        self.ancestor
    }

    pub fn set_ancestor(&mut self, ancestor: usize) {
        self.ancestor = Some(ancestor);
    }

    pub fn cycle_model(&self) -> &dyn CellCycleModel {
        self.cycle_model.as_ref()
    }

    pub fn cycle_model_mut(&mut self) -> &mut dyn CellCycleModel {
        self.cycle_model.as_mut()
    }

    pub fn phase(&self) -> CellCyclePhase {
        self.cycle_model.phase()
    }

    pub fn birth_time(&self) -> f64 {
        self.cycle_model.birth_time()
    }

    pub fn age(&self, now: f64) -> f64 {
        self.cycle_model.age(now)
    }

    pub fn initialise_cycle_model(&mut self, ctx: &mut CycleContext<'_>) -> Result<()> {
        self.cycle_model.initialise(&mut self.properties, ctx)
    }

    /// Advances the cycle model to `ctx.time`. Apoptotic and dead cells never
    /// divide and their cycle model is left untouched.
    pub fn ready_to_divide(&mut self, ctx: &mut CycleContext<'_>) -> Result<bool> {
        if self.dead || self.apoptosis.is_some() {
            return Ok(false);
        }
        self.cycle_model.ready_to_divide(&mut self.properties, ctx)
    }

    /// Resets this cell's cycle and returns the newly created daughter.
    pub fn divide(&mut self, ctx: &mut CycleContext<'_>) -> Result<Cell> {
        if self.dead || self.apoptosis.is_some() {
            return Err(TissueError::Usage(
                "a dead or apoptotic cell cannot divide".into(),
            ));
        }
        self.cycle_model.reset_for_division(&mut self.properties, ctx)?;

        let mut daughter_properties = self.properties;
        let mut daughter_model = self.cycle_model.create_daughter();
        daughter_model.initialise_daughter(&mut daughter_properties, ctx)?;

        Ok(Cell {
            properties: daughter_properties,
            cycle_model: daughter_model,
            ancestor: self.ancestor,
            apoptosis: None,
            dead: false,
        })
    }

    /// Marks the cell dead immediately.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    pub fn start_apoptosis(&mut self, now: f64, duration: f64) -> Result<()> {
        if self.dead {
            return Err(TissueError::Usage(
                "start_apoptosis called on a dead cell".into(),
            ));
        }
        if self.apoptosis.is_some() {
            return Err(TissueError::Usage(
                "start_apoptosis called when already undergoing apoptosis".into(),
            ));
        }
        self.apoptosis = Some(Apoptosis {
            onset: now,
            death_time: now + duration,
        });
        Ok(())
    }

    pub fn has_apoptosis_begun(&self) -> bool {
        self.apoptosis.is_some()
    }

    pub fn apoptosis_onset(&self) -> Option<f64> {
        self.apoptosis.map(|a| a.onset)
    }

    pub fn time_until_death(&self, now: f64) -> Result<f64> {
        self.apoptosis
            .map(|a| a.death_time - now)
            .ok_or_else(|| TissueError::WrongVariant {
                accessor: "time_until_death",
                model: "a cell that is not undergoing apoptosis",
            })
    }

    pub fn is_dead(&self, now: f64) -> bool {
        self.dead || self.apoptosis.is_some_and(|a| now >= a.death_time)
    }

    pub fn status(&self, now: f64) -> CellStatus {
        if self.is_dead(now) {
            CellStatus::Dead
        } else if self.apoptosis.is_some() {
            CellStatus::Apoptotic
        } else {
            CellStatus::Alive
        }
    }
}
