//! The spatial population store.
//!
//! Nodes are kept in a dense vector indexed by their location index; cells
//! live in a generational arena so handles stay valid across insertion,
//! removal and renumbering. The node/cell bijection is recorded in both
//! directions and checked by [`CellPopulation::validate`].

use nalgebra::SVector;
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::cell::{Cell, CellMutationState, CellProliferativeType};
use crate::cycle::CellCyclePhase;
use crate::error::{Result, TissueError};

new_key_type! {
    /// Stable handle for a cell in a [`CellPopulation`].
    pub struct CellId;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node<const D: usize> {
    index: usize,
    position: SVector<f64, D>,
    boundary: bool,
    deleted: bool,
}

impl<const D: usize> Node<D> {
    pub fn new(index: usize, position: SVector<f64, D>) -> Self {
        Self {
            index,
            position,
            boundary: false,
            deleted: false,
        }
    }

    pub fn with_boundary(mut self, boundary: bool) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> &SVector<f64, D> {
        &self.position
    }

    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Cells bound one-to-one to the non-deleted nodes of a point set.
#[derive(Debug)]
pub struct CellPopulation<const D: usize> {
    nodes: Vec<Node<D>>,
    cells: SlotMap<CellId, Cell>,
    cell_locations: SecondaryMap<CellId, usize>,
    location_cells: BTreeMap<usize, CellId>,
}

impl<const D: usize> CellPopulation<D> {
    /// Binds `cells[i]` to the node at position `i`.
    pub fn new(positions: Vec<SVector<f64, D>>, cells: Vec<Cell>) -> Result<Self> {
        let locations: Vec<usize> = (0..cells.len()).collect();
        let nodes = positions
            .into_iter()
            .enumerate()
            .map(|(index, position)| Node::new(index, position))
            .collect();
        Self::with_location_indices(nodes, cells, &locations)
    }

    /// Binds `cells[i]` to the node with index `locations[i]`. Node indices
    /// are reassigned to match their position in `nodes`.
    pub fn with_location_indices(
        mut nodes: Vec<Node<D>>,
        cells: Vec<Cell>,
        locations: &[usize],
    ) -> Result<Self> {
        if cells.len() != locations.len() {
            return Err(TissueError::CorrespondenceMismatch {
                cells: cells.len(),
                locations: locations.len(),
            });
        }
        for (index, node) in nodes.iter_mut().enumerate() {
            node.index = index;
        }

        let mut population = Self {
            nodes,
            cells: SlotMap::with_capacity_and_key(cells.len()),
            cell_locations: SecondaryMap::new(),
            location_cells: BTreeMap::new(),
        };
        for (cell, &location) in cells.into_iter().zip(locations) {
            let id = population.cells.insert(cell);
            population.cell_locations.insert(id, location);
            if population.location_cells.insert(location, id).is_some() {
                return Err(TissueError::DuplicateLocation { location });
            }
        }
        population.validate()?;
        debug!(
            cells = population.cells.len(),
            nodes = population.nodes.len(),
            "created cell population"
        );
        Ok(population)
    }

    /// Checks the node/cell bijection in both directions.
    pub fn validate(&self) -> Result<()> {
        for (id, &location) in &self.cell_locations {
            if !self.cells.contains_key(id) {
                return Err(TissueError::UnknownCell(id));
            }
            let Some(node) = self.nodes.get(location) else {
                return Err(TissueError::InvalidLocation {
                    cell: id,
                    location,
                    reason: "is not a node index",
                });
            };
            if node.deleted {
                return Err(TissueError::InvalidLocation {
                    cell: id,
                    location,
                    reason: "is a deleted node",
                });
            }
            match self.location_cells.get(&location) {
                Some(&owner) if owner == id => {}
                Some(_) => return Err(TissueError::DuplicateLocation { location }),
                None => {
                    return Err(TissueError::InvalidLocation {
                        cell: id,
                        location,
                        reason: "has no entry in the location map",
                    })
                }
            }
        }
        if self.cell_locations.len() != self.cells.len()
            || self.location_cells.len() != self.cells.len()
        {
            return Err(TissueError::CorrespondenceMismatch {
                cells: self.cells.len(),
                locations: self.location_cells.len(),
            });
        }
        for node in self.nodes.iter().filter(|node| !node.deleted) {
            if !self.location_cells.contains_key(&node.index) {
                return Err(TissueError::OrphanNode { index: node.index });
            }
        }
        Ok(())
    }

    /// Places `cell` on a new node at `position` and returns its handle.
    pub fn add_cell(&mut self, cell: Cell, position: SVector<f64, D>) -> CellId {
        let index = self.nodes.len();
        self.nodes.push(Node::new(index, position));
        let id = self.cells.insert(cell);
        self.cell_locations.insert(id, index);
        self.location_cells.insert(index, id);
        trace!(?id, index, "added cell");
        id
    }

    pub fn move_cell(&mut self, id: CellId, position: SVector<f64, D>) -> Result<()> {
        let location = self.location_of(id)?;
        self.nodes[location].position = position;
        Ok(())
    }

    /// Deletes every cell that is dead at `now` and marks its node deleted.
    /// Node indices are left untouched until [`CellPopulation::remesh`].
    pub fn remove_dead_cells(&mut self, now: f64) -> usize {
        let dead: Vec<CellId> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.is_dead(now))
            .map(|(id, _)| id)
            .collect();
        for &id in &dead {
            self.cells.remove(id);
            if let Some(location) = self.cell_locations.remove(id) {
                self.location_cells.remove(&location);
                if let Some(node) = self.nodes.get_mut(location) {
                    node.deleted = true;
                }
            }
        }
        if !dead.is_empty() {
            debug!(removed = dead.len(), remaining = self.cells.len(), "removed dead cells");
        }
        dead.len()
    }

    /// Drops deleted nodes, renumbers the rest contiguously in their existing
    /// order and moves every cell to its node's new index, then validates.
    pub fn remesh(&mut self) -> Result<()> {
        if self.nodes.iter().any(|node| node.deleted) {
            let mut new_index = vec![None; self.nodes.len()];
            let mut next = 0;
            for node in &self.nodes {
                if !node.deleted {
                    new_index[node.index] = Some(next);
                    next += 1;
                }
            }
            let before = self.nodes.len();
            self.nodes.retain(|node| !node.deleted);
            for (index, node) in self.nodes.iter_mut().enumerate() {
                node.index = index;
            }

            self.location_cells.clear();
            for (id, location) in self.cell_locations.iter_mut() {
                let Some(renumbered) = new_index.get(*location).copied().flatten() else {
                    return Err(TissueError::InvalidLocation {
                        cell: id,
                        location: *location,
                        reason: "was deleted before remeshing",
                    });
                };
                *location = renumbered;
                self.location_cells.insert(renumbered, id);
            }
            debug!(before, after = self.nodes.len(), "remeshed nodes");
        }
        self.validate()
    }

    /// Number of nodes, including deleted ones awaiting a remesh.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_live_nodes(&self) -> usize {
        self.nodes.iter().filter(|node| !node.deleted).count()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn nodes(&self) -> &[Node<D>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node<D>> {
        self.nodes.get(index)
    }

    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        self.cells.get(id).ok_or(TissueError::UnknownCell(id))
    }

    pub fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell> {
        self.cells.get_mut(id).ok_or(TissueError::UnknownCell(id))
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CellId, &mut Cell)> {
        self.cells.iter_mut()
    }

    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells.keys().collect()
    }

    pub fn location_of(&self, id: CellId) -> Result<usize> {
        self.cell_locations
            .get(id)
            .copied()
            .ok_or(TissueError::UnknownCell(id))
    }

    pub fn cell_at_location(&self, index: usize) -> Result<CellId> {
        self.location_cells
            .get(&index)
            .copied()
            .ok_or(TissueError::NoCellAtLocation { index })
    }

    pub fn position_of(&self, id: CellId) -> Result<SVector<f64, D>> {
        let location = self.location_of(id)?;
        Ok(self.nodes[location].position)
    }

    /// Tags every cell with its current location index as ancestor, so
    /// clonal populations can be traced through later divisions.
    pub fn set_cell_ancestors_to_location_indices(&mut self) {
        for (id, cell) in self.cells.iter_mut() {
            if let Some(&location) = self.cell_locations.get(id) {
                cell.set_ancestor(location);
            }
        }
    }

    pub fn cell_ancestors(&self) -> BTreeSet<usize> {
        self.cells.values().filter_map(Cell::ancestor).collect()
    }

    pub fn cell_type_counts(&self) -> BTreeMap<CellProliferativeType, usize> {
        let mut counts: BTreeMap<_, _> =
            CellProliferativeType::ALL.iter().map(|&t| (t, 0)).collect();
        for cell in self.cells.values() {
            *counts.entry(cell.cell_type()).or_default() += 1;
        }
        counts
    }

    pub fn cell_cycle_phase_counts(&self) -> BTreeMap<CellCyclePhase, usize> {
        let mut counts: BTreeMap<_, _> = CellCyclePhase::ALL.iter().map(|&p| (p, 0)).collect();
        for cell in self.cells.values() {
            *counts.entry(cell.phase()).or_default() += 1;
        }
        counts
    }

    pub fn cell_mutation_state_counts(&self) -> BTreeMap<CellMutationState, usize> {
        let mut counts: BTreeMap<_, _> =
            CellMutationState::ALL.iter().map(|&m| (m, 0)).collect();
        for cell in self.cells.values() {
            *counts.entry(cell.mutation_state()).or_default() += 1;
        }
        counts
    }

    #[cfg(test)]
    pub(crate) fn corrupt_location_for_test(&mut self, index: usize) {
        self.location_cells.remove(&index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::FixedDurationCellCycleModel;
    use crate::error::ErrorKind;
    use nalgebra::Vector2;
    use proptest::prelude::*;

    fn transit_cell() -> Cell {
        Cell::new(
            CellProliferativeType::Transit,
            CellMutationState::Healthy,
            Box::new(FixedDurationCellCycleModel::new(0.0)),
        )
    }

    fn line_population(n: usize) -> CellPopulation<2> {
        let positions = (0..n).map(|i| Vector2::new(i as f64, 0.0)).collect();
        let cells = (0..n).map(|_| transit_cell()).collect();
        CellPopulation::new(positions, cells).expect("valid population")
    }

    fn assert_contiguous(population: &CellPopulation<2>) {
        let mut locations: Vec<usize> = population
            .iter()
            .map(|(id, _)| population.location_of(id).expect("located"))
            .collect();
        locations.sort_unstable();
        let expected: Vec<usize> = (0..population.num_nodes()).collect();
        assert_eq!(locations, expected);
        for (i, node) in population.nodes().iter().enumerate() {
            assert_eq!(node.index(), i);
            assert!(!node.is_deleted());
        }
    }

    #[test]
    fn removing_a_cell_then_remeshing_compacts_nodes() {
        let mut population = line_population(3);
        let middle = population.cell_at_location(1).expect("cell at node 1");
        let last = population.cell_at_location(2).expect("cell at node 2");
        population.cell_mut(middle).expect("live").kill();

        assert_eq!(population.remove_dead_cells(0.0), 1);
        assert_eq!(population.num_nodes(), 3);
        assert_eq!(population.num_live_nodes(), 2);
        assert!(population.node(1).expect("raw node").is_deleted());
        population.validate().expect("still consistent before remesh");

        population.remesh().expect("remesh");
        assert_eq!(population.num_nodes(), 2);
        assert_contiguous(&population);
        assert_eq!(population.location_of(last).expect("located"), 1);
        assert_eq!(population.position_of(last).expect("located"), Vector2::new(2.0, 0.0));
    }

    #[test]
    fn mismatched_locations_are_rejected() {
        let nodes = vec![Node::new(0, Vector2::new(0.0, 0.0)), Node::new(1, Vector2::new(1.0, 0.0))];
        let err = CellPopulation::with_location_indices(nodes, vec![transit_cell()], &[0, 1])
            .expect_err("count mismatch");
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("one-one correspondence"));
    }

    #[test]
    fn node_without_a_cell_fails_validation() {
        let nodes = vec![Node::new(0, Vector2::new(0.0, 0.0)), Node::new(1, Vector2::new(1.0, 0.0))];
        let err = CellPopulation::with_location_indices(nodes, vec![transit_cell()], &[1])
            .expect_err("orphan node");
        assert_eq!(
            err.to_string(),
            "node 0 does not appear to have a cell associated with it"
        );
    }

    #[test]
    fn shared_location_is_rejected() {
        let nodes = vec![Node::new(0, Vector2::new(0.0, 0.0)), Node::new(1, Vector2::new(1.0, 0.0))];
        let err = CellPopulation::with_location_indices(
            nodes,
            vec![transit_cell(), transit_cell()],
            &[1, 1],
        )
        .expect_err("duplicate");
        assert!(matches!(err, TissueError::DuplicateLocation { location: 1 }));
    }

    #[test]
    fn corruption_surfaces_at_remesh() {
        let mut population = line_population(3);
        population.corrupt_location_for_test(2);
        let err = population.remesh().expect_err("corrupted");
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn added_cells_get_fresh_indices_until_remesh() {
        let mut population = line_population(2);
        let first = population.cell_at_location(0).expect("cell");
        population.cell_mut(first).expect("live").kill();
        population.remove_dead_cells(0.0);

        let added = population.add_cell(transit_cell(), Vector2::new(5.0, 5.0));
        assert_eq!(population.location_of(added).expect("located"), 2);
        assert!(!population.node(2).expect("node").is_boundary());
        population.validate().expect("consistent");

        population.remesh().expect("remesh");
        assert_eq!(population.location_of(added).expect("located"), 1);
        assert_contiguous(&population);
    }

    #[test]
    fn move_cell_only_changes_position() {
        let mut population = line_population(2);
        let id = population.cell_at_location(1).expect("cell");
        population.move_cell(id, Vector2::new(-3.0, 4.0)).expect("move");
        assert_eq!(population.position_of(id).expect("located"), Vector2::new(-3.0, 4.0));
        assert_eq!(population.location_of(id).expect("located"), 1);
        assert!(population.cell_at_location(7).is_err());
    }

    #[test]
    fn removed_handles_are_unknown() {
        let mut population = line_population(2);
        let id = population.cell_at_location(0).expect("cell");
        population.cell_mut(id).expect("live").kill();
        population.remove_dead_cells(0.0);
        assert!(matches!(population.cell(id), Err(TissueError::UnknownCell(_))));
        assert!(population.move_cell(id, Vector2::zeros()).is_err());
    }

    #[test]
    fn census_and_ancestors() {
        let mut population = line_population(3);
        let id = population.cell_at_location(2).expect("cell");
        population.cell_mut(id).expect("live").set_mutation_state(CellMutationState::ApcOneHit);
        population.set_cell_ancestors_to_location_indices();

        let types = population.cell_type_counts();
        assert_eq!(types[&CellProliferativeType::Transit], 3);
        assert_eq!(types[&CellProliferativeType::Stem], 0);
        let mutations = population.cell_mutation_state_counts();
        assert_eq!(mutations[&CellMutationState::Healthy], 2);
        assert_eq!(mutations[&CellMutationState::ApcOneHit], 1);
        let phases = population.cell_cycle_phase_counts();
        assert_eq!(phases.values().sum::<usize>(), 3);
        assert_eq!(population.cell_ancestors(), BTreeSet::from([0, 1, 2]));
    }

    proptest! {
        #[test]
        fn bijection_survives_random_edits(
            initial in 1usize..8,
            rounds in prop::collection::vec((0usize..4, prop::collection::vec(any::<bool>(), 0..12)), 1..10)
        ) {
            let mut population = line_population(initial);
            for (births, kills) in rounds {
                for ((_, cell), kill) in population.iter_mut().zip(kills) {
                    if kill {
                        cell.kill();
                    }
                }
                population.remove_dead_cells(0.0);
                prop_assert!(population.validate().is_ok());
                for b in 0..births {
                    population.add_cell(transit_cell(), Vector2::new(b as f64, 1.0));
                }
                prop_assert!(population.validate().is_ok());
                population.remesh().map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(population.num_nodes(), population.num_cells());
                for (i, node) in population.nodes().iter().enumerate() {
                    prop_assert_eq!(node.index(), i);
                    let id = population.cell_at_location(i).map_err(|e| TestCaseError::fail(e.to_string()))?;
                    prop_assert_eq!(population.location_of(id).ok(), Some(i));
                }
            }
        }
    }
}
