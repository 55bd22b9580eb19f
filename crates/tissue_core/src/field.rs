//! Coupling to the external field solver.
//!
//! A [`FieldSolver`] receives the node positions and a source term per node
//! and returns one scalar value per node. The PDE machinery behind it is
//! outside this crate; [`UniformField`] and [`LinearGradientField`] are
//! closed-form providers for fields that need no solve.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::error::TissueError;
use crate::population::Node;

/// Scalar field sampled at every node, indexed by node index.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeField {
    values: Vec<f64>,
}

impl NodeField {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, index: usize) -> crate::Result<f64> {
        self.values.get(index).copied().ok_or_else(|| {
            TissueError::Usage(format!(
                "field has {} values and none for node {index}",
                self.values.len()
            ))
        })
    }
}

/// Source contribution of one node: `constant + linear_in_u * u`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceTerm {
    pub constant: f64,
    pub linear_in_u: f64,
}

pub trait FieldSolver<const D: usize> {
    /// Produces the field at `time`. `sources` is indexed like `nodes`.
    fn solve(&mut self, time: f64, nodes: &[Node<D>], sources: &[SourceTerm]) -> Result<NodeField>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformField {
    pub value: f64,
}

impl UniformField {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl<const D: usize> FieldSolver<D> for UniformField {
    fn solve(&mut self, _time: f64, nodes: &[Node<D>], _sources: &[SourceTerm]) -> Result<NodeField> {
        Ok(NodeField::new(vec![self.value; nodes.len()]))
    }
}

/// `max(0, 1 - x / length)` along one coordinate axis, as for a Wnt
/// gradient falling from the base of a crypt to its top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearGradientField {
    axis: usize,
    length: f64,
}

impl LinearGradientField {
    pub fn new(axis: usize, length: f64) -> crate::Result<Self> {
        if !(length > 0.0) || !length.is_finite() {
            return Err(TissueError::InvalidConfig(format!(
                "gradient length must be positive and finite, got {length}"
            )));
        }
        Ok(Self { axis, length })
    }

    pub fn value_at(&self, coordinate: f64) -> f64 {
        (1.0 - coordinate / self.length).max(0.0)
    }
}

impl<const D: usize> FieldSolver<D> for LinearGradientField {
    fn solve(&mut self, _time: f64, nodes: &[Node<D>], _sources: &[SourceTerm]) -> Result<NodeField> {
        if self.axis >= D {
            bail!("Gradient axis {} is out of range for dimension {}.", self.axis, D);
        }
        let values = nodes
            .iter()
            .map(|node| self.value_at(node.position()[self.axis]))
            .collect();
        Ok(NodeField::new(values))
    }
}
