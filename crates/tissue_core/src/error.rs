use thiserror::Error;

use crate::population::CellId;

/// Broad classification of a [`TissueError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The node/cell correspondence is corrupted. Never recoverable.
    Structural,
    /// An ODE solve or geometric computation failed for the current step.
    Numerical,
    /// The API was called in a way that cannot succeed.
    Usage,
}

#[derive(Debug, Error)]
pub enum TissueError {
    #[error("node {index} does not appear to have a cell associated with it")]
    OrphanNode { index: usize },
    #[error("location {location} is claimed by more than one cell")]
    DuplicateLocation { location: usize },
    #[error("cell {cell:?} refers to location {location}, which {reason}")]
    InvalidLocation {
        cell: CellId,
        location: usize,
        reason: &'static str,
    },
    #[error(
        "there is not a one-one correspondence between cells and location indices ({cells} cells, {locations} locations)"
    )]
    CorrespondenceMismatch { cells: usize, locations: usize },
    #[error("numerical failure in {context}: {message}")]
    Numerical { context: String, message: String },
    #[error("location index {index} does not correspond to a cell")]
    NoCellAtLocation { index: usize },
    #[error("unknown cell handle {0:?}")]
    UnknownCell(CellId),
    #[error("{model} has no {field} field value for this cell")]
    MissingField {
        model: &'static str,
        field: &'static str,
    },
    #[error("{accessor} is not available on {model}")]
    WrongVariant {
        accessor: &'static str,
        model: &'static str,
    },
    #[error("population has exceeded the maximum of {max} cells")]
    CapacityExceeded { max: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Usage(String),
}

impl TissueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TissueError::OrphanNode { .. }
            | TissueError::DuplicateLocation { .. }
            | TissueError::InvalidLocation { .. }
            | TissueError::CorrespondenceMismatch { .. } => ErrorKind::Structural,
            TissueError::Numerical { .. } => ErrorKind::Numerical,
            TissueError::NoCellAtLocation { .. }
            | TissueError::UnknownCell(_)
            | TissueError::MissingField { .. }
            | TissueError::WrongVariant { .. }
            | TissueError::CapacityExceeded { .. }
            | TissueError::InvalidConfig(_)
            | TissueError::Usage(_) => ErrorKind::Usage,
        }
    }

    /// Wraps a failure reported by the numerical layer.
    pub(crate) fn numerical(context: impl Into<String>, err: anyhow::Error) -> Self {
        TissueError::Numerical {
            context: context.into(),
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, TissueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_name_the_node() {
        let err = TissueError::OrphanNode { index: 7 };
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(
            err.to_string(),
            "node 7 does not appear to have a cell associated with it"
        );
    }

    #[test]
    fn numerical_errors_keep_the_full_chain() {
        let inner = anyhow::anyhow!("Jacobian is singular.").context("backward Euler step");
        let err = TissueError::numerical("cell 3", inner);
        assert_eq!(err.kind(), ErrorKind::Numerical);
        let message = err.to_string();
        assert!(message.contains("cell 3"));
        assert!(message.contains("backward Euler step"));
        assert!(message.contains("Jacobian is singular."));
    }
}
