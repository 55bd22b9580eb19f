use anyhow::{bail, Result};

use crate::solvers::{IvpSolver, OdeSolverSettings};
use crate::traits::DynamicalSystem;

/// Per-cell ODE state advanced lazily to the simulation clock.
///
/// Once the stopping event fires the state is frozen at the stopping time:
/// later calls to [`OdeCycleState::solve_to_time`] report the event again
/// without integrating any further, until [`OdeCycleState::restart`].
#[derive(Debug, Clone)]
pub struct OdeCycleState {
    state: Vec<f64>,
    last_time: f64,
    stopping_time: Option<f64>,
    solver: IvpSolver,
}

impl OdeCycleState {
    pub fn new(initial_conditions: Vec<f64>, start_time: f64, settings: OdeSolverSettings) -> Self {
        Self {
            state: initial_conditions,
            last_time: start_time,
            stopping_time: None,
            solver: IvpSolver::new(settings),
        }
    }

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut [f64] {
        &mut self.state
    }

    /// Time up to which the state has been integrated.
    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn stopping_time(&self) -> Option<f64> {
        self.stopping_time
    }

    pub fn finished(&self) -> bool {
        self.stopping_time.is_some()
    }

    pub fn solver_settings(&self) -> &OdeSolverSettings {
        self.solver.settings()
    }

    /// Overwrites a slot that the system holds constant, such as an external
    /// field level.
    pub fn pin(&mut self, slot: usize, value: f64) -> Result<()> {
        let dim = self.state.len();
        match self.state.get_mut(slot) {
            Some(entry) => *entry = value,
            None => bail!("Pinned slot {} is outside the state of dimension {}.", slot, dim),
        }
        Ok(())
    }

    /// Integrates from the last solved time to `time` and reports whether the
    /// stopping event has occurred. Times at or before the last solved time
    /// are a no-op.
    pub fn solve_to_time<S: DynamicalSystem<f64>>(&mut self, system: &S, time: f64) -> Result<bool> {
        if self.stopping_time.is_some() {
            return Ok(true);
        }
        if time <= self.last_time {
            return Ok(false);
        }
        let outcome = self
            .solver
            .solve(system, &mut self.state, self.last_time, time)?;
        match outcome.stopping_time {
            Some(stop) => {
                self.last_time = stop;
                self.stopping_time = Some(stop);
                Ok(true)
            }
            None => {
                self.last_time = time;
                Ok(false)
            }
        }
    }

    /// Clears the stopping event and continues integration from `time` with
    /// the current state.
    pub fn restart(&mut self, time: f64) {
        self.stopping_time = None;
        self.last_time = time;
    }
}
