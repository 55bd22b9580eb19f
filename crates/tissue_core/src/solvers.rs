use crate::traits::{DynamicalSystem, Scalar, Steppable};
use anyhow::{anyhow, bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Explicit (forward) Euler stepper.
pub struct ForwardEuler<T: Scalar> {
    k: Vec<T>,
}

impl<T: Scalar> ForwardEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k: vec![T::from_f64(0.0).unwrap(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for ForwardEuler<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        system.apply(*t, state, &mut self.k);
        for (y, k) in state.iter_mut().zip(&self.k) {
            *y = *y + dt * *k;
        }
        *t = *t + dt;
        Ok(())
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::from_f64(0.0).unwrap();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();
        let t0 = *t;

        system.apply(t0, state, &mut self.k1);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
        Ok(())
    }
}

/// Implicit (backward) Euler stepper for stiff systems.
///
/// Each step solves `z - y - dt f(t + dt, z) = 0` with Newton iterations.
/// The Jacobian of `f` is approximated by forward differences.
pub struct BackwardEuler {
    settings: NewtonSettings,
    residual: Vec<f64>,
    f_base: Vec<f64>,
    f_shift: Vec<f64>,
    probe: Vec<f64>,
}

impl BackwardEuler {
    pub fn new(dim: usize, settings: NewtonSettings) -> Self {
        Self {
            settings,
            residual: vec![0.0; dim],
            f_base: vec![0.0; dim],
            f_shift: vec![0.0; dim],
            probe: vec![0.0; dim],
        }
    }

    fn evaluate_residual(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t_next: f64,
        previous: &[f64],
        guess: &[f64],
        dt: f64,
    ) {
        system.apply(t_next, guess, &mut self.f_base);
        for i in 0..guess.len() {
            self.residual[i] = guess[i] - previous[i] - dt * self.f_base[i];
        }
    }

    /// Jacobian of the Newton residual, `I - dt * df/dz`, row-major.
    fn residual_jacobian(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t_next: f64,
        guess: &[f64],
        dt: f64,
    ) -> Vec<f64> {
        let dim = guess.len();
        let mut jacobian = vec![0.0; dim * dim];
        system.apply(t_next, guess, &mut self.f_base);
        for j in 0..dim {
            self.probe.copy_from_slice(guess);
            let h = f64::EPSILON.sqrt() * guess[j].abs().max(1.0);
            self.probe[j] += h;
            system.apply(t_next, &self.probe, &mut self.f_shift);
            for i in 0..dim {
                let df = (self.f_shift[i] - self.f_base[i]) / h;
                jacobian[i * dim + j] = if i == j { 1.0 } else { 0.0 } - dt * df;
            }
        }
        jacobian
    }
}

impl Steppable<f64> for BackwardEuler {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) -> Result<()> {
        let dim = state.len();
        let t_next = *t + dt;
        let previous = state.to_vec();
        let mut guess = state.to_vec();

        let mut iterations = 0usize;
        loop {
            self.evaluate_residual(system, t_next, &previous, &guess, dt);
            let residual_norm = l2_norm(&self.residual);
            if residual_norm <= self.settings.tolerance {
                break;
            }
            if iterations >= self.settings.max_iterations {
                bail!(
                    "Backward Euler Newton iteration failed to converge in {} steps at t = {} (‖r‖ = {}).",
                    self.settings.max_iterations,
                    t_next,
                    residual_norm
                );
            }

            let jacobian = self.residual_jacobian(system, t_next, &guess, dt);
            let delta = solve_linear_system(dim, &jacobian, &self.residual)
                .context("Failed to solve linear system during backward Euler step.")?;
            for i in 0..dim {
                guess[i] -= delta[i];
            }
            iterations += 1;

            if l2_norm(&delta) <= self.settings.tolerance {
                break;
            }
        }

        state.copy_from_slice(&guess);
        *t = t_next;
        Ok(())
    }
}

fn solve_linear_system(dim: usize, matrix: &[f64], rhs: &[f64]) -> Result<Vec<f64>> {
    let j_matrix = DMatrix::from_row_slice(dim, dim, matrix);
    let rhs = DVector::from_column_slice(rhs);
    j_matrix
        .lu()
        .solve(&rhs)
        .map(|v| v.iter().cloned().collect())
        .ok_or_else(|| anyhow!("Jacobian is singular."))
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IvpMethod {
    ForwardEuler,
    Rk4,
    BackwardEuler,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdeSolverSettings {
    pub method: IvpMethod,
    pub dt: f64,
    #[serde(default)]
    pub newton: NewtonSettings,
}

impl OdeSolverSettings {
    pub fn new(method: IvpMethod, dt: f64) -> Self {
        Self {
            method,
            dt,
            newton: NewtonSettings::default(),
        }
    }
}

impl Default for OdeSolverSettings {
    fn default() -> Self {
        Self::new(IvpMethod::Rk4, 1e-4)
    }
}

enum InternalStepper {
    Euler(ForwardEuler<f64>),
    Rk4(RK4<f64>),
    Implicit(BackwardEuler),
}

impl InternalStepper {
    fn build(settings: &OdeSolverSettings, dim: usize) -> Self {
        match settings.method {
            IvpMethod::ForwardEuler => InternalStepper::Euler(ForwardEuler::new(dim)),
            IvpMethod::Rk4 => InternalStepper::Rk4(RK4::new(dim)),
            IvpMethod::BackwardEuler => {
                InternalStepper::Implicit(BackwardEuler::new(dim, settings.newton))
            }
        }
    }

    fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) -> Result<()> {
        match self {
            InternalStepper::Euler(s) => s.step(system, t, state, dt),
            InternalStepper::Rk4(s) => s.step(system, t, state, dt),
            InternalStepper::Implicit(s) => s.step(system, t, state, dt),
        }
    }
}

/// Result of integrating over an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOutcome {
    /// Time at which the stopping event fired, if it did.
    pub stopping_time: Option<f64>,
}

impl SolveOutcome {
    pub fn stopping_event_occurred(&self) -> bool {
        self.stopping_time.is_some()
    }
}

/// Fixed-step initial value problem solver with stopping-event detection.
#[derive(Debug, Clone, Copy)]
pub struct IvpSolver {
    settings: OdeSolverSettings,
}

impl IvpSolver {
    pub fn new(settings: OdeSolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OdeSolverSettings {
        &self.settings
    }

    /// Advances `state` from `start_time` to `end_time` in steps of at most `dt`,
    /// overwriting it with the solution. Integration halts at the first step
    /// after which the system's stopping event holds; `state` then holds the
    /// values at the stopping time.
    pub fn solve_and_update_state<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        state: &mut [f64],
        start_time: f64,
        end_time: f64,
        dt: f64,
    ) -> Result<SolveOutcome> {
        let dim = system.dimension();
        if state.len() != dim {
            bail!(
                "State dimension mismatch. Expected {}, got {}.",
                dim,
                state.len()
            );
        }
        if !(dt > 0.0) || !dt.is_finite() {
            bail!("Step size dt must be positive.");
        }
        if end_time < start_time {
            bail!(
                "End time {} precedes start time {}.",
                end_time,
                start_time
            );
        }
        if system.stopping_event(start_time, state) {
            bail!("Stopping event is true for initial condition at t = {}.", start_time);
        }
        let span = end_time - start_time;
        if span == 0.0 {
            return Ok(SolveOutcome {
                stopping_time: None,
            });
        }

        let steps = ((span / dt) - 1e-10).ceil().max(1.0) as usize;
        let mut stepper = InternalStepper::build(&self.settings, dim);
        let mut t = start_time;
        for k in 0..steps {
            let next = if k + 1 == steps {
                end_time
            } else {
                start_time + (k + 1) as f64 * dt
            };
            let h = next - t;
            stepper.step(system, &mut t, state, h)?;
            t = next;

            if let Some(bad) = state.iter().position(|v| !v.is_finite()) {
                bail!(
                    "State variable {} became non-finite at t = {}.",
                    bad,
                    t
                );
            }
            if system.stopping_event(t, state) {
                return Ok(SolveOutcome {
                    stopping_time: Some(t),
                });
            }
        }

        Ok(SolveOutcome {
            stopping_time: None,
        })
    }

    /// Convenience wrapper using the configured step size.
    pub fn solve<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        state: &mut [f64],
        start_time: f64,
        end_time: f64,
    ) -> Result<SolveOutcome> {
        self.solve_and_update_state(system, state, start_time, end_time, self.settings.dt)
    }
}
