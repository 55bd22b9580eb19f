use crate::traits::DynamicalSystem;

pub const NOTCH: usize = 0;
pub const DELTA: usize = 1;
/// Index of the pinned mean Delta level of the cell's neighbours.
pub const MEAN_DELTA: usize = 2;

/// Lateral inhibition between neighbouring cells (Collier et al., 1996).
///
/// State: `[Notch, Delta, mean neighbour Delta]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaNotchOde;

impl DeltaNotchOde {
    pub fn initial_conditions(mean_delta: f64) -> Vec<f64> {
        vec![1.0, 1.0, mean_delta]
    }
}

impl DynamicalSystem<f64> for DeltaNotchOde {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let notch = x[NOTCH];
        let delta = x[DELTA];
        let mean_delta = x[MEAN_DELTA];

        out[NOTCH] = mean_delta * mean_delta / (0.01 + mean_delta * mean_delta) - notch;
        out[DELTA] = 1.0 / (1.0 + 100.0 * notch * notch) - delta;
        out[MEAN_DELTA] = 0.0;
    }
}
