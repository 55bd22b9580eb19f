use rand::Rng;
use rand_distr::StandardNormal;

/// Source of random deviates consumed by stochastic cell cycle models,
/// killers and division placement.
pub trait RandomSource {
    /// A sample from N(mean, sd²).
    fn normal_deviate(&mut self, mean: f64, sd: f64) -> f64;

    /// A sample from U[0, 1).
    fn uniform(&mut self) -> f64;
}

impl<R: Rng> RandomSource for R {
    fn normal_deviate(&mut self, mean: f64, sd: f64) -> f64 {
        let z: f64 = self.sample(StandardNormal);
        mean + sd * z
    }

    fn uniform(&mut self) -> f64 {
        self.random::<f64>()
    }
}
