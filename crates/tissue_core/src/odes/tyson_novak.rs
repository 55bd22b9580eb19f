use crate::traits::DynamicalSystem;

/// Index of cyclin B in the state vector.
pub const CYCLIN_B: usize = 0;
/// Index of cell mass in the state vector.
pub const MASS: usize = 5;

/// Tyson & Novak (2001) budding cell cycle, doi:10.1006/jtbi.2001.2293.
///
/// State: `[CycB, Cdh1, Cdc20T, Cdc20A, IEP, mass]`. The published rates are
/// per minute; `apply` returns derivatives per hour.
///
/// The stopping event marks mitotic exit: cyclin B falling through
/// [`TysonNovakOde::CYCLIN_B_THRESHOLD`] while the cell is large enough to
/// divide.
#[derive(Debug, Clone, Copy)]
pub struct TysonNovakOde {
    k1: f64,
    k2d: f64,
    k2dd: f64,
    k3d: f64,
    k3dd: f64,
    k4: f64,
    j3: f64,
    j4: f64,
    k5d: f64,
    k5dd: f64,
    k6: f64,
    j5: f64,
    n: f64,
    k7: f64,
    k8: f64,
    j7: f64,
    j8: f64,
    mad: f64,
    k9: f64,
    k10: f64,
    mu: f64,
    m_star: f64,
}

impl TysonNovakOde {
    pub const CYCLIN_B_THRESHOLD: f64 = 0.1;
    pub const MINIMUM_DIVISION_MASS: f64 = 0.6;
    const MINUTES_PER_HOUR: f64 = 60.0;

    pub fn new() -> Self {
        Self {
            k1: 0.04,
            k2d: 0.04,
            k2dd: 1.0,
            k3d: 1.0,
            k3dd: 10.0,
            k4: 35.0,
            j3: 0.04,
            j4: 0.04,
            k5d: 0.005,
            k5dd: 0.2,
            k6: 0.1,
            j5: 0.3,
            n: 4.0,
            k7: 1.0,
            k8: 0.5,
            j7: 1e-3,
            j8: 1e-3,
            mad: 1.0,
            k9: 0.1,
            k10: 0.02,
            mu: 0.01,
            m_star: 10.0,
        }
    }

    /// State of a newly born cell: low cyclin B, active Cdh1, half the
    /// mass of a cell at division.
    pub fn initial_conditions() -> Vec<f64> {
        vec![
            0.099_999_999_999_977,
            0.989_026_454_281_841,
            1.547_942_029_285_891,
            1.421_110_920_135_839,
            0.672_838_844_290_094,
            0.475_028_557_003_295,
        ]
    }

    fn cyclin_b_rate(&self, x: &[f64]) -> f64 {
        self.k1 - (self.k2d + self.k2dd * x[1]) * x[0]
    }
}

impl Default for TysonNovakOde {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicalSystem<f64> for TysonNovakOde {
    fn dimension(&self) -> usize {
        6
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let (cyc_b, cdh1, cdc20t, cdc20a, iep, mass) = (x[0], x[1], x[2], x[3], x[4], x[5]);

        let d_cyc_b = self.cyclin_b_rate(x);

        let activation = (self.k3d + self.k3dd * cdc20a) * (1.0 - cdh1);
        let inactivation = self.k4 * mass * cyc_b * cdh1;
        let d_cdh1 = activation / (self.j3 + 1.0 - cdh1) - inactivation / (self.j4 + cdh1);

        let hill = (cyc_b * mass / self.j5).powf(self.n);
        let d_cdc20t = self.k5d + self.k5dd * hill / (1.0 + hill) - self.k6 * cdc20t;

        let d_cdc20a = self.k7 * iep * (cdc20t - cdc20a) / (self.j7 + cdc20t - cdc20a)
            - self.k8 * self.mad * cdc20a / (self.j8 + cdc20a)
            - self.k6 * cdc20a;

        let d_iep = self.k9 * mass * cyc_b * (1.0 - iep) - self.k10 * iep;
        let d_mass = self.mu * mass * (1.0 - mass / self.m_star);

        let derivatives = [d_cyc_b, d_cdh1, d_cdc20t, d_cdc20a, d_iep, d_mass];
        for (slot, value) in out.iter_mut().zip(derivatives) {
            *slot = value * Self::MINUTES_PER_HOUR;
        }
    }

    fn stopping_event(&self, _t: f64, x: &[f64]) -> bool {
        x[MASS] > Self::MINIMUM_DIVISION_MASS
            && x[CYCLIN_B] < Self::CYCLIN_B_THRESHOLD
            && self.cyclin_b_rate(x) < 0.0
    }
}
