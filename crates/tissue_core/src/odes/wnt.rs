use crate::traits::DynamicalSystem;

/// Index of E2F1 in the state vector.
pub const E2F1: usize = 1;
/// Index of β-catenin in the state vector.
pub const BETA_CATENIN: usize = 6;
/// Index of the pinned Wnt stimulus.
pub const WNT_LEVEL: usize = 7;

/// Wnt-stimulated G1/S transition: the Swat (2004) pRb/E2F1/cyclin D network
/// driven by a β-catenin module responding to Wnt.
///
/// State: `[pRb, E2F1, CycD_i, CycD_a, pRb_p, APC, β-catenin, Wnt]`.
/// Parameters are non-dimensionalised on construction; derivatives are per
/// hour. The stopping event (E2F1 above one) marks commitment to S phase.
#[derive(Debug, Clone, Copy)]
pub struct WntCellCycleOde {
    k2d: f64,
    k3d: f64,
    k34d: f64,
    k43d: f64,
    k23d: f64,
    ad: f64,
    j11d: f64,
    j12d: f64,
    j13d: f64,
    j61d: f64,
    j62d: f64,
    j63d: f64,
    km1d: f64,
    kpd: f64,
    phi_r: f64,
    phi_i: f64,
    phi_j: f64,
    phi_p: f64,
    a2d: f64,
    a3d: f64,
    a4d: f64,
    a5d: f64,
    k16d: f64,
    k61d: f64,
    phi_e2f1: f64,
}

impl WntCellCycleOde {
    pub const E2F1_THRESHOLD: f64 = 1.0;

    pub fn new() -> Self {
        // Swat (2004)
        let k1 = 1.0;
        let k2 = 1.6;
        let k3 = 0.05;
        let k16 = 0.4;
        let k34 = 0.04;
        let k43 = 0.01;
        let k61 = 0.3;
        let k23 = 0.3;
        let a = 0.04;
        let j11 = 0.5;
        let j12 = 5.0;
        let j61 = 5.0;
        let j62 = 8.0;
        let j13 = 0.002;
        let j63 = 2.0;
        let km1 = 0.5;
        let km2 = 4.0;
        let km4 = 0.3;
        let kp = 0.05;
        let phi_prb = 0.005;
        let phi_e2f1 = 0.1;
        let phi_cycdi = 0.023;
        let phi_cycda = 0.03;
        let phi_prbp = 0.06;
        // β-catenin module
        let a1 = 0.423;
        let a2 = 2.57e-4;
        let a3 = 1.72;
        let a4 = 10.0;
        let a5 = 0.5;
        let wnt_max = 10.0;
        let mitogenic_factor = 6.0e-4;
        let apc_total = 0.02;

        Self {
            k2d: k2 / (km2 * phi_e2f1),
            k3d: k3 * a1 * mitogenic_factor / (km4 * phi_e2f1 * a2),
            k34d: k34 / phi_e2f1,
            k43d: k43 / phi_e2f1,
            k23d: k23 * km2 / (km4 * phi_e2f1),
            ad: a / km2,
            j11d: j11 * phi_e2f1 / k1,
            j12d: j12 * phi_e2f1 / k1,
            j13d: j13 * phi_e2f1 / k1,
            j61d: j61 * phi_e2f1 / k1,
            j62d: j62 * phi_e2f1 / k1,
            j63d: j63 * phi_e2f1 / k1,
            km1d: km1 / km2,
            kpd: kp / (km2 * phi_e2f1),
            phi_r: phi_prb / phi_e2f1,
            phi_i: phi_cycdi / phi_e2f1,
            phi_j: phi_cycda / phi_e2f1,
            phi_p: phi_prbp / phi_e2f1,
            a2d: a2 / phi_e2f1,
            a3d: a3 * apc_total / phi_e2f1,
            a4d: a4 * wnt_max / phi_e2f1,
            a5d: a5 / phi_e2f1,
            k16d: k16 * km4 / phi_e2f1,
            k61d: k61 / phi_e2f1,
            phi_e2f1,
        }
    }

    /// Initial state with the APC/β-catenin module at steady state for the
    /// given Wnt level.
    pub fn initial_conditions(&self, wnt_level: f64) -> Vec<f64> {
        let destruction = self.a5d / (self.a4d * wnt_level + self.a5d);
        let beta_catenin = self.a2d / (self.a2d + self.a3d * destruction);
        vec![
            7.357e-1,
            1.713e-1,
            6.9e-2,
            3.333_333_333_333_334e-3,
            1.0e-4,
            destruction,
            beta_catenin,
            wnt_level,
        ]
    }
}

impl Default for WntCellCycleOde {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicalSystem<f64> for WntCellCycleOde {
    fn dimension(&self) -> usize {
        8
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let (r, e, i, j, p, c, b, wnt) = (x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7]);

        let d_r = e / (self.km1d + e) * self.j11d / (self.j11d + r) * self.j61d / (self.j61d + p)
            - self.k16d * r * j
            + self.k61d * p
            - self.phi_r * r;
        let d_e = self.kpd
            + self.k2d * (self.ad * self.ad + e * e) / (1.0 + e * e) * self.j12d / (self.j12d + r)
                * self.j62d
                / (self.j62d + p)
            - e;
        let d_i = self.k3d * b
            + self.k23d * e * self.j13d / (self.j13d + r) * self.j63d / (self.j63d + p)
            + self.k43d * j
            - self.k34d * i * j / (1.0 + j)
            - self.phi_i * i;
        let d_j = self.k34d * i * j / (1.0 + j) - (self.k43d + self.phi_j) * j;
        let d_p = self.k16d * r * j - self.k61d * p - self.phi_p * p;
        let d_c = self.a5d * (1.0 - c) - self.a4d * wnt * c;
        let d_b = self.a2d * (1.0 - b) - self.a3d * b * c;

        // non-dimensional time to hours
        let factor = self.phi_e2f1 * 60.0;
        let derivatives = [d_r, d_e, d_i, d_j, d_p, d_c, d_b];
        for (slot, value) in out.iter_mut().zip(derivatives) {
            *slot = value * factor;
        }
        out[WNT_LEVEL] = 0.0;
    }

    fn stopping_event(&self, _t: f64, x: &[f64]) -> bool {
        x[E2F1] > Self::E2F1_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_catenin_module_starts_at_steady_state() {
        let ode = WntCellCycleOde::new();
        let y = ode.initial_conditions(0.7);
        let mut dy = vec![0.0; 8];
        ode.apply(0.0, &y, &mut dy);
        assert!(dy[5].abs() < 1e-10);
        assert!(dy[6].abs() < 1e-10);
        assert_eq!(dy[WNT_LEVEL], 0.0);
    }

    #[test]
    fn more_wnt_means_more_beta_catenin() {
        let ode = WntCellCycleOde::new();
        let low = ode.initial_conditions(0.1);
        let high = ode.initial_conditions(1.0);
        assert!(high[BETA_CATENIN] > low[BETA_CATENIN]);
        assert!(!ode.stopping_event(0.0, &high));
    }
}
