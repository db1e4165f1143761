//! A single bosonic cavity mode dispersively coupled to a three-level
//! transmon.
//!
//! All frequencies are in units of angular GHz (`TAU *` linear frequency);
//! times are in ns. The system Hamiltonian is written in the frame rotating
//! with both bare modes, leaving the cavity self-Kerr, the transmon
//! anharmonicity, and the linear and quadratic dispersive shifts of the
//! transmon's excited-state population.

use std::f64::consts::{ SQRT_2, TAU };
use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use pulse_sim::{
    cost::Cost,
    dynamics::HBuilderDriven,
    error::PulseResult,
    hilbert::{
        annihilation_operator,
        basis_ket,
        identity,
        kron_kets,
        kron_ops,
        number_operator,
        outer_prod,
        projector,
        quad_kerr_operator,
    },
};

pub const CAVITY_FREQ: f64 = TAU * 4.4526; // GHz
pub const KAPPA: f64 = TAU * -2.82e-6; // GHz
pub const TRANSMON_FREQ: f64 = TAU * 5.6640; // GHz
pub const ALPHA: f64 = TAU * -1.395126e-1; // GHz
pub const CHI_E: f64 = TAU * -5.64453e-4; // GHz
pub const CHI_E_2: f64 = TAU * -7.3e-7; // GHz
pub const MAX_AMP_NORM_CAVITY: f64 = SQRT_2 * TAU * 4e-4; // GHz
pub const MAX_AMP_NORM_TRANSMON: f64 = SQRT_2 * TAU * 4e-3; // GHz

pub const CAVITY_STATE_COUNT: usize = 3;
pub const TRANSMON_STATE_COUNT: usize = 3;
pub const CONTROL_COUNT: usize = 3;

/// Named transmon levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransmonLevel {
    G,
    E,
    F,
}

impl TransmonLevel {
    pub fn index(self) -> usize {
        match self {
            Self::G => 0,
            Self::E => 1,
            Self::F => 2,
        }
    }
}

/// Immutable physical model of the cavity–transmon system: the static system
/// term and the three drive operators, built once at startup.
///
/// Controls are, in order: cavity displacement (`a ⊗ 1`), transmon g↔e drive
/// (`1 ⊗ |g⟩⟨e|`), and transmon e↔f drive (`1 ⊗ |e⟩⟨f|`).
#[derive(Clone, Debug)]
pub struct CavityTransmon {
    h_system: nd::Array2<C64>,
    h_drive_cavity: nd::Array2<C64>,
    h_drive_ge: nd::Array2<C64>,
    h_drive_ef: nd::Array2<C64>,
}

impl Default for CavityTransmon {
    fn default() -> Self { Self::new() }
}

impl CavityTransmon {
    pub fn new() -> Self {
        let cavity_annihilate = annihilation_operator(CAVITY_STATE_COUNT);
        let cavity_number = number_operator(CAVITY_STATE_COUNT);
        let cavity_quad = quad_kerr_operator(CAVITY_STATE_COUNT);
        let cavity_id = identity(CAVITY_STATE_COUNT);
        let transmon_quad = quad_kerr_operator(TRANSMON_STATE_COUNT);
        let transmon_id = identity(TRANSMON_STATE_COUNT);
        let g = basis_ket(TRANSMON_STATE_COUNT, TransmonLevel::G.index());
        let e = basis_ket(TRANSMON_STATE_COUNT, TransmonLevel::E.index());
        let f = basis_ket(TRANSMON_STATE_COUNT, TransmonLevel::F.index());
        let proj_e = projector(&e);

        let h_system =
            // bare mode frequencies drop out in the rotating frame:
            // kron_ops(&cavity_number, &transmon_id) * C64::from(CAVITY_FREQ)
            // + kron_ops(&cavity_id, &transmon_number) * C64::from(TRANSMON_FREQ)
            kron_ops(&cavity_quad, &transmon_id) * C64::from(KAPPA / 2.0)
            + kron_ops(&cavity_id, &transmon_quad) * C64::from(ALPHA / 2.0)
            + kron_ops(&cavity_number, &proj_e) * C64::from(2.0 * CHI_E)
            + kron_ops(&cavity_quad, &proj_e) * C64::from(CHI_E_2);

        let h_drive_cavity = kron_ops(&cavity_annihilate, &transmon_id);
        let h_drive_ge = kron_ops(&cavity_id, &outer_prod(&g, &e));
        let h_drive_ef = kron_ops(&cavity_id, &outer_prod(&e, &f));

        Self { h_system, h_drive_cavity, h_drive_ge, h_drive_ef }
    }

    /// Dimension of the composite Hilbert space.
    pub fn size(&self) -> usize {
        CAVITY_STATE_COUNT * TRANSMON_STATE_COUNT
    }

    /// Return a reference to the static system term.
    pub fn h_system(&self) -> &nd::Array2<C64> { &self.h_system }

    /// Construct the driven-Hamiltonian builder with all three controls and
    /// their amplitude bounds.
    pub fn hamiltonian(&self) -> PulseResult<HBuilderDriven> {
        HBuilderDriven::new(self.h_system.clone())?
            .with_control(self.h_drive_cavity.clone(), MAX_AMP_NORM_CAVITY)?
            .with_control(self.h_drive_ge.clone(), MAX_AMP_NORM_TRANSMON)?
            .with_control(self.h_drive_ef.clone(), MAX_AMP_NORM_TRANSMON)
    }

    /// Return the `n`-photon cavity basis ket.
    pub fn cavity_ket(&self, n: usize) -> nd::Array1<C64> {
        basis_ket(CAVITY_STATE_COUNT, n)
    }

    /// Return a transmon basis ket.
    pub fn transmon_ket(&self, level: TransmonLevel) -> nd::Array1<C64> {
        basis_ket(TRANSMON_STATE_COUNT, level.index())
    }

    /// Return the composite cavity ⊗ transmon basis ket.
    pub fn ket(&self, n: usize, level: TransmonLevel) -> nd::Array1<C64> {
        kron_kets(&self.cavity_ket(n), &self.transmon_ket(level))
    }

    /// Initial states of the transfer problem, stacked row-wise:
    /// `|0⟩ ⊗ |g⟩`.
    pub fn initial_states(&self) -> nd::Array2<C64> {
        let psi0 = self.ket(0, TransmonLevel::G);
        nd::stack(nd::Axis(0), &[psi0.view()])
            .expect("initial_states: stacking error")
    }

    /// Target states of the transfer problem, stacked row-wise:
    /// `|1⟩ ⊗ |g⟩`.
    pub fn target_states(&self) -> nd::Array2<C64> {
        let psi1 = self.ket(1, TransmonLevel::G);
        nd::stack(nd::Axis(0), &[psi1.view()])
            .expect("target_states: stacking error")
    }

    /// Cost terms of the transfer problem.
    pub fn costs(&self) -> Vec<Cost> {
        vec![Cost::target_state_infidelity(self.target_states())]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pulse_sim::{
        grape::{ evolve_schrodinger, EvolveConfig },
        hilbert::inner_prod,
    };

    fn is_hermitian(h: &nd::Array2<C64>) -> bool {
        let hdag = h.t().mapv(|x| x.conj());
        h.iter().zip(hdag.iter()).all(|(a, b)| (a - b).norm() < 1e-12)
    }

    #[test]
    fn hamiltonian_hermitian_for_complex_controls() {
        let model = CavityTransmon::new();
        let h = model.hamiltonian().unwrap();
        let amp_sets = [
            [C64::new(1e-4, -2e-4), C64::new(-3e-3, 1e-3),
                C64::new(2e-3, 2e-3)],
            [C64::new(-5e-4, 0.0), C64::new(0.0, 4e-3),
                C64::new(-1e-3, -1e-3)],
        ];
        for amps in amp_sets {
            for t in [0.0, 17.3, 999.0] {
                assert!(is_hermitian(&h.gen_at(&amps, t)));
            }
        }
    }

    #[test]
    fn hamiltonian_time_invariant() {
        let model = CavityTransmon::new();
        let h = model.hamiltonian().unwrap();
        let amps = [C64::new(1e-4, 1e-4); 3];
        assert_eq!(h.gen_at(&amps, 0.0), h.gen_at(&amps, 500.0));
    }

    #[test]
    fn zero_controls_reduce_to_system_term() {
        let model = CavityTransmon::new();
        let h = model.hamiltonian().unwrap();
        let zero = [C64::from(0.0); 3];
        assert_eq!(h.gen_at(&zero, 0.0), *model.h_system());
    }

    #[test]
    fn basis_kets_orthonormal() {
        let model = CavityTransmon::new();
        let kets = [
            model.cavity_ket(0),
            model.cavity_ket(1),
            model.cavity_ket(2),
            model.transmon_ket(TransmonLevel::G),
            model.transmon_ket(TransmonLevel::E),
            model.transmon_ket(TransmonLevel::F),
        ];
        // orthonormality within each subsystem
        for sub in [&kets[0..3], &kets[3..6]] {
            for (j, a) in sub.iter().enumerate() {
                for (k, b) in sub.iter().enumerate() {
                    let ip = inner_prod(a, b);
                    let expected = if j == k { 1.0 } else { 0.0 };
                    assert!((ip - C64::from(expected)).norm() < 1e-12);
                }
            }
        }
        // composite kets are unit vectors
        for n in 0..CAVITY_STATE_COUNT {
            for level in
                [TransmonLevel::G, TransmonLevel::E, TransmonLevel::F]
            {
                let ket = model.ket(n, level);
                assert!(
                    (inner_prod(&ket, &ket) - C64::from(1.0)).norm() < 1e-12
                );
            }
        }
    }

    #[test]
    fn no_actuation_no_transfer() {
        // with zero controls the |0⟩⊗|g⟩ -> |1⟩⊗|g⟩ infidelity stays at 1
        let model = CavityTransmon::new();
        let h = model.hamiltonian().unwrap();
        let config = EvolveConfig {
            evolution_time: 1000.0,
            system_eval_count: 501,
            controls: None,
        };
        let result =
            evolve_schrodinger(
                &h, &model.initial_states(), &model.costs(), &config)
            .unwrap();
        assert!((result.error - 1.0).abs() < 1e-9);
    }
}
