//! Numerical integration of the Schrödinger equation for pure states.
//!
//! The last index of a returned 2D array corresponds to time, all
//! Hamiltonians should be in units of angular frequency, and direct
//! integration is via fourth-order Runge-Kutta.

use ndarray::{ self as nd, s };
use ndarray_linalg::{ self as la, Eigh };
use num_complex::Complex64 as C64;

fn array_diff(arr: &nd::Array1<f64>) -> nd::Array1<f64> {
    arr.iter().zip(arr.iter().skip(1))
        .map(|(ak, akp1)| *akp1 - *ak)
        .collect()
}

fn rhs(h: &nd::Array2<C64>, psi: &nd::Array1<C64>) -> nd::Array1<C64> {
    -C64::i() * h.dot(psi)
}

fn norm(psi: &nd::Array1<C64>) -> C64 {
    psi.mapv(|a| a * a.conj()).sum().sqrt()
}

/// Numerically integrate the Schrödinger equation for a time-dependent
/// Hamiltonian given by a function.
///
/// The state is renormalized after every step.
pub fn evolve_fn<H>(
    psi0: &nd::Array1<C64>,
    h: H,
    t: &nd::Array1<f64>,
) -> nd::Array2<C64>
where H: Fn(f64) -> nd::Array2<C64>
{
    let n = t.len();
    let dt = array_diff(t);
    let mut psi: nd::Array2<C64> = nd::Array::zeros((psi0.len(), n));
    let mut psi_old: nd::Array1<C64> = psi0.clone();
    let mut hk: nd::Array2<C64>;
    let mut hkp1h: nd::Array2<C64>;
    let mut hkp1: nd::Array2<C64>;
    let mut k1: nd::Array1<C64>;
    let mut k2: nd::Array1<C64>;
    let mut k3: nd::Array1<C64>;
    let mut k4: nd::Array1<C64>;
    let mut psi_new: nd::Array1<C64>;
    psi.slice_mut(s![.., 0]).assign(psi0);
    let iter = dt.iter().zip(t).enumerate();
    for (k, (&dtk, &tk)) in iter {
        hk = h(tk);
        hkp1h = h(tk + dtk / 2.0);
        hkp1 = h(tk + dtk);
        k1 = rhs(&hk, &psi_old);
        k2 = rhs(&hkp1h, &(&psi_old + &k1 * (dtk / 2.0)));
        k3 = rhs(&hkp1h, &(&psi_old + &k2 * (dtk / 2.0)));
        k4 = rhs(&hkp1, &(&psi_old + &k3 * dtk));
        psi_new = &psi_old + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dtk / 6.0);
        psi_old = &psi_new / norm(&psi_new);
        psi_old.clone().move_into(psi.slice_mut(s![.., k + 1]));
    }
    psi
}

/// Compute the exact step propagator `U = exp(-i H dt)` of a Hermitian
/// Hamiltonian by diagonalization.
pub fn propagator(h: &nd::Array2<C64>, dt: f64) -> nd::Array2<C64> {
    let (E, V): (nd::Array1<f64>, nd::Array2<C64>) =
        h.eigh(la::UPLO::Lower)
        .expect("propagator: diagonalization error");
    let vdag = V.t().mapv(|x| x.conj());
    let mut scaled = V;
    let iter =
        scaled.axis_iter_mut(nd::Axis(1))
        .zip(E.iter());
    for (mut col, &e) in iter {
        let ph = (-C64::i() * e * dt).exp();
        col.mapv_inplace(|x| x * ph);
    }
    scaled.dot(&vdag)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn sigma_x() -> nd::Array2<C64> {
        let mut m: nd::Array2<C64> = nd::Array2::zeros((2, 2));
        m[[0, 1]] = C64::from(1.0);
        m[[1, 0]] = C64::from(1.0);
        m
    }

    #[test]
    fn propagator_unitary() {
        let u = propagator(&sigma_x(), 0.37);
        let udag_u = u.t().mapv(|x| x.conj()).dot(&u);
        let eye: nd::Array2<C64> = nd::Array2::eye(2);
        let dev: f64 =
            udag_u.iter().zip(eye.iter())
            .map(|(a, b)| (a - b).norm())
            .sum();
        assert!(dev < 1e-12);
    }

    #[test]
    fn propagator_pi_pulse() {
        // exp(-i σx π/2) |0⟩ = -i |1⟩
        let u = propagator(&sigma_x(), PI / 2.0);
        assert!((u[[1, 0]] + C64::i()).norm() < 1e-12);
        assert!(u[[0, 0]].norm() < 1e-12);
    }

    #[test]
    fn rk4_rabi_oscillation() {
        // H = (Ω/2) σx drives |0⟩ -> |1⟩ in time π/Ω
        let omega: f64 = 0.1;
        let h = sigma_x() * C64::from(omega / 2.0);
        let tmax = PI / omega;
        let t: nd::Array1<f64> = nd::Array1::linspace(0.0, tmax, 1001);
        let psi0: nd::Array1<C64> =
            [C64::from(1.0), C64::from(0.0)].into_iter().collect();
        let psi = evolve_fn(&psi0, |_| h.clone(), &t);
        let p1 = psi[[1, 1000]].norm_sqr();
        assert!((p1 - 1.0).abs() < 1e-6);
    }
}
