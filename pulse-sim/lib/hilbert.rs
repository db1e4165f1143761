//! Operator and state constructions for truncated bosonic and multilevel
//! modes.
//!
//! All operators are dense complex matrices over a finite-dimensional
//! Hilbert space; composite spaces are formed with Kronecker products.

use itertools::Itertools;
use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };

/// Construct the annihilation operator for a mode truncated to `size` levels.
///
/// Matrix elements are `a[n, n + 1] = sqrt(n + 1)`.
pub fn annihilation_operator(size: usize) -> nd::Array2<C64> {
    let mut a: nd::Array2<C64> = nd::Array2::zeros((size, size));
    for n in 0..size.saturating_sub(1) {
        a[[n, n + 1]] = C64::from(((n + 1) as f64).sqrt());
    }
    a
}

/// Construct the creation operator for a mode truncated to `size` levels.
pub fn creation_operator(size: usize) -> nd::Array2<C64> {
    conjugate_transpose(&annihilation_operator(size))
}

/// Construct the number operator `a† a` for a mode truncated to `size` levels.
pub fn number_operator(size: usize) -> nd::Array2<C64> {
    nd::Array2::from_diag(
        &(0..size).map(|n| C64::from(n as f64)).collect::<nd::Array1<C64>>()
    )
}

/// Construct the quadratic ladder product `a† a† a a` for a mode truncated to
/// `size` levels.
///
/// This is the diagonal operator with elements `n (n - 1)`, appearing in both
/// self-Kerr and anharmonicity terms.
pub fn quad_kerr_operator(size: usize) -> nd::Array2<C64> {
    nd::Array2::from_diag(
        &(0..size).map(|n| C64::from((n * n.saturating_sub(1)) as f64))
            .collect::<nd::Array1<C64>>()
    )
}

/// Construct the identity on a `size`-dimensional space.
pub fn identity(size: usize) -> nd::Array2<C64> {
    nd::Array2::eye(size)
}

/// Construct the `k`-th basis ket of a `size`-dimensional space.
///
/// *Panics* if `k >= size`.
pub fn basis_ket(size: usize, k: usize) -> nd::Array1<C64> {
    if k >= size {
        panic!("basis_ket: index {} out of bounds for size {}", k, size);
    }
    (0..size)
        .map(|j| if j == k { C64::one() } else { C64::zero() })
        .collect()
}

/// Compute the conjugate transpose of an operator.
pub fn conjugate_transpose(a: &nd::Array2<C64>) -> nd::Array2<C64> {
    a.t().mapv(|x| x.conj())
}

/// Compute the outer product of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    let na = a.len();
    let nb = b.len();
    nd::Array2::from_shape_vec(
        (na, nb),
        a.iter().cartesian_product(b)
            .map(|(ai, bj)| *ai * bj.conj())
            .collect(),
    )
    .unwrap()
}

/// Compute the projector `|a⟩⟨a|` onto a state vector.
pub fn projector(a: &nd::Array1<C64>) -> nd::Array2<C64> {
    outer_prod(a, a)
}

/// Compute the Kronecker (tensor) product of two kets.
pub fn kron_kets(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array1<C64>
{
    a.iter().cartesian_product(b)
        .map(|(ai, bj)| *ai * *bj)
        .collect()
}

/// Compute the Kronecker product of two operators.
pub fn kron_ops(a: &nd::Array2<C64>, b: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    kron(a, b)
}

/// Compute the inner product `⟨a|b⟩`.
pub fn inner_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>) -> C64 {
    a.iter().zip(b).map(|(ai, bi)| ai.conj() * *bi).sum()
}

/// Compute the trace of an operator.
pub fn trace(a: &nd::Array2<C64>) -> C64 {
    a.diag().iter().sum()
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx(a: C64, b: C64) -> bool { (a - b).norm() < 1e-12 }

    #[test]
    fn ladder_commutator() {
        const N: usize = 5;
        let a = annihilation_operator(N);
        let adag = creation_operator(N);
        let comm = a.dot(&adag) - adag.dot(&a);
        // [a, a†] = 1 everywhere below the truncation level
        for n in 0..N - 1 {
            assert!(approx(comm[[n, n]], C64::one()));
        }
    }

    #[test]
    fn number_from_ladder() {
        const N: usize = 4;
        let a = annihilation_operator(N);
        let adag = creation_operator(N);
        assert_eq!(adag.dot(&a), number_operator(N));
    }

    #[test]
    fn quad_kerr_from_ladder() {
        const N: usize = 4;
        let a = annihilation_operator(N);
        let adag = creation_operator(N);
        let quad = adag.dot(&adag).dot(&a).dot(&a);
        assert_eq!(quad, quad_kerr_operator(N));
    }

    #[test]
    fn kets_orthonormal() {
        const N: usize = 3;
        for j in 0..N {
            for k in 0..N {
                let ip = inner_prod(&basis_ket(N, j), &basis_ket(N, k));
                let expected =
                    if j == k { C64::one() } else { C64::zero() };
                assert!(approx(ip, expected));
            }
        }
    }

    #[test]
    fn kron_kets_unit_norm() {
        let a = basis_ket(3, 1);
        let b = basis_ket(3, 0);
        let ab = kron_kets(&a, &b);
        assert_eq!(ab.len(), 9);
        assert!(approx(inner_prod(&ab, &ab), C64::one()));
    }

    #[test]
    fn projector_unit_trace() {
        let a = basis_ket(3, 2);
        assert!(approx(trace(&projector(&a)), C64::one()));
    }
}
