//! Cost terms mapping final evolved states to scalar penalties.

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::hilbert::inner_prod;

/// A cost term evaluated on the final states of an evolution.
///
/// States are stacked row-wise: row `i` of a state array is the `i`-th state
/// vector.
#[derive(Clone, Debug)]
pub enum Cost {
    /// Infidelity of the final states with respect to a set of target states,
    ///
    /// ```text
    /// 1 - |Σ_i ⟨t_i|ψ_i⟩|² / S²
    /// ```
    ///
    /// with the sum over states taken coherently.
    TargetStateInfidelity {
        target_states: nd::Array2<C64>,
    },
}

impl Cost {
    /// Create a new [`Self::TargetStateInfidelity`].
    pub fn target_state_infidelity(target_states: nd::Array2<C64>) -> Self {
        Self::TargetStateInfidelity { target_states }
    }

    /// Evaluate the cost on a set of final states.
    ///
    /// *Panics* if the state arrays' shapes disagree.
    pub fn evaluate(&self, final_states: &nd::Array2<C64>) -> f64 {
        match self {
            Self::TargetStateInfidelity { target_states } => {
                if target_states.shape() != final_states.shape() {
                    panic!(
                        "Cost::evaluate: state shape mismatch: {:?} != {:?}",
                        target_states.shape(), final_states.shape(),
                    );
                }
                let s = target_states.nrows() as f64;
                let overlap: C64 =
                    target_states.rows().into_iter()
                    .zip(final_states.rows())
                    .map(|(t, p)| inner_prod(&t.to_owned(), &p.to_owned()))
                    .sum();
                1.0 - (overlap / s).norm_sqr()
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hilbert::basis_ket;

    fn stack(rows: &[nd::Array1<C64>]) -> nd::Array2<C64> {
        let views: Vec<_> = rows.iter().map(|r| r.view()).collect();
        nd::stack(nd::Axis(0), &views).unwrap()
    }

    #[test]
    fn self_fidelity_is_zero_cost() {
        let t = stack(&[basis_ket(4, 1)]);
        let cost = Cost::target_state_infidelity(t.clone());
        assert!(cost.evaluate(&t).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_state_is_full_cost() {
        let t = stack(&[basis_ket(4, 1)]);
        let f = stack(&[basis_ket(4, 2)]);
        let cost = Cost::target_state_infidelity(t);
        assert!((cost.evaluate(&f) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn global_phase_invariant() {
        let t = stack(&[basis_ket(4, 1)]);
        let f = t.mapv(|x| x * C64::cis(0.73));
        let cost = Cost::target_state_infidelity(t);
        assert!(cost.evaluate(&f).abs() < 1e-12);
    }
}
