//! Hamiltonian builder for a static system term plus complex-amplitude
//! drives.

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::{
    error::{ PulseError, PulseResult },
    hilbert::conjugate_transpose,
};

/// A single control operator, paired with its conjugate transpose and an
/// amplitude bound.
#[derive(Clone, Debug)]
pub struct Control {
    pub(crate) op: nd::Array2<C64>,
    pub(crate) op_dag: nd::Array2<C64>,
    pub max_norm: f64,
}

impl Control {
    /// Create a new `Control` from a bare operator; the conjugate-transpose
    /// counterpart is derived internally.
    pub fn new(op: nd::Array2<C64>, max_norm: f64) -> Self {
        let op_dag = conjugate_transpose(&op);
        Self { op, op_dag, max_norm }
    }

    /// Return a reference to the control operator.
    pub fn op(&self) -> &nd::Array2<C64> { &self.op }

    /// Return a reference to the conjugate transpose of the control operator.
    pub fn op_dag(&self) -> &nd::Array2<C64> { &self.op_dag }
}

/// Hamiltonian builder for a driven system
///
/// ```text
/// H(c, t) = H_sys + Σ_k [ c_k H_k + conj(c_k) H_k† ]
/// ```
///
/// with complex control amplitudes `c`. Each drive term enters paired with
/// its conjugate-transpose counterpart, so the output is Hermitian for any
/// complex amplitude vector.
#[derive(Clone, Debug)]
pub struct HBuilderDriven {
    pub(crate) h_system: nd::Array2<C64>,
    pub(crate) controls: Vec<Control>,
}

impl HBuilderDriven {
    /// Create a new `HBuilderDriven` from a static system term.
    ///
    /// Fails if the system term is not square.
    pub fn new(h_system: nd::Array2<C64>) -> PulseResult<Self> {
        if h_system.nrows() != h_system.ncols() {
            return Err(PulseError::ShapeMismatch {
                expected: vec![h_system.nrows(), h_system.nrows()],
                got: h_system.shape().to_vec(),
            });
        }
        Ok(Self { h_system, controls: Vec::new() })
    }

    /// Add a control operator with an amplitude bound.
    ///
    /// Fails if the operator's shape doesn't match the system term.
    pub fn with_control(mut self, op: nd::Array2<C64>, max_norm: f64)
        -> PulseResult<Self>
    {
        if op.shape() != self.h_system.shape() {
            return Err(PulseError::ShapeMismatch {
                expected: self.h_system.shape().to_vec(),
                got: op.shape().to_vec(),
            });
        }
        self.controls.push(Control::new(op, max_norm));
        Ok(self)
    }

    /// Return the dimension of the Hilbert space.
    pub fn size(&self) -> usize { self.h_system.nrows() }

    /// Return the number of control operators.
    pub fn control_count(&self) -> usize { self.controls.len() }

    /// Return references to the control operators.
    pub fn controls(&self) -> &[Control] { &self.controls }

    /// Return the amplitude bounds of all controls.
    pub fn max_control_norms(&self) -> nd::Array1<f64> {
        self.controls.iter().map(|c| c.max_norm).collect()
    }

    /// Return the static system term; equal to [`Self::gen_at`] with all
    /// amplitudes zero.
    pub fn gen_static(&self) -> nd::Array2<C64> { self.h_system.clone() }

    /// Compute the total Hamiltonian for a given control amplitude vector.
    ///
    /// The result carries no explicit time dependence: the controls are the
    /// only time-dependent input. The time argument is kept for signature
    /// compatibility with time-dependent integrators.
    ///
    /// *Panics* if `amps` is shorter than the number of controls.
    pub fn gen_at(&self, amps: &[C64], _t: f64) -> nd::Array2<C64> {
        let mut H = self.h_system.clone();
        for (ck, ctrl) in amps.iter().zip(self.controls.iter()) {
            H.scaled_add(*ck, &ctrl.op);
            H.scaled_add(ck.conj(), &ctrl.op_dag);
        }
        H
    }
}
