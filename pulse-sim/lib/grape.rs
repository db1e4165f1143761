//! Discrete-time evolution and GRAPE optimization of control pulses.
//!
//! Control amplitudes live on a uniform grid of `control_eval_count` points
//! spanning the evolution time; the propagation grid has
//! `system_eval_count` points. Forward simulation integrates with RK4,
//! sampling the controls by linear interpolation. Optimization instead
//! steps with exact matrix exponentials of the Hamiltonian sampled at step
//! midpoints, and pulse gradients follow the standard
//! forward/backward-chain scheme with first-order propagator derivatives.

use std::path::PathBuf;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use rand::Rng;
use crate::{
    cost::Cost,
    dynamics::HBuilderDriven,
    error::{ PulseError, PulseResult },
    hilbert::inner_prod,
    saves,
    schrodinger,
};

/// Gradient-based optimizer choice for the pulse update.
#[derive(Clone, Debug, PartialEq)]
pub enum Optimizer {
    /// Adam with the usual exponential moment decay.
    Adam {
        learning_rate: f64,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    },
}

impl Optimizer {
    /// Create a new [`Self::Adam`] with standard decay rates.
    pub fn adam(learning_rate: f64) -> Self {
        Self::Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

// first and second moments for every real channel of the complex control
// array; `re`/`im` components of `v` track the two channels separately
struct AdamState {
    m: nd::Array2<C64>,
    v: nd::Array2<C64>,
    t: i32,
}

impl AdamState {
    fn new(shape: (usize, usize)) -> Self {
        Self {
            m: nd::Array2::zeros(shape),
            v: nd::Array2::zeros(shape),
            t: 0,
        }
    }

    fn step(
        &mut self,
        params: &mut nd::Array2<C64>,
        grad: &nd::Array2<C64>,
        learning_rate: f64,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    ) {
        self.t += 1;
        let bc1 = 1.0 - beta1.powi(self.t);
        let bc2 = 1.0 - beta2.powi(self.t);
        for (idx, g) in grad.indexed_iter() {
            let m = &mut self.m[idx];
            let v = &mut self.v[idx];
            *m = beta1 * *m + (1.0 - beta1) * *g;
            *v = beta2 * *v
                + (1.0 - beta2) * C64::new(g.re * g.re, g.im * g.im);
            let mh = *m / bc1;
            let vh = *v / bc2;
            params[idx] -= C64::new(
                learning_rate * mh.re / (vh.re.sqrt() + epsilon),
                learning_rate * mh.im / (vh.im.sqrt() + epsilon),
            );
        }
    }
}

/// Configuration bundle for a forward simulation.
#[derive(Clone, Debug)]
pub struct EvolveConfig {
    /// Total evolution time.
    pub evolution_time: f64,
    /// Number of points on the propagation grid.
    pub system_eval_count: usize,
    /// Control amplitudes on a uniform grid spanning the evolution time;
    /// `None` evolves under the bare system term.
    pub controls: Option<nd::Array2<C64>>,
}

impl EvolveConfig {
    fn validate(&self, h: &HBuilderDriven) -> PulseResult<()> {
        if self.evolution_time <= 0.0 {
            return Err(PulseError::InvalidConfig(
                "evolution_time must be positive".into()));
        }
        if self.system_eval_count < 2 {
            return Err(PulseError::InvalidConfig(
                "system_eval_count must be at least 2".into()));
        }
        if let Some(controls) = &self.controls {
            if controls.nrows() < 2 || controls.ncols() != h.control_count() {
                return Err(PulseError::ShapeMismatch {
                    expected: vec![2, h.control_count()],
                    got: controls.shape().to_vec(),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a forward simulation.
#[derive(Clone, Debug)]
pub struct EvolveResult {
    /// Total cost evaluated on the final states.
    pub error: f64,
    /// Final states, stacked row-wise.
    pub final_states: nd::Array2<C64>,
}

/// Configuration bundle for a GRAPE optimization.
#[derive(Clone, Debug)]
pub struct GrapeConfig {
    /// Number of control operators.
    pub control_count: usize,
    /// Number of points on the control grid.
    pub control_eval_count: usize,
    /// Number of points on the propagation grid.
    pub system_eval_count: usize,
    /// Total evolution time.
    pub evolution_time: f64,
    /// Number of optimizer iterations.
    pub iteration_count: usize,
    /// Per-control amplitude bounds; every control sample is clipped to its
    /// bound after each update.
    pub max_control_norms: nd::Array1<f64>,
    /// Starting pulse; `None` seeds random amplitudes within bounds.
    pub initial_controls: Option<nd::Array2<C64>>,
    /// Optimizer choice.
    pub optimizer: Optimizer,
    /// Print progress every this many iterations; 0 disables logging.
    pub log_iteration_step: usize,
    /// Record and save progress every this many iterations; 0 disables
    /// saving.
    pub save_iteration_step: usize,
    /// Destination for recorded progress; `None` disables saving.
    pub save_file_path: Option<PathBuf>,
}

impl GrapeConfig {
    fn validate(&self, h: &HBuilderDriven) -> PulseResult<()> {
        if self.control_count != h.control_count() {
            return Err(PulseError::InvalidConfig(format!(
                "control_count {} does not match Hamiltonian ({})",
                self.control_count, h.control_count())));
        }
        if self.control_eval_count < 2 || self.system_eval_count < 2 {
            return Err(PulseError::InvalidConfig(
                "control_eval_count and system_eval_count must be at least 2"
                    .into()));
        }
        if self.evolution_time <= 0.0 {
            return Err(PulseError::InvalidConfig(
                "evolution_time must be positive".into()));
        }
        if self.iteration_count == 0 {
            return Err(PulseError::InvalidConfig(
                "iteration_count must be at least 1".into()));
        }
        if self.max_control_norms.len() != self.control_count {
            return Err(PulseError::ShapeMismatch {
                expected: vec![self.control_count],
                got: vec![self.max_control_norms.len()],
            });
        }
        if self.max_control_norms.iter().any(|m| *m <= 0.0) {
            return Err(PulseError::InvalidConfig(
                "max_control_norms must be positive".into()));
        }
        if let Some(controls) = &self.initial_controls {
            let expected = [self.control_eval_count, self.control_count];
            if controls.shape() != expected {
                return Err(PulseError::ShapeMismatch {
                    expected: expected.to_vec(),
                    got: controls.shape().to_vec(),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a GRAPE optimization.
#[derive(Clone, Debug)]
pub struct GrapeResult {
    /// Lowest total cost observed.
    pub error: f64,
    /// Controls achieving the lowest cost.
    pub controls: nd::Array2<C64>,
    /// Number of iterations executed.
    pub iteration: usize,
    /// Total cost at every iteration.
    pub error_history: Vec<f64>,
}

// linear-interpolation stencil of the control grid at time `t`
fn interp_stencil(t: f64, evolution_time: f64, eval_count: usize)
    -> (usize, usize, f64, f64)
{
    let spacing = evolution_time / (eval_count - 1) as f64;
    let x = (t / spacing).clamp(0.0, (eval_count - 1) as f64);
    let j0 = (x.floor() as usize).min(eval_count - 2);
    let w1 = x - j0 as f64;
    (j0, j0 + 1, 1.0 - w1, w1)
}

fn sample_controls(
    controls: &nd::Array2<C64>,
    evolution_time: f64,
    t: f64,
) -> Vec<C64>
{
    let (j0, j1, w0, w1) =
        interp_stencil(t, evolution_time, controls.nrows());
    controls.columns().into_iter()
        .map(|col| w0 * col[j0] + w1 * col[j1])
        .collect()
}

fn validate_states(
    h: &HBuilderDriven,
    initial_states: &nd::Array2<C64>,
) -> PulseResult<()> {
    if initial_states.nrows() == 0 || initial_states.ncols() != h.size() {
        return Err(PulseError::ShapeMismatch {
            expected: vec![1, h.size()],
            got: initial_states.shape().to_vec(),
        });
    }
    Ok(())
}

fn total_cost(costs: &[Cost], final_states: &nd::Array2<C64>) -> f64 {
    costs.iter().map(|c| c.evaluate(final_states)).sum()
}

/// Integrate the Schrödinger equation for all initial states under a fixed
/// (possibly empty) control pulse and evaluate the cost terms on the final
/// states.
pub fn evolve_schrodinger(
    h: &HBuilderDriven,
    initial_states: &nd::Array2<C64>,
    costs: &[Cost],
    config: &EvolveConfig,
) -> PulseResult<EvolveResult>
{
    config.validate(h)?;
    validate_states(h, initial_states)?;
    let time: nd::Array1<f64> =
        nd::Array1::linspace(0.0, config.evolution_time,
            config.system_eval_count);
    let h_fn = |t: f64| -> nd::Array2<C64> {
        match &config.controls {
            Some(controls) => {
                let amps =
                    sample_controls(controls, config.evolution_time, t);
                h.gen_at(&amps, t)
            },
            None => h.gen_static(),
        }
    };
    let nlast = config.system_eval_count - 1;
    let mut final_rows: Vec<nd::Array1<C64>> =
        Vec::with_capacity(initial_states.nrows());
    for psi0 in initial_states.rows() {
        let psi = schrodinger::evolve_fn(&psi0.to_owned(), &h_fn, &time);
        final_rows.push(psi.slice(s![.., nlast]).to_owned());
    }
    let views: Vec<_> = final_rows.iter().map(|r| r.view()).collect();
    let final_states = nd::stack(nd::Axis(0), &views)
        .expect("evolve_schrodinger: state stacking error");
    let error = total_cost(costs, &final_states);
    Ok(EvolveResult { error, final_states })
}

fn random_initial_controls(
    control_eval_count: usize,
    max_control_norms: &nd::Array1<f64>,
) -> nd::Array2<C64>
{
    let mut rng = rand::thread_rng();
    let mut controls: nd::Array2<C64> =
        nd::Array2::zeros((control_eval_count, max_control_norms.len()));
    for (idx, c) in controls.indexed_iter_mut() {
        let r = rng.gen_range(0.0..max_control_norms[idx.1] / 2.0);
        let ph = rng.gen_range(0.0..std::f64::consts::TAU);
        *c = C64::from_polar(r, ph);
    }
    controls
}

fn clip_controls(
    controls: &mut nd::Array2<C64>,
    max_control_norms: &nd::Array1<f64>,
) {
    for (idx, c) in controls.indexed_iter_mut() {
        let max = max_control_norms[idx.1];
        let norm = c.norm();
        if norm > max {
            *c *= max / norm;
        }
    }
}

/// Optimize the control pulse with GRAPE to minimize the total cost on the
/// final states, logging and saving progress at the configured cadences.
pub fn grape_schrodinger(
    h: &HBuilderDriven,
    initial_states: &nd::Array2<C64>,
    costs: &[Cost],
    config: &GrapeConfig,
) -> PulseResult<GrapeResult>
{
    config.validate(h)?;
    validate_states(h, initial_states)?;
    let state_count = initial_states.nrows();
    let dim = h.size();
    let nsteps = config.system_eval_count - 1;
    let dt = config.evolution_time / nsteps as f64;

    let mut controls: nd::Array2<C64> =
        config.initial_controls.clone()
        .unwrap_or_else(|| {
            random_initial_controls(
                config.control_eval_count, &config.max_control_norms)
        });
    clip_controls(&mut controls, &config.max_control_norms);

    // derivative operators for the two real channels of each control
    let d_re: Vec<nd::Array2<C64>> =
        h.controls().iter()
        .map(|ctrl| ctrl.op() + ctrl.op_dag())
        .collect();
    let d_im: Vec<nd::Array2<C64>> =
        h.controls().iter()
        .map(|ctrl| (ctrl.op() - ctrl.op_dag()).mapv(|x| C64::i() * x))
        .collect();

    let stencils: Vec<(usize, usize, f64, f64)> =
        (0..nsteps)
        .map(|k| {
            let t_mid = (k as f64 + 0.5) * dt;
            interp_stencil(
                t_mid, config.evolution_time, config.control_eval_count)
        })
        .collect();

    let Optimizer::Adam { learning_rate, beta1, beta2, epsilon } =
        config.optimizer.clone();
    let mut adam =
        AdamState::new((config.control_eval_count, config.control_count));

    let mut error_history: Vec<f64> =
        Vec::with_capacity(config.iteration_count);
    let mut saved_errors: Vec<f64> = Vec::new();
    let mut saved_controls: Vec<nd::Array2<C64>> = Vec::new();
    let mut best_error = f64::INFINITY;
    let mut best_controls = controls.clone();

    if config.log_iteration_step > 0 {
        println!("{:>6}  {:>16}", "iter", "error");
    }

    for iter in 0..config.iteration_count {
        // step propagators from midpoint-sampled amplitudes
        let amps: Vec<Vec<C64>> =
            stencils.iter()
            .map(|&(j0, j1, w0, w1)| {
                controls.columns().into_iter()
                    .map(|col| w0 * col[j0] + w1 * col[j1])
                    .collect()
            })
            .collect();
        let props: Vec<nd::Array2<C64>> =
            amps.iter()
            .map(|a| schrodinger::propagator(&h.gen_at(a, 0.0), dt))
            .collect();

        // forward chains, one per initial state
        let mut forward: Vec<nd::Array2<C64>> =
            Vec::with_capacity(state_count);
        for psi0 in initial_states.rows() {
            let mut chain: nd::Array2<C64> =
                nd::Array2::zeros((dim, nsteps + 1));
            chain.slice_mut(s![.., 0]).assign(&psi0);
            for (k, u) in props.iter().enumerate() {
                let next = u.dot(&chain.slice(s![.., k]));
                next.move_into(chain.slice_mut(s![.., k + 1]));
            }
            forward.push(chain);
        }
        let final_rows: Vec<_> =
            forward.iter().map(|chain| chain.slice(s![.., nsteps])).collect();
        let final_states = nd::stack(nd::Axis(0), &final_rows)
            .expect("grape_schrodinger: state stacking error");
        let error = total_cost(costs, &final_states);
        error_history.push(error);
        if error < best_error {
            best_error = error;
            best_controls = controls.clone();
        }

        if config.log_iteration_step > 0
            && iter % config.log_iteration_step == 0
        {
            println!("{:>6}  {:.9e}", iter, error);
        }
        if config.save_iteration_step > 0
            && iter % config.save_iteration_step == 0
        {
            if let Some(path) = &config.save_file_path {
                saved_errors.push(error);
                saved_controls.push(controls.clone());
                saves::save_history(path, &saved_errors, &saved_controls)?;
            }
        }

        // gradient of the total cost on the control grid
        let mut grad: nd::Array2<C64> =
            nd::Array2::zeros((config.control_eval_count,
                config.control_count));
        for cost in costs.iter() {
            let Cost::TargetStateInfidelity { target_states } = cost;
            // backward chains seeded with the target states
            let mut backward: Vec<nd::Array2<C64>> =
                Vec::with_capacity(state_count);
            for target in target_states.rows() {
                let mut chain: nd::Array2<C64> =
                    nd::Array2::zeros((dim, nsteps + 1));
                chain.slice_mut(s![.., nsteps]).assign(&target);
                for (k, u) in props.iter().enumerate().rev() {
                    let udag = u.t().mapv(|x| x.conj());
                    let prev = udag.dot(&chain.slice(s![.., k + 1]));
                    prev.move_into(chain.slice_mut(s![.., k]));
                }
                backward.push(chain);
            }
            let s = state_count as f64;
            let chi: C64 =
                forward.iter().zip(backward.iter())
                .map(|(f, b)| {
                    inner_prod(
                        &b.slice(s![.., nsteps]).to_owned(),
                        &f.slice(s![.., nsteps]).to_owned(),
                    )
                })
                .sum::<C64>() / s;
            for (k, &(j0, j1, w0, w1)) in stencils.iter().enumerate() {
                for m in 0..config.control_count {
                    let mut dchi_re = C64::from(0.0);
                    let mut dchi_im = C64::from(0.0);
                    for (f, b) in forward.iter().zip(backward.iter()) {
                        let psi = f.slice(s![.., k + 1]).to_owned();
                        let phi = b.slice(s![.., k + 1]).to_owned();
                        dchi_re += inner_prod(&phi, &d_re[m].dot(&psi));
                        dchi_im += inner_prod(&phi, &d_im[m].dot(&psi));
                    }
                    let scale = -C64::i() * dt / s;
                    dchi_re *= scale;
                    dchi_im *= scale;
                    // d(error)/dθ = -2 Re(χ* dχ/dθ)
                    let g = C64::new(
                        -2.0 * (chi.conj() * dchi_re).re,
                        -2.0 * (chi.conj() * dchi_im).re,
                    );
                    grad[[j0, m]] += w0 * g;
                    grad[[j1, m]] += w1 * g;
                }
            }
        }

        adam.step(&mut controls, &grad,
            learning_rate, beta1, beta2, epsilon);
        clip_controls(&mut controls, &config.max_control_norms);
    }

    Ok(GrapeResult {
        error: best_error,
        controls: best_controls,
        iteration: config.iteration_count,
        error_history,
    })
}
