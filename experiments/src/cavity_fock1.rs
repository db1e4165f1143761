//! Single-photon Fock-state preparation in the cavity–transmon system:
//! optimize drive pulses taking `|0⟩ ⊗ |g⟩` to `|1⟩ ⊗ |g⟩`, or re-evolve a
//! previously saved pulse.

use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use ndarray as nd;
use num_complex::Complex64 as C64;
use pulse_sim::{
    mkdir,
    write_npz,
    grape::{
        evolve_schrodinger,
        grape_schrodinger,
        EvolveConfig,
        GrapeConfig,
        Optimizer,
    },
    saves::{ generate_save_file_path, load_best_controls },
};
use lib::systems::cavity_transmon::CavityTransmon;

const META_NAME: &str = "oct";
const EXPERIMENT_NAME: &str = "cavity_fock1";
const OUT_ENV_VAR: &str = "OCT_OUT_PATH";

const EVOLUTION_TIME: f64 = 1e3; // ns
const CONTROL_EVAL_COUNT: usize = EVOLUTION_TIME as usize + 1;
const SYSTEM_EVAL_COUNT: usize = EVOLUTION_TIME as usize + 1;
const ITERATION_COUNT: usize = 500;
const LEARNING_RATE: f64 = 1e-3;
const LOG_ITERATION_STEP: usize = 1;
const SAVE_ITERATION_STEP: usize = 1;

const GRAB_CONTROLS: bool = false;
const GRAB_CONTROLS_INDEX: usize = 8;

#[derive(Parser, Debug)]
#[command(about = "Cavity Fock-state |0⟩ -> |1⟩ pulse optimization")]
struct Args {
    /// Run the GRAPE optimization.
    #[arg(long)]
    grape: bool,
    /// Re-evolve the best previously saved pulse and report its error.
    #[arg(long)]
    evolve: bool,
}

fn save_dir() -> PathBuf {
    std::env::var_os(OUT_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("out")
        .join(META_NAME)
        .join(EXPERIMENT_NAME)
}

fn grabbed_save_file(save_dir: &std::path::Path) -> PathBuf {
    save_dir.join(
        format!("{:05}_{}.npz", GRAB_CONTROLS_INDEX, EXPERIMENT_NAME))
}

fn initial_controls(save_dir: &std::path::Path)
    -> anyhow::Result<Option<nd::Array2<C64>>>
{
    if GRAB_CONTROLS {
        let path = grabbed_save_file(save_dir);
        let controls = load_best_controls(&path)
            .with_context(|| format!(
                "failed to load controls from {}", path.display()))?;
        Ok(Some(controls))
    } else {
        Ok(None)
    }
}

fn run_grape(model: &CavityTransmon) -> anyhow::Result<()> {
    let h = model.hamiltonian()?;
    let save_dir = save_dir();
    let save_file_path = generate_save_file_path(EXPERIMENT_NAME, &save_dir)?;
    println!("saving to {}", save_file_path.display());
    let config = GrapeConfig {
        control_count: h.control_count(),
        control_eval_count: CONTROL_EVAL_COUNT,
        system_eval_count: SYSTEM_EVAL_COUNT,
        evolution_time: EVOLUTION_TIME,
        iteration_count: ITERATION_COUNT,
        max_control_norms: h.max_control_norms(),
        initial_controls: initial_controls(&save_dir)?,
        optimizer: Optimizer::adam(LEARNING_RATE),
        log_iteration_step: LOG_ITERATION_STEP,
        save_iteration_step: SAVE_ITERATION_STEP,
        save_file_path: Some(save_file_path),
    };
    let result =
        grape_schrodinger(
            &h, &model.initial_states(), &model.costs(), &config)?;
    println!("best error {:.9e} at iteration {}",
        result.error, result.iteration);
    Ok(())
}

fn run_evolve(model: &CavityTransmon) -> anyhow::Result<()> {
    let h = model.hamiltonian()?;
    let save_dir = save_dir();
    let config = EvolveConfig {
        evolution_time: EVOLUTION_TIME,
        system_eval_count: SYSTEM_EVAL_COUNT,
        controls: initial_controls(&save_dir)?,
    };
    let result =
        evolve_schrodinger(
            &h, &model.initial_states(), &model.costs(), &config)?;
    println!("error {:.9e}", result.error);
    let outdir = save_dir.join("evolve");
    mkdir!(outdir);
    write_npz!(
        outdir.join(format!("{}_final_states.npz", EXPERIMENT_NAME)),
        arrays: { "final_states" => &result.final_states }
    );
    Ok(())
}


fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let model = CavityTransmon::new();
    if args.grape {
        run_grape(&model)?;
    } else if args.evolve {
        run_evolve(&model)?;
    } else {
        println!("nothing to do; pass --grape or --evolve");
    }
    Ok(())
}
