//! Save-file management: auto-incrementing result paths, locked reads and
//! writes of optimization progress.
//!
//! Results are NPZ archives holding an `error` dataset (total cost at every
//! recorded iteration) and a `controls` dataset (the corresponding pulses,
//! stacked along the first axis). Archives are guarded by an advisory lock
//! on a `<file>.lock` sidecar so a reader never observes a half-written
//! archive; the lock blocks without timeout and is released on every exit
//! path when the guard drops.

use std::{
    ffi::OsString,
    fs::{ self, File, OpenOptions },
    path::{ Path, PathBuf },
};
use fs2::FileExt;
use ndarray::{ self as nd, s };
use ndarray_npy::{ NpzReader, NpzWriter };
use num_complex::Complex64 as C64;
use regex::Regex;
use crate::error::{ PulseError, PulseResult };

/// RAII guard for an advisory lock on a save file's sidecar.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

fn sidecar(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".lock");
    name.into()
}

impl FileLock {
    fn open(path: &Path) -> PulseResult<File> {
        Ok(
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(sidecar(path))?
        )
    }

    /// Block until a shared lock on the sidecar of `path` is held.
    pub fn shared(path: &Path) -> PulseResult<Self> {
        let file = Self::open(path)?;
        file.lock_shared()?;
        Ok(Self { file })
    }

    /// Block until an exclusive lock on the sidecar of `path` is held.
    pub fn exclusive(path: &Path) -> PulseResult<Self> {
        let file = Self::open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Return the next unused save file path for an experiment,
/// `<save_dir>/NNNNN_<experiment_name>.npz` with an auto-incrementing index.
///
/// The directory is created if it doesn't exist.
pub fn generate_save_file_path(experiment_name: &str, save_dir: &Path)
    -> PulseResult<PathBuf>
{
    fs::create_dir_all(save_dir)?;
    let pat =
        Regex::new(
            &format!(r"^(\d+)_{}\.npz$", regex::escape(experiment_name)))
        .expect("generate_save_file_path: malformed regex");
    let mut next: usize = 0;
    for entry in fs::read_dir(save_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue; };
        let Some(caps) = pat.captures(name) else { continue; };
        if let Ok(k) = caps[1].parse::<usize>() {
            next = next.max(k + 1);
        }
    }
    Ok(save_dir.join(format!("{:05}_{}.npz", next, experiment_name)))
}

/// Overwrite the save file at `path` with the recorded error and control
/// histories, under an exclusive lock.
///
/// *Panics* if the history arrays have mismatched lengths or shapes.
pub fn save_history(
    path: &Path,
    errors: &[f64],
    controls: &[nd::Array2<C64>],
) -> PulseResult<()>
{
    if errors.len() != controls.len() {
        panic!(
            "save_history: mismatched history lengths: {} != {}",
            errors.len(), controls.len(),
        );
    }
    let error: nd::Array1<f64> = errors.iter().copied().collect();
    let views: Vec<_> = controls.iter().map(|c| c.view()).collect();
    let controls: nd::Array3<C64> = nd::stack(nd::Axis(0), &views)
        .expect("save_history: control history stacking error");
    let _lock = FileLock::exclusive(path)?;
    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array("error", &error)?;
    npz.add_array("controls", &controls)?;
    npz.finish()?;
    Ok(())
}

/// Read the controls at the index of minimum recorded error from a save
/// file, holding a shared lock for the duration of the read.
///
/// Fails if the file is absent, malformed, missing a dataset, or holds no
/// recorded results.
pub fn load_best_controls(path: &Path) -> PulseResult<nd::Array2<C64>> {
    let _lock = FileLock::shared(path)?;
    let mut npz = NpzReader::new(File::open(path)?)?;
    let error: nd::Array1<f64> = npz.by_name("error.npy")
        .map_err(|_| {
            PulseError::MissingDataset(path.to_owned(), "error".into())
        })?;
    let controls: nd::Array3<C64> = npz.by_name("controls.npy")
        .map_err(|_| {
            PulseError::MissingDataset(path.to_owned(), "controls".into())
        })?;
    if error.is_empty() || controls.shape()[0] != error.len() {
        return Err(PulseError::EmptySaveFile(path.to_owned()));
    }
    let best: usize =
        error.iter().enumerate()
        .min_by(|(_, l), (_, r)| l.total_cmp(r))
        .map(|(k, _)| k)
        .unwrap_or(0);
    Ok(controls.slice(s![best, .., ..]).to_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::{ SystemTime, UNIX_EPOCH };

    fn scratch_dir(tag: &str) -> PathBuf {
        let stamp =
            SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir =
            std::env::temp_dir()
            .join(format!("pulse_sim_test_{}_{}_{}",
                tag, std::process::id(), stamp));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn save_path_increments() {
        let dir = scratch_dir("paths");
        let p0 = generate_save_file_path("exp", &dir).unwrap();
        assert_eq!(p0.file_name().unwrap(), "00000_exp.npz");
        File::create(dir.join("00003_exp.npz")).unwrap();
        let p1 = generate_save_file_path("exp", &dir).unwrap();
        assert_eq!(p1.file_name().unwrap(), "00004_exp.npz");
        // other experiments' files don't interfere
        File::create(dir.join("00009_other.npz")).unwrap();
        let p2 = generate_save_file_path("exp", &dir).unwrap();
        assert_eq!(p2.file_name().unwrap(), "00004_exp.npz");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resume_picks_minimum_error() {
        let dir = scratch_dir("resume");
        let path = dir.join("00000_exp.npz");
        let snapshots: Vec<nd::Array2<C64>> =
            (0..3)
            .map(|k| {
                nd::Array2::from_elem((4, 2), C64::from(k as f64))
            })
            .collect();
        save_history(&path, &[0.5, 0.2, 0.4], &snapshots).unwrap();
        let best = load_best_controls(&path).unwrap();
        assert_eq!(best, snapshots[1]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resume_missing_file_fails() {
        let dir = scratch_dir("missing");
        let res = load_best_controls(&dir.join("00000_exp.npz"));
        assert!(res.is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
