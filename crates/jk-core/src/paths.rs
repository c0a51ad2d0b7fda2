//! Jupyter directory layout
//!
//! Resolves the standard data, runtime, and kernelspec directories, honouring
//! the `JUPYTER_DATA_DIR`, `JUPYTER_RUNTIME_DIR`, and `JUPYTER_PATH` overrides.

use std::env;
use std::path::{Path, PathBuf};

/// User-level Jupyter data directory
pub fn jupyter_data_dir() -> PathBuf {
    if let Some(dir) = env::var_os("JUPYTER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            return home.join("Library").join("Jupyter");
        }
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jupyter")
}

/// Directory holding kernel connection files
pub fn jupyter_runtime_dir() -> PathBuf {
    match env::var_os("JUPYTER_RUNTIME_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => jupyter_data_dir().join("runtime"),
    }
}

/// Data directories in search order: `JUPYTER_PATH`, user, then system
pub fn jupyter_path() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = env::var_os("JUPYTER_PATH")
        .map(|p| env::split_paths(&p).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default();

    paths.push(jupyter_data_dir());
    paths.extend(system_data_dirs());
    dedup_preserving_order(paths)
}

/// Kernelspec directories: `extra` first, then `<jupyter_path>/kernels`
pub fn kernel_dirs(extra: &[PathBuf]) -> Vec<PathBuf> {
    let standard = jupyter_path().into_iter().map(|p| p.join("kernels"));
    dedup_preserving_order(extra.iter().cloned().chain(standard).collect())
}

#[cfg(unix)]
fn system_data_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/share/jupyter"),
        PathBuf::from("/usr/share/jupyter"),
    ]
}

#[cfg(windows)]
fn system_data_dirs() -> Vec<PathBuf> {
    env::var_os("PROGRAMDATA")
        .map(|p| vec![Path::new(&p).join("jupyter")])
        .unwrap_or_default()
}

fn dedup_preserving_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if !seen.iter().any(|p| Path::new(p) == path) {
            seen.push(path);
        }
    }
    seen
}
