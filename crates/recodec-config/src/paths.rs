//! Platform-specific paths and experiment directory naming.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/recodec/` (Linux), `~/Library/Application Support/recodec/` (macOS), `%APPDATA%\recodec\` (Windows)
//! - **Experiment output**: `output_YYYYMMDD_HHMMSS/` next to the input file unless
//!   the config names an `output_dir`
//!
//! # Example
//!
//! ```rust,no_run
//! use recodec_config::paths;
//!
//! // An experiment directory or a config file both resolve
//! if let Some(path) = paths::find_config("runs/opus_128k") {
//!     println!("Found config at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "recodec";

/// File name of the config stored in every experiment directory.
pub const EXPERIMENT_FILE: &str = "experiment.toml";

/// Prefix of generated experiment directories.
pub const OUTPUT_PREFIX: &str = "output_";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the user-level default experiment config.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(EXPERIMENT_FILE)
}

/// Find an experiment config.
///
/// Searches in the following order:
/// 1. `name` itself, if it is a file
/// 2. `name/experiment.toml`, if `name` is a directory
/// 3. `name` (with `.toml` added if missing) inside the user config directory
pub fn find_config(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);

    if path.is_file() {
        return Some(path);
    }

    if path.is_dir() {
        let inner = path.join(EXPERIMENT_FILE);
        return inner.is_file().then_some(inner);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let user_path = user_config_dir().join(filename);
    user_path.is_file().then_some(user_path)
}

/// Default experiment directory for `input`: `output_<stamp>` in the same
/// directory as the input file.
///
/// `stamp` is expected in `YYYYMMDD_HHMMSS` form.
pub fn default_output_dir(input: &Path, stamp: &str) -> PathBuf {
    let parent = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    parent.join(format!("{OUTPUT_PREFIX}{stamp}"))
}
