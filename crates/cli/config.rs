use anyhow::{Context, Result};
use loggen_core::Config;
use std::path::{Path, PathBuf};

pub const APP_ID: &str = "loggen";

pub const CONFIG_FILE: &str = "config.json";

pub fn config_dir(app_id: &str) -> Option<PathBuf> {
    directories_next::ProjectDirs::from("", "", app_id)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Expands a leading `~` in a user supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn read_config(path: &Path) -> Result<Config> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open config file {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("invalid config file {}", path.display()))
}

/// Loads the base configuration.
///
/// An explicit path must exist. Otherwise the file in the platform config
/// directory is used when present, falling back to the built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return read_config(&expand_path(path));
    }

    match config_dir(APP_ID).map(|dir| dir.join(CONFIG_FILE)) {
        Some(path) if path.is_file() => {
            tracing::debug!(path = %path.display(), "loading config");
            read_config(&path)
        }
        _ => Ok(Config::default()),
    }
}
