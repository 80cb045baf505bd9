//! Writing the compose document to disk.

use std::path::{Path, PathBuf};

use stratus_common::constants::COMPOSE_FILE;
use stratus_common::error::{Result, StratusError};

use crate::partial::{ComposeFile, ConfigurationPartial};

/// Recreates `dir` and writes `docker-compose.yml` for the partial into it.
///
/// # Errors
///
/// Returns an error if the directory cannot be recreated or the file
/// cannot be serialised or written.
pub fn write_compose_file(dir: &Path, partial: &ConfigurationPartial) -> Result<PathBuf> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| StratusError::io(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| StratusError::io(dir, e))?;

    let path = dir.join(COMPOSE_FILE);
    let yaml = serde_yaml::to_string(&ComposeFile::from_partial(partial)).map_err(|source| {
        StratusError::Yaml {
            path: path.clone(),
            source,
        }
    })?;
    std::fs::write(&path, yaml).map_err(|e| StratusError::io(&path, e))?;
    tracing::info!(path = %path.display(), components = partial.services.len(), "compose file written");
    Ok(path)
}

/// Project name the compose tool derives from a directory: the base name
/// lowercased with every non-alphanumeric character removed.
pub fn compose_project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
