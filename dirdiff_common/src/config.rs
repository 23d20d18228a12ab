use crate::{AppConfig, DirDiffError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "dirdiff.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

/// Load `dirdiff.toml`, falling back to defaults when it does not exist.
///
/// A config file next to the executable wins over the per-user one. With
/// `prefer_portable` the per-user location is never consulted.
pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, DirDiffError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    let exists = path.exists();
    let config = if exists {
        read_config_file(&path)?
    } else {
        AppConfig::default()
    };

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable,
    })
}

pub fn read_config_file(path: &Path) -> Result<AppConfig, DirDiffError> {
    let data = fs::read_to_string(path)?;
    toml::from_str(&data).map_err(|e| {
        DirDiffError::Config(format!("{}: {}", path.display(), e))
    })
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), DirDiffError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "", "dirdiff")
        .ok_or_else(|| DirDiffError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
