use crate::config::{AbrSimConfig, PathBase};
use crate::error::{AbrSimError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable GStreamer reads its plugin directories from
pub const GST_PLUGIN_PATH: &str = "GST_PLUGIN_PATH";

/// Directory relative paths are resolved against for `base`
pub fn base_dir(base: PathBase, config_dir: Option<&Path>) -> Result<PathBuf> {
    match base {
        PathBase::Cwd => Ok(std::env::current_dir()?),
        PathBase::Config => match config_dir {
            Some(dir) => Ok(dir.to_path_buf()),
            None => Ok(std::env::current_dir()?),
        },
        PathBase::Executable => {
            let exe = std::env::current_exe()?;
            exe.parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| AbrSimError::system("Executable has no parent directory"))
        }
    }
}

/// Resolve `path` against the configured base unless it is absolute
pub fn resolve(path: &str, config: &AbrSimConfig) -> Result<PathBuf> {
    let path = Path::new(path);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(base_dir(config.source.base, config.config_dir.as_deref())?.join(path))
}

/// Absolute media path for `source.path`
pub fn resolve_source_path(config: &AbrSimConfig) -> Result<PathBuf> {
    let resolved = resolve(&config.source.path, config)?;
    debug!("Source path resolved to {}", resolved.display());
    Ok(resolved)
}

/// Export `system.plugin_path` as GST_PLUGIN_PATH; must run before decoders initialise
pub fn apply_plugin_path(config: &AbrSimConfig) -> Result<Option<PathBuf>> {
    let Some(plugin_path) = config.system.plugin_path.as_deref() else {
        return Ok(None);
    };

    let resolved = resolve(plugin_path, config)?;
    std::env::set_var(GST_PLUGIN_PATH, &resolved);
    info!("{} set to {}", GST_PLUGIN_PATH, resolved.display());
    Ok(Some(resolved))
}
