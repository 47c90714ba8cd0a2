use anyhow::{Context, Result};
use l1_validator_registry::RegistrarConfig;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<config dir>/l1-registrar/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_default()
        .join("l1-registrar")
        .join("config.toml")
}

/// Loads the configuration, writing the defaults first if the file does not exist yet.
pub fn load(path: Option<&Path>) -> Result<RegistrarConfig> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !config_path.exists() {
        let config = RegistrarConfig::default();
        config
            .save(&config_path)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        info!(path = %config_path.display(), "wrote default configuration");
        return Ok(config);
    }

    RegistrarConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))
}
