mod selection;
mod settings;

pub use selection::{SelectionStore, SELECTION_VERSION};
pub use settings::{ApiSettings, Config, DisplaySettings, Role, UserSettings, MAX_PAGE_SIZE};

use crate::error::{LedgerError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.ledger/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "ledger") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".ledger"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

pub fn config_file(config_dir: &Path) -> PathBuf {
    config_dir.join("config.toml")
}

/// Load config.toml, apply environment overrides and validate
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_file(config_dir);
    if !path.exists() {
        return Err(LedgerError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| LedgerError::ConfigParse { path, source: e })?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write the template
pub fn init_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Err(LedgerError::AlreadyInitialized(config_dir.to_path_buf()));
    }
    fs::create_dir_all(config_dir)?;
    fs::write(config_file(config_dir), CONFIG_TEMPLATE)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://localhost:5000"
# token = "..."        # optional, sent as a bearer token
timeout_secs = 10

[display]
currency_symbol = "$"
page_size = 15         # 1..=200

[user]
role = "staff"         # "admin" allows deleting accounts
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_writes_parseable_template() {
        let dir = TempDir::new().unwrap();
        let cfg_dir = dir.path().join("ledger");
        init_config_dir(&cfg_dir).unwrap();

        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.user.role, Role::Staff);
        assert!(config_file(&cfg_dir).exists());
    }

    #[test]
    fn init_refuses_existing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            init_config_dir(dir.path()),
            Err(LedgerError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(LedgerError::ConfigFileNotFound(_))
        ));
    }

    #[test]
    fn parse_errors_carry_path() {
        let dir = TempDir::new().unwrap();
        fs::write(config_file(dir.path()), "[api\n").unwrap();
        match load_config(dir.path()) {
            Err(LedgerError::ConfigParse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
