use crate::store::Backend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory that marks a catalog project root.
pub const SHELF_DIR: &str = ".shelf";

/// Environment variable that overrides `[storage] backend`.
pub const BACKEND_ENV: &str = "SHELF_BACKEND";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Local store directory, relative to the project root.
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// SQLite database file, relative to the project root.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            local_dir: default_local_dir(),
            sqlite_path: default_sqlite_path(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Products with stock strictly below this count as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(SHELF_DIR).join("config.toml")
}

/// Load `.shelf/config.toml`; defaults when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write the default project config, with `backend` selected, unless one
/// already exists.
///
/// Returns `true` when a file was written.
///
/// # Errors
///
/// Returns an error if the config cannot be serialized or written.
pub fn write_default_project_config(project_root: &Path, backend: Backend) -> Result<bool> {
    let path = project_config_path(project_root);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut config = ProjectConfig::default();
    config.storage.backend = backend;
    let body = toml::to_string_pretty(&config)
        .context("Failed to serialize default config")?;
    std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Load the per-user config (`~/.config/shelf/config.toml`); defaults when
/// there is no config directory or no file.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("shelf/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Project config with the backend override applied.
///
/// Precedence: `cli_backend`, then `SHELF_BACKEND`, then the config file.
///
/// # Errors
///
/// Returns an error if the project config cannot be loaded or
/// `SHELF_BACKEND` names an unknown backend.
pub fn resolve_project_config(
    project_root: &Path,
    cli_backend: Option<Backend>,
) -> Result<ProjectConfig> {
    let mut config = load_project_config(project_root)?;
    config.storage.backend =
        resolve_backend(config.storage.backend, cli_backend, env::var(BACKEND_ENV).ok())?;
    Ok(config)
}

fn resolve_backend(
    configured: Backend,
    cli_backend: Option<Backend>,
    env_backend: Option<String>,
) -> Result<Backend> {
    if let Some(backend) = cli_backend {
        return Ok(backend);
    }

    match env_backend.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .with_context(|| format!("invalid {BACKEND_ENV} value")),
        _ => Ok(configured),
    }
}

/// Walk up from `start` to the nearest directory containing `.shelf/`.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(SHELF_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(SHELF_DIR).join("data")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from(SHELF_DIR).join("catalog.sqlite3")
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

const fn default_low_stock_threshold() -> i64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp dir must be created")
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = temp_root();
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.storage.backend, Backend::Local);
        assert_eq!(cfg.storage.local_dir, PathBuf::from(".shelf/data"));
        assert_eq!(cfg.storage.sqlite_path, PathBuf::from(".shelf/catalog.sqlite3"));
        assert_eq!(cfg.storage.lock_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.stats.low_stock_threshold, 10);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let root = temp_root();
        std::fs::create_dir_all(root.path().join(SHELF_DIR)).unwrap();
        std::fs::write(
            project_config_path(root.path()),
            "[storage]\nbackend = \"sqlite\"\n\n[stats]\nlow_stock_threshold = 3\n",
        )
        .unwrap();

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.storage.backend, Backend::Sqlite);
        assert_eq!(cfg.storage.lock_timeout_ms, 5_000);
        assert_eq!(cfg.stats.low_stock_threshold, 3);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let root = temp_root();
        std::fs::create_dir_all(root.path().join(SHELF_DIR)).unwrap();
        std::fs::write(project_config_path(root.path()), "[storage\nbackend=").unwrap();

        let err = load_project_config(root.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn default_config_is_written_once_and_reloads() {
        let root = temp_root();
        assert!(write_default_project_config(root.path(), Backend::Local).unwrap());
        assert!(!write_default_project_config(root.path(), Backend::Sqlite).unwrap());

        let cfg = load_project_config(root.path()).unwrap();
        assert_eq!(cfg, ProjectConfig::default());
    }

    #[test]
    fn default_config_records_chosen_backend() {
        let root = temp_root();
        write_default_project_config(root.path(), Backend::Sqlite).unwrap();

        let raw = std::fs::read_to_string(project_config_path(root.path())).unwrap();
        assert!(raw.contains("backend = \"sqlite\""));
        assert_eq!(
            load_project_config(root.path()).unwrap().storage.backend,
            Backend::Sqlite
        );
    }

    #[test]
    fn cli_backend_beats_env_and_file() {
        let backend =
            resolve_backend(Backend::Local, Some(Backend::Sqlite), Some("local".into())).unwrap();
        assert_eq!(backend, Backend::Sqlite);
    }

    #[test]
    fn env_backend_beats_file() {
        let backend = resolve_backend(Backend::Local, None, Some(" sqlite ".into())).unwrap();
        assert_eq!(backend, Backend::Sqlite);

        let blank = resolve_backend(Backend::Sqlite, None, Some(String::new())).unwrap();
        assert_eq!(blank, Backend::Sqlite);
    }

    #[test]
    fn unknown_env_backend_is_rejected() {
        let err = resolve_backend(Backend::Local, None, Some("mongo".into())).unwrap_err();
        assert!(err.to_string().contains(BACKEND_ENV));
    }

    #[test]
    fn project_root_is_found_from_nested_directory() {
        let root = temp_root();
        std::fs::create_dir_all(root.path().join(SHELF_DIR)).unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(root.path().to_path_buf()));
    }
}
