// Configuration loading and parsing (league.toml, runtime.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `[database] path` in runtime.toml.
pub const DB_PATH_ENV_VAR: &str = "EBL_DB_PATH";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub scoring: ScoringConfig,
    pub db_path: String,
    pub audit: AuditConfig,
    pub retry: RetryConfig,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    scoring: ScoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub season: i32,
    pub num_teams: usize,
    /// Players each team carries when its roster is full.
    pub roster_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Points for 1st, 2nd, 3rd ... place in each weekly category.
    pub places: Vec<i64>,
}

// ---------------------------------------------------------------------------
// runtime.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct RuntimeFile {
    database: DatabaseSection,
    audit: AuditConfig,
    retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Directory that receives `roster-moves-YYYY-MM-DD.md` files.
    pub log_dir: String,
}

/// Bounded retry around the whole weekly batch.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/runtime.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let runtime_path = config_dir.join("runtime.toml");
    let runtime_text = read_file(&runtime_path)?;
    let runtime_file: RuntimeFile =
        toml::from_str(&runtime_text).map_err(|e| ConfigError::ParseError {
            path: runtime_path.clone(),
            source: e,
        })?;

    let db_path = match std::env::var(DB_PATH_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => path,
        _ => runtime_file.database.path,
    };

    let config = Config {
        league: league_file.league,
        scoring: league_file.scoring,
        db_path,
        audit: runtime_file.audit,
        retry: runtime_file.retry,
    };

    validate(&config)?;

    Ok(config)
}

/// The files `load_config_from` reads from `config/`.
pub const CONFIG_FILES: [&str; 2] = ["league.toml", "runtime.toml"];

/// Copy each of [`CONFIG_FILES`] missing from `config/` out of `defaults/`.
/// Returns the files that were copied; existing config is never touched.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "{name} is in neither config/ nor defaults/ under {}",
                    base_dir.display()
                ),
            });
        }
        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", config_dir.display()),
        })?;
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Pick the directory holding `defaults/` and `config/`.
///
/// The working directory wins when it has either; otherwise the per-user
/// config directory (e.g. `~/.config/ebl` on Linux) is used.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("defaults").exists() || cwd.join("config").exists() {
        return Ok(cwd);
    }
    match directories::ProjectDirs::from("org", "ebl", "ebl") {
        Some(dirs) => Ok(dirs.config_dir().to_path_buf()),
        None => Ok(cwd),
    }
}

/// Copy missing defaults into `base_dir/config`, then load from there.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.num_teams == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.num_teams".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.league.roster_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.roster_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    let places = &config.scoring.places;
    if places.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "scoring.places".into(),
            message: "must award points to at least one place".into(),
        });
    }
    if places.windows(2).any(|w| w[1] > w[0]) {
        return Err(ConfigError::ValidationError {
            field: "scoring.places".into(),
            message: format!("must not increase from one place to the next, got {places:?}"),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "retry.max_attempts".into(),
            message: "must be > 0".into(),
        });
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ConfigError::ValidationError {
            field: "retry.initial_backoff_ms".into(),
            message: format!(
                "must not exceed retry.max_backoff_ms ({}), got {}",
                retry.max_backoff_ms, retry.initial_backoff_ms
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
