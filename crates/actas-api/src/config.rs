//! # Service Configuration
//!
//! Process settings come from the environment:
//!
//! | Variable       | Default | Meaning                                          |
//! |----------------|---------|--------------------------------------------------|
//! | `PORT`         | `8080`  | listen port                                      |
//! | `AUTH_TOKEN`   | unset   | shared bearer secret; unset disables auth        |
//! | `DATABASE_URL` | unset   | PostgreSQL URL; unset keeps state in memory      |
//! | `ACTAS_CONFIG` | unset   | YAML file with the actor roster and area catalog |
//! | `LOG_FORMAT`   | `text`  | `json` switches the log formatter                |
//!
//! The YAML file looks like:
//!
//! ```yaml
//! actors:
//!   - id: 6f1c9a52-0d7e-4b8e-9b1a-3d2f0e4c5a11
//!     name: Mesa de partes
//!     roles: [MESA_DE_PARTES]
//! known_areas:
//!   - { code: MAT, name: Matemática }
//! validation:
//!   require_national_id: false
//!   similarity_threshold: 70
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use actas_core::{ActorProfile, StaticCapabilityRegistry};
use actas_validation::{AreaCatalog, KnownArea, ValidationConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("config file {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Environment-level settings.
#[derive(Clone, Default)]
pub struct AppConfig {
    pub port: u16,
    pub auth_token: Option<String>,
    pub database_url: Option<String>,
    pub config_path: Option<PathBuf>,
    pub log_json: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("config_path", &self.config_path)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "PORT",
                value: raw,
            })?,
            None => 8080,
        };

        Ok(Self {
            port,
            auth_token: var("AUTH_TOKEN"),
            database_url: var("DATABASE_URL"),
            config_path: var("ACTAS_CONFIG").map(PathBuf::from),
            log_json: var("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// The institution file, or the defaults when no path is configured.
    pub fn load_institution(&self) -> Result<InstitutionConfig, ConfigError> {
        match &self.config_path {
            Some(path) => InstitutionConfig::load(path),
            None => Ok(InstitutionConfig::default()),
        }
    }
}

/// Roster, area catalog and validator settings for one institution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionConfig {
    #[serde(default)]
    pub actors: Vec<ActorProfile>,
    /// Empty means the standard catalog.
    #[serde(default)]
    pub known_areas: Vec<KnownArea>,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl InstitutionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    fn check(&self) -> Result<(), String> {
        if self.validation.similarity_threshold > 100 {
            return Err("validation.similarity_threshold must be at most 100".into());
        }
        let mut seen = std::collections::HashSet::new();
        for actor in &self.actors {
            if !seen.insert(actor.id) {
                return Err(format!("actor {} is declared twice", actor.id));
            }
        }
        for area in &self.known_areas {
            if area.code.trim().is_empty() {
                return Err("known area with empty code".into());
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> AreaCatalog {
        if self.known_areas.is_empty() {
            AreaCatalog::standard()
        } else {
            AreaCatalog::new(self.known_areas.clone())
        }
    }

    pub fn registry(&self) -> StaticCapabilityRegistry {
        StaticCapabilityRegistry::new(self.actors.clone())
    }
}
