//! Layered option loading: defaults, then a JSON file, then `TIGHTEN_*`
//! environment variables, then explicit overrides.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TightenError};
use crate::opportunity::load_json;
use crate::policy::{TighteningMode, TighteningOptions};

/// Prefix shared by every environment variable the loader reads.
pub const ENV_PREFIX: &str = "TIGHTEN_";

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
    Override,
}

impl ConfigSource {
    pub fn label(&self) -> &'static str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
            ConfigSource::Override => "override",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// (option key, JSON pointer, environment variable)
const TRACKED_KEYS: [(&str, &str, &str); 9] = [
    ("mode", "/mode", "TIGHTEN_MODE"),
    ("null_budget", "/null_budget", "TIGHTEN_NULL_BUDGET"),
    (
        "foreign_keys.enable_creation",
        "/foreign_keys/enable_creation",
        "TIGHTEN_ENABLE_FOREIGN_KEYS",
    ),
    (
        "foreign_keys.allow_cross_schema",
        "/foreign_keys/allow_cross_schema",
        "TIGHTEN_ALLOW_CROSS_SCHEMA",
    ),
    (
        "foreign_keys.allow_cross_catalog",
        "/foreign_keys/allow_cross_catalog",
        "TIGHTEN_ALLOW_CROSS_CATALOG",
    ),
    (
        "uniqueness.enforce_single_column",
        "/uniqueness/enforce_single_column",
        "TIGHTEN_ENFORCE_SINGLE_UNIQUE",
    ),
    (
        "uniqueness.enforce_multi_column",
        "/uniqueness/enforce_multi_column",
        "TIGHTEN_ENFORCE_MULTI_UNIQUE",
    ),
    (
        "remediation.generate_pre_scripts",
        "/remediation/generate_pre_scripts",
        "TIGHTEN_GENERATE_PRE_SCRIPTS",
    ),
    (
        "max_degree_of_parallelism",
        "/max_degree_of_parallelism",
        "TIGHTEN_MAX_PARALLELISM",
    ),
];

/// Values supplied directly by the caller (e.g. command-line flags).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionOverrides {
    pub mode: Option<TighteningMode>,
    pub null_budget: Option<f64>,
    pub enable_foreign_keys: Option<bool>,
    pub allow_cross_schema: Option<bool>,
    pub allow_cross_catalog: Option<bool>,
    pub generate_pre_scripts: Option<bool>,
    pub max_degree_of_parallelism: Option<usize>,
}

/// Options plus the source of every tracked key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    pub options: TighteningOptions,
    pub sources: BTreeMap<String, ConfigSource>,
}

impl ResolvedOptions {
    pub fn source(&self, key: &str) -> ConfigSource {
        self.sources.get(key).copied().unwrap_or(ConfigSource::Default)
    }
}

/// Builds [`TighteningOptions`] from layered sources.
#[derive(Debug, Clone, Default)]
pub struct OptionsLoader {
    file: Option<PathBuf>,
    env: BTreeMap<String, String>,
    overrides: OptionOverrides,
}

impl OptionsLoader {
    /// A loader with no file, no environment and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `TIGHTEN_*` variables from the process environment.
    pub fn from_process_env() -> Self {
        Self::new().with_env_map(
            std::env::vars()
                .filter(|(key, _)| key.starts_with(ENV_PREFIX))
                .collect(),
        )
    }

    /// Use an explicit environment map.
    pub fn with_env_map(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Read a JSON options file.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_overrides(mut self, overrides: OptionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Resolve every layer and validate the result.
    pub fn load(&self) -> Result<ResolvedOptions> {
        let mut sources: BTreeMap<String, ConfigSource> = TRACKED_KEYS
            .iter()
            .map(|(key, _, _)| (key.to_string(), ConfigSource::Default))
            .collect();

        let mut options = match &self.file {
            Some(path) => {
                let raw: Value = load_json(path)?;
                let options: TighteningOptions = serde_json::from_value(raw.clone()).map_err(|e| {
                    TightenError::Config(format!(
                        "Failed to parse options file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                for (key, pointer, _) in TRACKED_KEYS {
                    if raw.pointer(pointer).is_some() {
                        sources.insert(key.to_string(), ConfigSource::File);
                    }
                }
                tracing::debug!(path = %path.display(), "options file loaded");
                options
            }
            None => TighteningOptions::default(),
        };

        for (key, _, variable) in TRACKED_KEYS {
            if let Some(raw) = self.env.get(variable) {
                apply_env(&mut options, key, variable, raw)?;
                sources.insert(key.to_string(), ConfigSource::Environment);
            }
        }

        self.apply_overrides(&mut options, &mut sources);
        options
            .validate()
            .map_err(|e| TightenError::Config(e.to_string()))?;

        Ok(ResolvedOptions { options, sources })
    }

    fn apply_overrides(
        &self,
        options: &mut TighteningOptions,
        sources: &mut BTreeMap<String, ConfigSource>,
    ) {
        let o = &self.overrides;
        let mut mark = |key: &str| {
            sources.insert(key.to_string(), ConfigSource::Override);
        };
        if let Some(mode) = o.mode {
            options.mode = mode;
            mark("mode");
        }
        if let Some(budget) = o.null_budget {
            options.null_budget = budget;
            mark("null_budget");
        }
        if let Some(enable) = o.enable_foreign_keys {
            options.foreign_keys.enable_creation = enable;
            mark("foreign_keys.enable_creation");
        }
        if let Some(allow) = o.allow_cross_schema {
            options.foreign_keys.allow_cross_schema = allow;
            mark("foreign_keys.allow_cross_schema");
        }
        if let Some(allow) = o.allow_cross_catalog {
            options.foreign_keys.allow_cross_catalog = allow;
            mark("foreign_keys.allow_cross_catalog");
        }
        if let Some(generate) = o.generate_pre_scripts {
            options.remediation.generate_pre_scripts = generate;
            mark("remediation.generate_pre_scripts");
        }
        if let Some(workers) = o.max_degree_of_parallelism {
            options.max_degree_of_parallelism = Some(workers);
            mark("max_degree_of_parallelism");
        }
    }
}

fn parse_bool(variable: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TightenError::Config(format!(
            "{} must be a boolean, got '{}'",
            variable, raw
        ))),
    }
}

fn apply_env(options: &mut TighteningOptions, key: &str, variable: &str, raw: &str) -> Result<()> {
    match key {
        "mode" => options.mode = raw.parse().map_err(TightenError::Config)?,
        "null_budget" => {
            options.null_budget = raw.trim().parse().map_err(|_| {
                TightenError::Config(format!("{} must be a number, got '{}'", variable, raw))
            })?
        }
        "foreign_keys.enable_creation" => {
            options.foreign_keys.enable_creation = parse_bool(variable, raw)?
        }
        "foreign_keys.allow_cross_schema" => {
            options.foreign_keys.allow_cross_schema = parse_bool(variable, raw)?
        }
        "foreign_keys.allow_cross_catalog" => {
            options.foreign_keys.allow_cross_catalog = parse_bool(variable, raw)?
        }
        "uniqueness.enforce_single_column" => {
            options.uniqueness.enforce_single_column = parse_bool(variable, raw)?
        }
        "uniqueness.enforce_multi_column" => {
            options.uniqueness.enforce_multi_column = parse_bool(variable, raw)?
        }
        "remediation.generate_pre_scripts" => {
            options.remediation.generate_pre_scripts = parse_bool(variable, raw)?
        }
        "max_degree_of_parallelism" => {
            let workers: usize = raw.trim().parse().map_err(|_| {
                TightenError::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    variable, raw
                ))
            })?;
            options.max_degree_of_parallelism = Some(workers);
        }
        _ => {}
    }
    Ok(())
}
