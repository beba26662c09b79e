use crate::error::KeelError;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Registry namespace the built-in filters are published under.
pub const DEFAULT_NAMESPACE: &str = "keel.filter_factory";

const ENV_PREFIX: &str = "KEEL_";
const ENV_SEPARATOR: &str = "__";

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeelConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub log: LogConfig,
    /// Global conf handed to every filter, overlaid by the filter's own section.
    #[serde(default)]
    pub global: Map<String, Value>,
    /// Filter sections, keyed by the name pipelines refer to.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterSection>,
    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineSection>,
    /// Composite apps: path prefix → pipeline name.
    #[serde(default)]
    pub urlmaps: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// A named filter: which plugin to use and its local conf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSection {
    /// Plugin name. Defaults to the section key.
    #[serde(default, rename = "use")]
    pub plugin: Option<String>,
    /// Everything else in the section is local conf.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Filter names in request order.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Terminal application name.
    pub app: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_namespace() -> String { DEFAULT_NAMESPACE.into() }
fn default_log_level() -> String { "info".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            log: LogConfig::default(),
            global: Map::new(),
            filters: BTreeMap::new(),
            pipelines: BTreeMap::new(),
            urlmaps: BTreeMap::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl KeelConfig {
    /// Load configuration from a YAML file + `KEEL_` env overrides.
    ///
    /// A missing file yields the defaults, still overlaid by the env.
    /// Env keys nest on `__`, so `KEEL_GLOBAL__ADMIN_TOKEN` sets
    /// `global.admin_token`.
    pub fn load(path: &Path) -> Result<Self, KeelError> {
        let config: KeelConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR))
            .extract()?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            pipelines = config.pipelines.len(),
            filters = config.filters.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Parse configuration from a YAML string, without env overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self, KeelError> {
        let config: KeelConfig = Figment::new().merge(Yaml::string(yaml)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that serde alone cannot express.
    pub fn validate(&self) -> Result<(), KeelError> {
        if self.namespace.trim().is_empty() {
            return Err(KeelError::Config("namespace must not be empty".into()));
        }
        for (name, section) in &self.filters {
            if section.plugin.as_deref().is_some_and(|p| p.trim().is_empty()) {
                return Err(KeelError::Config(format!(
                    "filter '{name}' has an empty 'use'"
                )));
            }
        }
        for (name, pipeline) in &self.pipelines {
            if pipeline.app.trim().is_empty() {
                return Err(KeelError::Config(format!(
                    "pipeline '{name}' has no app"
                )));
            }
        }
        for (name, mounts) in &self.urlmaps {
            if self.pipelines.contains_key(name) {
                return Err(KeelError::Config(format!(
                    "urlmap '{name}' clashes with a pipeline of the same name"
                )));
            }
            if mounts.is_empty() {
                return Err(KeelError::Config(format!("urlmap '{name}' mounts nothing")));
            }
        }
        Ok(())
    }

    /// Plugin name and local conf for a pipeline entry.
    ///
    /// Entries naming a filter section resolve through it; any other entry
    /// is taken as a plugin name with empty local conf.
    pub fn filter(&self, entry: &str) -> (String, Map<String, Value>) {
        match self.filters.get(entry) {
            Some(section) => (
                section.plugin.clone().unwrap_or_else(|| entry.to_string()),
                section.options.clone(),
            ),
            None => (entry.to_string(), Map::new()),
        }
    }
}
