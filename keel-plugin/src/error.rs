use thiserror::Error;

/// Construction stage at which a plugin constructor failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Configuring the factory from deployment config.
    Factory,
    /// Producing the filter around its next handler.
    Filter,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Factory => "factory",
            Stage::Filter => "filter",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registry and pipeline construction errors. All of them are fatal at
/// startup; no partial chain is ever returned alongside one.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin '{name}' is already registered with a different descriptor")]
    DuplicateName { name: String },

    #[error("unknown plugin '{name}' in namespace '{namespace}'")]
    UnknownPlugin { namespace: String, name: String },

    #[error("plugin '{name}' failed at {stage} stage: {source}")]
    Construction {
        name: String,
        stage: Stage,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("pipeline '{pipeline}' references unknown app '{app}'")]
    UnknownApp { pipeline: String, app: String },

    #[error("urlmap '{urlmap}' references unknown pipeline '{pipeline}'")]
    UnknownPipeline { urlmap: String, pipeline: String },

    #[error("global plugin registry is already installed")]
    GlobalAlreadyInstalled,
}

impl PluginError {
    /// The plugin name this error is about, if any.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            PluginError::DuplicateName { name }
            | PluginError::UnknownPlugin { name, .. }
            | PluginError::Construction { name, .. } => Some(name),
            _ => None,
        }
    }
}
