pub mod chain;
pub mod config;
pub mod deploy;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod handler;
pub mod pipeline;
pub mod registry;
pub mod urlmap;

pub use chain::DispatchChain;
pub use config::PluginConfig;
pub use deploy::Deployment;
pub use descriptor::{ConstructionMode, Constructor, FilterFactory, PluginDescriptor};
pub use error::{PluginError, Stage};
pub use handler::{BoxHandler, Handler, handler_fn};
pub use pipeline::PipelineSpec;
pub use registry::PluginRegistry;
