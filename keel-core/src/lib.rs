pub mod config;
pub mod error;
pub mod request;

pub use config::KeelConfig;
pub use error::KeelError;
pub use request::{Request, Response};
