use thiserror::Error;

/// Unified error type for Keel configuration and request handling.
#[derive(Error, Debug)]
pub enum KeelError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config load error: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request entity too large: {0}")]
    PayloadTooLarge(String),

}

impl From<figment::Error> for KeelError {
    fn from(err: figment::Error) -> Self {
        KeelError::Load(Box::new(err))
    }
}

impl KeelError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            KeelError::BadRequest(_) => http::StatusCode::BAD_REQUEST,
            KeelError::PayloadTooLarge(_) => http::StatusCode::PAYLOAD_TOO_LARGE,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
