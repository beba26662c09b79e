//! Environ keys the built-in middleware exchange data through.

/// Request context: `token_id`, `subject_token_id`, `is_admin`.
pub const CONTEXT: &str = "keel.context";

/// JSON body params parsed by `json_body`.
pub const PARAMS: &str = "keel.params";

/// Auth context assembled by `build_auth_context`.
pub const AUTH_CONTEXT: &str = "keel.auth_context";

/// Request id assigned by `request_id`.
pub const REQUEST_ID: &str = "keel.request_id";

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";
