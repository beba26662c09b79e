pub mod admin_token_auth;
pub mod auth_context;
pub mod token_auth;
