pub mod auth;
pub mod debug;
pub mod environ;
pub mod traffic;
pub mod transform;

use keel_plugin::{PluginDescriptor, PluginError, PluginRegistry};

/// Entry-point table of the built-in middleware.
///
/// Names are the stable identifiers deployments refer to; targets name the
/// constructor each entry resolves to.
pub fn entry_points() -> Vec<PluginDescriptor> {
    vec![
        // Auth
        PluginDescriptor::factory(
            "admin_token_auth",
            "keel_plugins::auth::admin_token_auth::factory",
            auth::admin_token_auth::factory,
        ),
        PluginDescriptor::factory(
            "build_auth_context",
            "keel_plugins::auth::auth_context::factory",
            auth::auth_context::factory,
        ),
        PluginDescriptor::factory(
            "token_auth",
            "keel_plugins::auth::token_auth::factory",
            auth::token_auth::factory,
        ),
        // Traffic
        PluginDescriptor::factory(
            "request_id",
            "keel_plugins::traffic::request_id::factory",
            traffic::request_id::factory,
        ),
        PluginDescriptor::factory(
            "sizelimit",
            "keel_plugins::traffic::sizelimit::factory",
            traffic::sizelimit::factory,
        ),
        // Transform
        PluginDescriptor::filter(
            "cors_extension",
            "keel_plugins::transform::cors::filter_factory",
            transform::cors::filter_factory,
        ),
        PluginDescriptor::factory(
            "json_body",
            "keel_plugins::transform::json_body::factory",
            transform::json_body::factory,
        ),
        PluginDescriptor::factory(
            "url_normalize",
            "keel_plugins::transform::url_normalize::factory",
            transform::url_normalize::factory,
        ),
        // Diagnostics
        PluginDescriptor::factory("debug", "keel_plugins::debug::factory", debug::factory),
    ]
}

/// Register all built-in plugins.
pub fn register_all(registry: &mut PluginRegistry) -> Result<(), PluginError> {
    registry.extend(entry_points())?;
    tracing::info!(
        namespace = %registry.namespace(),
        plugins = registry.len(),
        "Registered built-in plugins"
    );
    Ok(())
}
