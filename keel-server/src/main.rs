// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Keel: middleware registry and chained-dispatch pipelines
//
//  Registry:  built-in entry points, installed once as the global
//  Config:    YAML + KEEL_ env overrides
//  Commands:  plugins / check / config / dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod apps;

use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use keel_core::config::LogFormat;
use keel_core::{KeelConfig, Request};
use keel_plugin::{Deployment, PluginRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "keel", version, about = "Keel: middleware registry and dispatch pipelines")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "keel.yaml")]
    config: PathBuf,

    /// Log level (overrides `log.level` from the config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered plugins
    Plugins,
    /// Build every pipeline and report its filters
    Check,
    /// Print the effective configuration
    Config,
    /// Send one request through a pipeline or url map
    Dispatch {
        /// Pipeline or url map name
        #[arg(short, long)]
        pipeline: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(long, default_value = "/")]
        path: String,

        /// Request header, `name: value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(short, long)]
        body: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Config ──
    let config = load_config(&cli.config)?;

    // ── Tracing ──
    init_tracing(
        cli.log_level.as_deref().unwrap_or(&config.log.level),
        config.log.format,
    );
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        found = cli.config.exists(),
        namespace = %config.namespace,
        pipelines = config.pipelines.len(),
        filters = config.filters.len(),
        urlmaps = config.urlmaps.len(),
        "Keel starting"
    );

    // ── Plugin registry ──
    let mut registry = PluginRegistry::new(config.namespace.clone());
    keel_plugins::register_all(&mut registry)?;
    let registry = keel_plugin::registry::install_global(registry)?;

    match cli.command {
        Command::Plugins => list_plugins(&registry),
        Command::Check => check(&config, &registry),
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Command::Dispatch {
            pipeline,
            method,
            path,
            headers,
            body,
        } => {
            let mut req = build_request(&method, &path, &headers, body)?;
            dispatch(&config, &registry, &pipeline, &mut req)
        }
    }
}

/// File (when present) plus `KEEL_` env overrides.
fn load_config(path: &Path) -> anyhow::Result<KeelConfig> {
    KeelConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

// ── Commands ──

fn list_plugins(registry: &PluginRegistry) -> anyhow::Result<()> {
    println!("namespace: {}", registry.namespace());
    for name in registry.names() {
        let descriptor = registry.resolve(name)?;
        println!(
            "{:<20} {:<18} {}",
            descriptor.name(),
            descriptor.mode(),
            descriptor.target()
        );
    }
    Ok(())
}

fn check(config: &KeelConfig, registry: &Arc<PluginRegistry>) -> anyhow::Result<()> {
    let deployment = Deployment::build(config, registry, &apps::table())
        .context("configuration does not build")?;
    for chain in deployment.pipelines() {
        let mut stages: Vec<&str> = chain.filters().iter().map(String::as_str).collect();
        if let Some(section) = config.pipelines.get(chain.name()) {
            stages.push(&section.app);
        }
        println!("{}: {}", chain.name(), stages.join(" -> "));
    }
    for (name, mounts) in &config.urlmaps {
        for (prefix, pipeline) in mounts {
            println!("{name}: {prefix} => {pipeline}");
        }
    }
    println!("ok: {} handlers, apps available: {}", deployment.names().len(), apps::names().join(", "));
    Ok(())
}

fn dispatch(
    config: &KeelConfig,
    registry: &Arc<PluginRegistry>,
    name: &str,
    req: &mut Request,
) -> anyhow::Result<()> {
    let deployment = Deployment::build(config, registry, &apps::table())?;
    let handler = deployment
        .handler(name)
        .with_context(|| format!("no pipeline or urlmap named '{name}' (have: {})", deployment.names().join(", ")))?;

    let resp = handler.call(req);
    println!("{}", resp.status);
    for (k, v) in &resp.headers {
        println!("{}: {}", k, String::from_utf8_lossy(v.as_bytes()));
    }
    println!();
    println!("{}", resp.text());
    Ok(())
}

fn build_request(
    method: &str,
    path: &str,
    headers: &[String],
    body: Option<String>,
) -> anyhow::Result<Request> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{method}'"))?;
    let mut req = Request::new(method, path);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        req.set_header(name, value);
    }
    if let Some(body) = body {
        if req.header("content-length").is_none() {
            req.set_header("content-length", &body.len().to_string());
        }
        req.body = body.into();
    }
    Ok(req)
}

fn parse_header(raw: &str) -> anyhow::Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("header '{raw}' is not 'name: value'"))?;
    let name = name.trim();
    if name.is_empty() || http::HeaderName::from_bytes(name.as_bytes()).is_err() {
        anyhow::bail!("invalid header name in '{raw}'");
    }
    Ok((name, value.trim()))
}
