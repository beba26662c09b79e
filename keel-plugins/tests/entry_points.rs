use keel_core::{KeelConfig, Request, Response};
use keel_plugin::{ConstructionMode, Deployment, PluginRegistry, deploy::AppTable, handler_fn};
use keel_plugins::{entry_points, register_all};
use serde_json::{Value, json};

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::default();
    register_all(&mut registry).unwrap();
    registry
}

// ── Entry-point table ─────────────────────────────────────────

#[test]
fn entry_point_middleware_is_registered() {
    use ConstructionMode::{DirectFilter, StandardFactory};
    let expected = [
        ("admin_token_auth", "keel_plugins::auth::admin_token_auth::factory", StandardFactory),
        ("build_auth_context", "keel_plugins::auth::auth_context::factory", StandardFactory),
        ("cors_extension", "keel_plugins::transform::cors::filter_factory", DirectFilter),
        ("debug", "keel_plugins::debug::factory", StandardFactory),
        ("json_body", "keel_plugins::transform::json_body::factory", StandardFactory),
        ("request_id", "keel_plugins::traffic::request_id::factory", StandardFactory),
        ("sizelimit", "keel_plugins::traffic::sizelimit::factory", StandardFactory),
        ("token_auth", "keel_plugins::auth::token_auth::factory", StandardFactory),
        ("url_normalize", "keel_plugins::transform::url_normalize::factory", StandardFactory),
    ];

    let registry = registry();
    let names = registry.names();
    for (name, _, _) in &expected {
        assert!(names.contains(name), "missing entry point '{name}'");
    }

    for (name, target, mode) in expected {
        let descriptor = registry.resolve(name).unwrap();
        assert_eq!(descriptor.name(), name);
        assert_eq!(descriptor.target(), target, "target of '{name}'");
        assert_eq!(descriptor.mode(), mode, "mode of '{name}'");
    }
}

#[test]
fn entry_points_have_unique_names() {
    let points = entry_points();
    let mut names: Vec<&str> = points.iter().map(|d| d.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), points.len());
}

#[test]
fn registering_twice_is_idempotent() {
    let mut registry = registry();
    let before = registry.len();
    register_all(&mut registry).unwrap();
    assert_eq!(registry.len(), before);
}

#[test]
fn every_entry_point_builds_with_default_conf() {
    let registry = registry();
    let mut yaml = String::from("pipelines:\n");
    for name in registry.names() {
        yaml.push_str(&format!("  {name}_only:\n    filters: [{name}]\n    app: echo\n"));
    }
    let config = KeelConfig::from_yaml(&yaml).unwrap();
    let deployment = Deployment::build(&config, &registry, &apps()).unwrap();
    assert_eq!(deployment.pipelines().count(), registry.len());
}

// ── A full identity-style pipeline ────────────────────────────

fn apps() -> AppTable {
    let mut apps = AppTable::new();
    apps.insert(
        "echo".into(),
        handler_fn(|req: &mut Request| {
            let environ: serde_json::Map<String, Value> =
                req.environ.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            Response::json(http::StatusCode::OK, &json!({ "path": req.path, "environ": environ }))
        }),
    );
    apps
}

const CONFIG: &str = r#"
global:
  admin_token: ADMIN
filters:
  sizelimit:
    max_request_body_size: 64
  cors:
    use: cors_extension
    allowed_origin: ["https://ui.example.com"]
pipelines:
  api_v3:
    filters: [cors, sizelimit, url_normalize, request_id, admin_token_auth, token_auth, json_body, build_auth_context]
    app: echo
urlmaps:
  main:
    /v3: api_v3
"#;

fn main_handler() -> keel_plugin::BoxHandler {
    let config = KeelConfig::from_yaml(CONFIG).unwrap();
    let deployment = Deployment::build(&config, &registry(), &apps()).unwrap();
    deployment.handler("main").unwrap()
}

fn body(resp: &Response) -> Value {
    serde_json::from_slice(&resp.body).unwrap()
}

#[test]
fn user_request_flows_through_every_filter() {
    let handler = main_handler();
    let mut req = Request::post("/v3/users/", r#"{"user": {"name": "alice"}, "_private": 1}"#)
        .with_header("content-type", "application/json")
        .with_header("x-auth-token", "user-token")
        .with_header("origin", "https://ui.example.com");
    let resp = handler.call(&mut req);
    assert_eq!(resp.status, http::StatusCode::OK);

    let body = body(&resp);
    assert_eq!(body["path"], json!("/users"));
    let environ = &body["environ"];
    assert_eq!(environ["keel.script_name"], json!("/v3"));
    assert_eq!(environ["keel.params"], json!({ "user": { "name": "alice" } }));
    assert_eq!(
        environ["keel.auth_context"],
        json!({ "token_id": "user-token", "is_admin": false })
    );
    assert_eq!(
        resp.header("x-openstack-request-id").map(String::from),
        environ["keel.request_id"].as_str().map(String::from)
    );
    assert_eq!(resp.header("access-control-allow-origin"), Some("https://ui.example.com"));
}

#[test]
fn admin_token_gets_empty_auth_context() {
    let handler = main_handler();
    let mut req = Request::get("/v3/projects").with_header("x-auth-token", "ADMIN");
    let environ = body(&handler.call(&mut req))["environ"].clone();
    assert_eq!(environ["keel.context"]["is_admin"], json!(true));
    assert_eq!(environ["keel.auth_context"], json!({}));
}

#[test]
fn oversized_body_stops_before_the_app() {
    let handler = main_handler();
    let mut req = Request::post("/v3/users", vec![b' '; 65]);
    let resp = handler.call(&mut req);
    assert_eq!(resp.status, http::StatusCode::PAYLOAD_TOO_LARGE);
    assert!(resp.header("x-openstack-request-id").is_none());
}

#[test]
fn unmounted_path_is_not_found() {
    let resp = main_handler().call(&mut Request::get("/v2.0/tokens"));
    assert_eq!(resp.status, http::StatusCode::NOT_FOUND);
}
