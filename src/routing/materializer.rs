//! One-pass materialization of the route tree onto a dispatcher.
//!
//! # Algorithm
//! ```text
//! current = base + node.segment
//!   Mount        → new dispatcher scope at `current`, children start from ""
//!   Endpoint     → register (method, current) wrapped in the node's interceptors
//!   PassThrough  → children continue with `current` as their base
//! ```
//!
//! # Design Decisions
//! - The full route set is checked before anything is registered; the
//!   dispatcher aborts on duplicates and malformed paths, so those are
//!   reported here as errors instead
//! - Scope-relative paths are checked as the scope sees them, full paths
//!   go through the same matcher the dispatcher routes with
//! - Interceptors attached to grouping nodes are not applied; only the
//!   endpoint's own interceptors wrap it

use std::collections::HashSet;

use axum::routing::MethodRouter;
use axum::Router;
use matchit::InsertError;
use thiserror::Error;

use crate::routing::printer::{collect_routes, endpoint_path, placement, Placement, RouteEntry};
use crate::routing::tree::{Method, RouteNode, RouteTree};

/// Errors that stop startup before the server accepts traffic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaterializeError {
    #[error("invalid route path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: Method, path: String },

    #[error("route {path} conflicts with {existing}: parameter names differ")]
    ConflictingRoute { path: String, existing: String },
}

/// The HTTP request router routes are materialized onto.
pub trait Dispatcher<S>: Sized {
    /// An empty dispatcher used as a nested scope.
    fn scope() -> Self;

    fn register(self, method: Method, path: &str, endpoint: MethodRouter<S>) -> Self;

    fn mount(self, prefix: &str, scope: Self) -> Self;
}

impl<S> Dispatcher<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn scope() -> Self {
        Router::new()
    }

    fn register(self, _method: Method, path: &str, endpoint: MethodRouter<S>) -> Self {
        self.route(path, endpoint)
    }

    fn mount(self, prefix: &str, scope: Self) -> Self {
        self.nest(prefix, scope)
    }
}

/// Register every route of `tree` on `dispatcher`.
pub fn materialize<S, D>(tree: &RouteTree<S>, dispatcher: D) -> Result<D, MaterializeError>
where
    S: Clone + Send + Sync + 'static,
    D: Dispatcher<S>,
{
    check_node(tree.root(), "")?;
    check_routes(&collect_routes(tree))?;
    register_node(tree.root(), dispatcher, "")
}

fn register_node<S, D>(node: &RouteNode<S>, dispatcher: D, base_path: &str) -> Result<D, MaterializeError>
where
    S: Clone + Send + Sync + 'static,
    D: Dispatcher<S>,
{
    let current_path = format!("{base_path}{}", node.segment());

    match placement(node, &current_path) {
        Placement::Mount => {
            warn_unapplied(node, &current_path);

            let mut scope = D::scope();
            for child in node.children() {
                scope = register_node(child, scope, "")?;
            }
            Ok(dispatcher.mount(&current_path, scope))
        }
        Placement::Endpoint(method) => {
            let path = endpoint_path(&current_path);
            match node.wrapped_handler() {
                Some(endpoint) => Ok(dispatcher.register(method, path, endpoint)),
                None => Ok(dispatcher),
            }
        }
        Placement::PassThrough => {
            warn_unapplied(node, &current_path);

            let mut dispatcher = dispatcher;
            for child in node.children() {
                dispatcher = register_node(child, dispatcher, &current_path)?;
            }
            Ok(dispatcher)
        }
    }
}

fn warn_unapplied<S>(node: &RouteNode<S>, path: &str) {
    if !node.middlewares().is_empty() {
        tracing::warn!(
            path = %path,
            count = node.middlewares().len(),
            "Interceptors on a grouping node are not applied"
        );
    }
}

/// Walk the tree with the registration rules and check every path exactly
/// as the dispatcher will receive it, relative to its scope.
fn check_node<S>(node: &RouteNode<S>, base_path: &str) -> Result<(), MaterializeError> {
    let current_path = format!("{base_path}{}", node.segment());

    match placement(node, &current_path) {
        Placement::Mount => {
            check_mount_prefix(&current_path)?;
            for child in node.children() {
                check_node(child, "")?;
            }
            Ok(())
        }
        Placement::Endpoint(_) => check_route_path(endpoint_path(&current_path)),
        Placement::PassThrough => {
            for child in node.children() {
                check_node(child, &current_path)?;
            }
            Ok(())
        }
    }
}

fn invalid(path: &str, reason: &'static str) -> MaterializeError {
    MaterializeError::InvalidPath {
        path: path.to_owned(),
        reason,
    }
}

fn check_route_path(path: &str) -> Result<(), MaterializeError> {
    if !path.starts_with('/') {
        return Err(invalid(path, "route path must start with '/'"));
    }
    check_segments(path)
}

/// Segments starting with `:` or `*` are the old capture syntax and are refused.
fn check_segments(path: &str) -> Result<(), MaterializeError> {
    for segment in path.split('/') {
        if segment.starts_with(':') {
            return Err(invalid(path, "segments must not start with ':', use '{name}' to capture"));
        }
        if segment.starts_with('*') {
            return Err(invalid(path, "segments must not start with '*', use '{*name}' for a wildcard"));
        }
    }
    Ok(())
}

fn check_mount_prefix(prefix: &str) -> Result<(), MaterializeError> {
    if !prefix.starts_with('/') {
        return Err(invalid(prefix, "scope prefix must start with '/'"));
    }
    if prefix.contains("{*") {
        return Err(invalid(prefix, "scope prefix cannot contain a catch-all parameter"));
    }
    check_segments(prefix)
}

/// Insert every full path into the dispatcher's own path matcher.
///
/// The same path under several methods is one matcher entry; the same
/// method twice on one path is a duplicate.
fn check_routes(entries: &[RouteEntry]) -> Result<(), MaterializeError> {
    let mut matcher = matchit::Router::new();
    let mut inserted: HashSet<&str> = HashSet::new();
    let mut seen: HashSet<(Method, &str)> = HashSet::new();

    for entry in entries {
        check_route_path(&entry.path)?;

        if !seen.insert((entry.method, entry.path.as_str())) {
            return Err(MaterializeError::DuplicateRoute {
                method: entry.method,
                path: entry.path.clone(),
            });
        }
        if !inserted.insert(entry.path.as_str()) {
            continue;
        }

        matcher.insert(entry.path.as_str(), ()).map_err(|e| match e {
            InsertError::Conflict { with } => MaterializeError::ConflictingRoute {
                path: entry.path.clone(),
                existing: with,
            },
            InsertError::InvalidParamSegment => invalid(&entry.path, "only one parameter is allowed per segment"),
            InsertError::InvalidParam => invalid(&entry.path, "parameters need a name and matching braces"),
            InsertError::InvalidCatchAll => invalid(&entry.path, "catch-all parameters must end the path"),
            _ => invalid(&entry.path, "rejected by the path matcher"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::tree::Interceptor;
    use axum::body::Body;
    use axum::extract::{MatchedPath, Request};
    use axum::handler::Handler;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::middleware::{self, Next};
    use axum::response::Response;
    use std::collections::HashSet;
    use tower::ServiceExt;

    /// Records what the materializer registers. Scopes are joined by plain
    /// concatenation; the sample tree never mounts under a trailing `/`.
    #[derive(Default)]
    struct Recorder {
        routes: Vec<(Method, String)>,
        mounts: Vec<String>,
    }

    impl Dispatcher<()> for Recorder {
        fn scope() -> Self {
            Recorder::default()
        }

        fn register(mut self, method: Method, path: &str, _endpoint: MethodRouter<()>) -> Self {
            self.routes.push((method, path.to_owned()));
            self
        }

        fn mount(mut self, prefix: &str, scope: Self) -> Self {
            self.mounts.push(prefix.to_owned());
            self.routes.extend(
                scope
                    .routes
                    .into_iter()
                    .map(|(method, path)| {
                        let full = if path == "/" { prefix.to_owned() } else { format!("{prefix}{path}") };
                        (method, full)
                    }),
            );
            self
        }
    }

    async fn ok() -> &'static str {
        "ok"
    }

    async fn matched(path: MatchedPath) -> String {
        path.as_str().to_owned()
    }

    async fn echo_order(headers: HeaderMap) -> String {
        headers
            .get("x-order")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    }

    fn push_order(req: &mut Request, tag: &str) {
        let order = match req.headers().get("x-order").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing},{tag}"),
            None => tag.to_owned(),
        };
        req.headers_mut()
            .insert("x-order", HeaderValue::from_str(&order).unwrap());
    }

    async fn tag_a(mut req: Request, next: Next) -> Response {
        push_order(&mut req, "a");
        next.run(req).await
    }

    async fn tag_b(mut req: Request, next: Next) -> Response {
        push_order(&mut req, "b");
        next.run(req).await
    }

    async fn deny(_req: Request, _next: Next) -> Response {
        Response::builder()
            .status(StatusCode::FORBIDDEN)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn sample_tree() -> RouteTree<()> {
        sample_tree_with(ok)
    }

    fn sample_tree_with<H, T>(handler: H) -> RouteTree<()>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let mut tree = RouteTree::new();
        tree.root_mut().route("/api/v1", |api| {
            api.route("/users", |users| {
                users.get("", handler.clone());
                users.post("", handler.clone());
                users.get("/{id}", handler.clone());
                users.put("/{id}", handler.clone());
                users.delete("/{id}", handler.clone());
            });
            api.route("", |organizing| {
                organizing.get("/ping", handler.clone());
            });
            api.route("/empty", |_| {});
            api.get("/health", handler.clone());
        });
        tree.root_mut().get("/metrics", handler);
        tree
    }

    #[test]
    fn test_registered_set_matches_printed_set() {
        let tree = sample_tree();
        let recorder = materialize(&tree, Recorder::default()).unwrap();

        let printed: Vec<(Method, String)> = collect_routes(&tree)
            .into_iter()
            .map(|e| (e.method, e.path))
            .collect();
        assert_eq!(recorder.routes, printed);
        assert_eq!(recorder.mounts, vec!["/api/v1".to_string()]);
    }

    #[test]
    fn test_scopes_are_mounted_per_group() {
        let tree = sample_tree();
        let recorder = materialize(&tree, Recorder::default()).unwrap();
        let registered: HashSet<_> = recorder.routes.iter().map(|(m, p)| format!("{m} {p}")).collect();

        assert!(registered.contains("GET /api/v1/users"));
        assert!(registered.contains("DELETE /api/v1/users/{id}"));
        assert!(registered.contains("GET /api/v1/ping"));
        assert!(registered.contains("GET /metrics"));
        assert_eq!(registered.len(), 8);
    }

    #[tokio::test]
    async fn test_axum_dispatcher_serves_every_printed_route() {
        let tree = sample_tree();
        let router: Router = materialize(&tree, Router::new()).unwrap();

        for entry in collect_routes(&tree) {
            let uri = entry.path.replace("{id}", "7");
            let (status, body) = send(&router, entry.method.as_str(), &uri).await;
            assert_eq!(status, StatusCode::OK, "{entry}");
            assert_eq!(body, "ok");
        }
        let (status, _) = send(&router, "GET", "/api/v1/empty").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_axum_serves_only_printed_templates() {
        let tree = sample_tree_with(matched);
        let printed: HashSet<String> = collect_routes(&tree).into_iter().map(|e| e.path).collect();
        let router: Router = materialize(&tree, Router::new()).unwrap();

        for path in &printed {
            let uri = path.replace("{id}", "7");
            let (status, body) = send(&router, "GET", &uri).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(&body, path);
        }

        let candidates = [
            "/", "/api", "/api/v1", "/api/v1/", "/api/v1/users/", "/api/v1/users/7/x", "/api/v1/empty",
            "/api/v1/empty/x", "/api/v1/ping/", "/users", "/ping", "/health", "/metrics/",
        ];
        for method in ["GET", "POST", "PUT", "DELETE"] {
            for uri in candidates {
                let (status, body) = send(&router, method, uri).await;
                if status == StatusCode::OK {
                    assert!(printed.contains(&body), "{method} {uri} matched unlisted {body}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_first_interceptor_runs_outermost() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/t", |t| {
            t.get("/order", echo_order)
                .with([Interceptor::new(middleware::from_fn(tag_a))])
                .with([Interceptor::new(middleware::from_fn(tag_b))]);
        });
        let router: Router = materialize(&tree, Router::new()).unwrap();

        let (status, body) = send(&router, "GET", "/t/order").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a,b");
    }

    #[tokio::test]
    async fn test_interceptor_scoped_to_its_own_route() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/s", |s| {
            s.get("/guarded", ok)
                .with([Interceptor::new(middleware::from_fn(deny))]);
            s.get("/open", ok);
            s.post("/guarded-sibling", ok);
        });
        let router: Router = materialize(&tree, Router::new()).unwrap();

        assert_eq!(send(&router, "GET", "/s/guarded").await.0, StatusCode::FORBIDDEN);
        assert_eq!(send(&router, "GET", "/s/open").await.0, StatusCode::OK);
        assert_eq!(send(&router, "POST", "/s/guarded-sibling").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_grouping_node_interceptors_are_not_inherited() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/g", |g| {
            g.with([Interceptor::new(middleware::from_fn(deny))]);
            g.get("/child", ok);
        });
        let router: Router = materialize(&tree, Router::new()).unwrap();

        assert_eq!(send(&router, "GET", "/g/child").await.0, StatusCode::OK);
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/a", |a| {
            a.get("/b", ok);
        });
        tree.root_mut().get("/a/b", ok);

        let err = materialize(&tree, Router::new()).unwrap_err();
        assert_eq!(
            err,
            MaterializeError::DuplicateRoute {
                method: Method::Get,
                path: "/a/b".into()
            }
        );
    }

    #[test]
    fn test_same_path_different_methods_is_fine() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().get("/x", ok);
        tree.root_mut().post("/x", ok);
        assert!(materialize(&tree, Router::new()).is_ok());
    }

    #[test]
    fn test_conflicting_parameter_names_are_rejected() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().get("/u/{id}", ok);
        tree.root_mut().put("/u/{name}", ok);

        let err = materialize(&tree, Router::new()).unwrap_err();
        assert!(matches!(err, MaterializeError::ConflictingRoute { .. }));
    }

    #[test]
    fn test_relative_path_is_rejected() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().get("relative", ok);

        let err = materialize(&tree, Router::new()).unwrap_err();
        assert!(matches!(err, MaterializeError::InvalidPath { .. }));
    }

    #[test]
    fn test_catch_all_scope_prefix_is_rejected() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/files/{*rest}", |files| {
            files.get("/x", ok);
        });

        let err = materialize(&tree, Router::new()).unwrap_err();
        assert!(matches!(err, MaterializeError::InvalidPath { .. }));
    }

    fn scoped_relative_tree() -> RouteTree<()> {
        let mut tree = RouteTree::new();
        tree.root_mut().route("/a", |a| {
            a.get("b", ok);
        });
        tree
    }

    #[test]
    fn test_scope_relative_path_without_slash_is_rejected() {
        let err = materialize(&scoped_relative_tree(), Router::new()).unwrap_err();
        assert_eq!(
            err,
            MaterializeError::InvalidPath {
                path: "b".into(),
                reason: "route path must start with '/'"
            }
        );
    }

    #[test]
    fn test_legacy_capture_syntax_is_rejected() {
        for path in ["/files/*", "/users/:id", "/files/*rest"] {
            let mut tree: RouteTree<()> = RouteTree::new();
            tree.root_mut().get(path, ok);

            let err = materialize(&tree, Router::new()).unwrap_err();
            assert!(matches!(err, MaterializeError::InvalidPath { .. }), "{path}");
        }

        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/:org", |org| {
            org.get("/x", ok);
        });
        assert!(matches!(
            materialize(&tree, Router::new()),
            Err(MaterializeError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_param_and_catch_all_at_same_position_conflict() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().get("/x/{id}", ok);
        tree.root_mut().post("/x/{*rest}", ok);

        let err = materialize(&tree, Router::new()).unwrap_err();
        assert_eq!(
            err,
            MaterializeError::ConflictingRoute {
                path: "/x/{*rest}".into(),
                existing: "/x/{id}".into()
            }
        );
    }

    #[test]
    fn test_malformed_parameter_is_rejected() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().get("/x/{id", ok);

        let err = materialize(&tree, Router::new()).unwrap_err();
        assert!(matches!(err, MaterializeError::InvalidPath { .. }));
    }
}
