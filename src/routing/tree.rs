//! Declarative route tree.
//!
//! # Responsibilities
//! - Hold route declarations made by feature modules at startup
//! - Keep sibling insertion order (it is the registration order)
//! - Carry per-node interceptors until materialization
//!
//! # Design Decisions
//! - Append-only: no removal, no mutation after materialization
//! - Grouping and endpoint nodes are distinct variants, so a handler
//!   without a method (or the reverse) cannot be built
//! - Handlers are erased into `MethodRouter` when declared

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::response::IntoResponse;
use axum::routing::{self, MethodRouter, Route};
use tower::{Layer, Service};

/// HTTP methods a route can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Erase `handler` into a method router answering only this method.
    fn bind<H, T, S>(self, handler: H) -> MethodRouter<S>
    where
        H: Handler<T, S>,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        match self {
            Method::Get => routing::get(handler),
            Method::Post => routing::post(handler),
            Method::Put => routing::put(handler),
            Method::Delete => routing::delete(handler),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type ApplyFn<S> = dyn Fn(MethodRouter<S>) -> MethodRouter<S> + Send + Sync;

/// A request interceptor scoped to a single route.
///
/// Wraps any tower layer whose service never fails, which includes
/// everything built with `axum::middleware::from_fn` and
/// `axum::middleware::from_fn_with_state`.
pub struct Interceptor<S> {
    apply: Arc<ApplyFn<S>>,
}

impl<S> Interceptor<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new<L>(layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self {
            apply: Arc::new(move |router: MethodRouter<S>| router.layer(layer.clone())),
        }
    }

    pub(crate) fn wrap(&self, router: MethodRouter<S>) -> MethodRouter<S> {
        (self.apply)(router)
    }
}

impl<S> Clone for Interceptor<S> {
    fn clone(&self) -> Self {
        Self {
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<S> fmt::Debug for Interceptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor").finish_non_exhaustive()
    }
}

/// What a node contributes to the dispatcher.
pub enum NodeKind<S> {
    /// Path prefix shared by the children; no handler of its own.
    Group,
    /// A concrete route.
    Endpoint {
        method: Method,
        handler: MethodRouter<S>,
    },
}

/// A node in the route declaration tree.
pub struct RouteNode<S> {
    segment: String,
    kind: NodeKind<S>,
    middlewares: Vec<Interceptor<S>>,
    children: Vec<RouteNode<S>>,
}

impl<S> RouteNode<S> {
    fn group(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: NodeKind::Group,
            middlewares: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Path segment relative to the parent.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn kind(&self) -> &NodeKind<S> {
        &self.kind
    }

    /// Declared method, `None` for grouping nodes.
    pub fn method(&self) -> Option<Method> {
        match self.kind {
            NodeKind::Group => None,
            NodeKind::Endpoint { method, .. } => Some(method),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }

    pub fn middlewares(&self) -> &[Interceptor<S>] {
        &self.middlewares
    }

    pub fn children(&self) -> &[RouteNode<S>] {
        &self.children
    }

    /// Append a child and return it.
    pub(crate) fn new_node(&mut self, segment: impl Into<String>, kind: NodeKind<S>) -> &mut RouteNode<S> {
        self.children.push(RouteNode {
            segment: segment.into(),
            kind,
            middlewares: Vec::new(),
            children: Vec::new(),
        });
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Open a grouping scope under `segment` and declare its children in `configure`.
    pub fn route<F>(&mut self, segment: impl Into<String>, configure: F)
    where
        F: FnOnce(&mut RouteNode<S>),
    {
        configure(self.new_node(segment, NodeKind::Group));
    }

    /// Attach interceptors to this node. The first one attached runs outermost.
    pub fn with<I>(&mut self, interceptors: I) -> &mut Self
    where
        I: IntoIterator<Item = Interceptor<S>>,
    {
        self.middlewares.extend(interceptors);
        self
    }
}

impl<S> RouteNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn endpoint<H, T>(&mut self, method: Method, segment: impl Into<String>, handler: H) -> &mut RouteNode<S>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let handler = method.bind(handler);
        self.new_node(segment, NodeKind::Endpoint { method, handler })
    }

    pub fn get<H, T>(&mut self, segment: impl Into<String>, handler: H) -> &mut RouteNode<S>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.endpoint(Method::Get, segment, handler)
    }

    pub fn post<H, T>(&mut self, segment: impl Into<String>, handler: H) -> &mut RouteNode<S>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.endpoint(Method::Post, segment, handler)
    }

    pub fn put<H, T>(&mut self, segment: impl Into<String>, handler: H) -> &mut RouteNode<S>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.endpoint(Method::Put, segment, handler)
    }

    pub fn delete<H, T>(&mut self, segment: impl Into<String>, handler: H) -> &mut RouteNode<S>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.endpoint(Method::Delete, segment, handler)
    }

    /// Handler wrapped with this node's own interceptors, first-attached outermost.
    pub(crate) fn wrapped_handler(&self) -> Option<MethodRouter<S>> {
        match &self.kind {
            NodeKind::Group => None,
            NodeKind::Endpoint { handler, .. } => Some(
                self.middlewares
                    .iter()
                    .rev()
                    .fold(handler.clone(), |router, interceptor| interceptor.wrap(router)),
            ),
        }
    }
}

/// Owner of the synthetic root node.
pub struct RouteTree<S> {
    root: RouteNode<S>,
}

impl<S> RouteTree<S> {
    pub fn new() -> Self {
        Self {
            root: RouteNode::group(""),
        }
    }

    pub fn root(&self) -> &RouteNode<S> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RouteNode<S> {
        &mut self.root
    }
}

impl<S> Default for RouteTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> &'static str {
        "ok"
    }

    #[test]
    fn test_root_is_empty_group() {
        let tree: RouteTree<()> = RouteTree::new();
        assert!(tree.root().is_group());
        assert_eq!(tree.root().segment(), "");
        assert!(tree.root().children().is_empty());
        assert_eq!(tree.root().method(), None);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/users", |users| {
            users.get("", ok);
            users.post("", ok);
            users.put("/{id}", ok);
            users.delete("/{id}", ok);
        });

        let users = &tree.root().children()[0];
        assert!(users.is_group());
        assert_eq!(users.segment(), "/users");

        let methods: Vec<_> = users.children().iter().filter_map(|c| c.method()).collect();
        assert_eq!(methods, vec![Method::Get, Method::Post, Method::Put, Method::Delete]);
        assert_eq!(users.children()[2].segment(), "/{id}");
    }

    #[test]
    fn test_with_appends_to_exact_node() {
        let passthrough = Interceptor::<()>::new(tower::layer::util::Identity::new());

        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/a", |a| {
            a.get("/one", ok).with([passthrough.clone()]).with([passthrough.clone()]);
            a.get("/two", ok);
        });

        let a = &tree.root().children()[0];
        assert!(a.middlewares().is_empty());
        assert_eq!(a.children()[0].middlewares().len(), 2);
        assert!(a.children()[1].middlewares().is_empty());
    }

    #[test]
    fn test_group_has_no_handler() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/empty", |_| {});
        let group = &tree.root().children()[0];
        assert!(group.wrapped_handler().is_none());
        assert!(matches!(group.kind(), NodeKind::Group));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }
}
