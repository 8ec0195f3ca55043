//! Feature-module capability.

use crate::config::AppConfig;
use crate::routing::tree::RouteNode;

/// A feature module that contributes routes.
///
/// `register_routes` is called once at startup with the versioned API scope.
/// Implementations declare endpoints and nested groups under `scope` and must
/// not hold on to it afterwards.
pub trait RouteProvider<S> {
    fn register_routes(&self, scope: &mut RouteNode<S>, config: &AppConfig);
}

/// The set of feature modules the server is built from.
pub struct RoutingContext<S> {
    pub providers: Vec<Box<dyn RouteProvider<S>>>,
}

impl<S> RoutingContext<S> {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl RouteProvider<S> + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl<S> Default for RoutingContext<S> {
    fn default() -> Self {
        Self::new()
    }
}
