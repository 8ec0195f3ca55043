//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route tree from the registered feature modules
//! - Snapshot the route listing, then materialize onto the dispatcher
//! - Release the tree once the dispatcher holds every route
//!
//! # Design Decisions
//! - Fail fast: any materialization error is fatal
//! - Each stage consumes the previous one, so a discarded tree cannot be
//!   reached again
//! - The health endpoint is always registered, after every provider

use std::io;

use axum::Router;
use thiserror::Error;

use crate::config::AppConfig;
use crate::http::health::health_check;
use crate::observability::metrics;
use crate::routing::{self, MaterializeError, RouteEntry, RouteTree, RoutingContext};

/// Versioned scope every feature module registers under.
pub const API_ROOT: &str = "/api/v1";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route materialization failed: {0}")]
    Routes(#[from] MaterializeError),
}

/// Route tree with every provider's declarations in place.
pub struct BuiltRoutes<S> {
    tree: RouteTree<S>,
}

impl<S> BuiltRoutes<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn build(context: &RoutingContext<S>, config: &AppConfig) -> Self {
        let mut tree = RouteTree::new();
        tree.root_mut().route(API_ROOT, |api| {
            for provider in &context.providers {
                provider.register_routes(api, config);
            }
            api.get("/health", health_check);
        });
        Self { tree }
    }

    pub fn tree(&self) -> &RouteTree<S> {
        &self.tree
    }

    pub fn write_routes<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        routing::write_routes(&self.tree, writer)
    }

    /// Register every declared route on a fresh dispatcher.
    pub fn materialize(self) -> Result<MaterializedRoutes<S>, MaterializeError> {
        let listing = routing::collect_routes(&self.tree);
        let listing_text = routing::format_routes(&self.tree);
        let router = routing::materialize(&self.tree, Router::new())?;
        Ok(MaterializedRoutes {
            tree: self.tree,
            router,
            listing,
            listing_text,
        })
    }
}

/// Dispatcher loaded with every route; the tree is still held.
pub struct MaterializedRoutes<S> {
    tree: RouteTree<S>,
    router: Router<S>,
    listing: Vec<RouteEntry>,
    listing_text: String,
}

impl<S> MaterializedRoutes<S> {
    pub fn listing(&self) -> &[RouteEntry] {
        &self.listing
    }

    pub fn write_routes<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.listing_text.as_bytes())
    }

    /// Drop the tree, keeping only the dispatcher.
    pub fn discard(self) -> Router<S> {
        drop(self.tree);
        self.router
    }
}

/// Build, materialize and discard in one step.
///
/// Returns the dispatcher and the printed route listing.
pub fn build_dispatcher<S>(context: &RoutingContext<S>, config: &AppConfig) -> Result<(Router<S>, String), StartupError>
where
    S: Clone + Send + Sync + 'static,
{
    let materialized = BuiltRoutes::build(context, config).materialize()?;
    let count = materialized.listing().len();
    let listing = materialized.listing_text.clone();

    tracing::info!(routes = count, "Registered routes:\n{}", listing.trim_end());
    metrics::record_routes_registered(count);

    Ok((materialized.discard(), listing))
}
