//! Operator endpoints under `/api/v1/admin`, each behind the API key.

pub mod handlers;

use crate::config::AppConfig;
use crate::http::server::AppState;
use crate::routing::{RouteNode, RouteProvider};
use crate::security::require_api_key;

use self::handlers::{get_database, get_status};

pub struct AdminRoutes;

impl RouteProvider<AppState> for AdminRoutes {
    fn register_routes(&self, scope: &mut RouteNode<AppState>, config: &AppConfig) {
        let auth = require_api_key::<AppState>(&config.api.key);

        scope.route("/admin", |admin| {
            admin.get("/status", get_status).with([auth.clone()]);
            admin.get("/database", get_database).with([auth.clone()]);
        });
    }
}
