use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};
use showcase_core::prelude::*;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing::warn;

mod api;
mod deploy;

pub mod state;

use state::AppState;

/// The builder for the Showcase Server.
#[derive(Clone, Debug, Default)]
pub struct ShowcaseServer {
    config: ShowcaseServerConfig,
}

impl ShowcaseServer {
    pub fn new(config: ShowcaseServerConfig) -> Self {
        Self { config }
    }
}

#[derive(Clone, Debug)]
pub struct ShowcaseServerConfig {
    /// Shared secret for webhook signatures.
    ///
    /// Without it every webhook is rejected.
    pub webhook_secret: Option<String>,
    /// `POST /deploy/push` only works in [`Environment::Development`].
    /// Defaults to [`Environment::Production`].
    pub environment: Environment,
    /// Pushes to this branch trigger a deploy. Defaults to `master`.
    pub target_branch: String,
    /// Where the deploy process writes its logs. Defaults to `logs`.
    pub log_dir: PathBuf,
    /// Request body limit, mostly relevant for uploads. Defaults to 20 MiB.
    pub max_body_bytes: usize,
}

impl Default for ShowcaseServerConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            environment: Environment::default(),
            target_branch: "master".to_string(),
            log_dir: PathBuf::from("logs"),
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ShowcaseServer {
    pub fn build<C: CatalogStore, A: AssetStore, D: Deployer>(
        self,
        store: C,
        assets: A,
        deployer: D,
    ) -> Router {
        let ShowcaseServerConfig {
            webhook_secret,
            environment,
            target_branch,
            log_dir,
            max_body_bytes,
        } = self.config;

        let webhook_secret = webhook_secret.filter(|s| !s.is_empty());
        if webhook_secret.is_none() {
            warn!("No webhook secret configured, all deploy webhooks will be rejected.");
        }

        let state = AppState {
            catalog: CatalogService::new(store, assets),
            trigger: DeployTrigger::new(deployer, webhook_secret, target_branch, environment),
            logs: LogReader::new(log_dir),
        };

        Router::new()
            .route("/health", get(|| async { "OK" }))
            .route(
                "/products",
                get(api::list_products).post(api::create_product),
            )
            .route(
                "/products/{id}",
                get(api::get_product)
                    .put(api::update_product)
                    .delete(api::delete_product),
            )
            .route("/upload", post(api::upload_asset))
            .route("/deploy/push", post(deploy::manual_push))
            .route(
                "/deploy/webhook",
                get(deploy::webhook_status).post(deploy::webhook),
            )
            .route("/deploy/logs", get(deploy::logs))
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

pub mod prelude {
    pub use crate::state::*;
    pub use crate::{ShowcaseServer, ShowcaseServerConfig};
}
