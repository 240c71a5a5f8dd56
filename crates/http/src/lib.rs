//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{extract::State, routing::get, Router};

use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod error;
pub mod extract;
pub mod router;

use error::AppError;
use router::RouterBuilder;

/// Serve the registry's modules until `shutdown` resolves
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    settings: &Settings,
    db: &Database,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings, db);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings, db: &Database) -> Router {
    let ctx = InitCtx { settings, db };

    let mut router_builder = RouterBuilder::new()
        .with_api_prefix(&settings.server.api_prefix)
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check).with_state(db.clone()));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under {}",
            router_builder.mount_path(module_name)
        );
        router_builder = router_builder.mount_module(module_name, module.routes(&ctx));
    }

    router_builder.with_openapi(registry).build()
}

/// Liveness: the process is up
async fn health_check() -> &'static str {
    "ok"
}

/// Readiness: the database answers
async fn readiness_check(State(db): State<Database>) -> Result<&'static str, AppError> {
    db.ping()
        .await
        .context("database ping failed")
        .map_err(AppError::Internal)?;
    Ok("ready")
}
