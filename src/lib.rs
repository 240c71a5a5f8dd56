//! Bookshelf application library
//!
//! Wires the books module into the kernel, owns the process lifecycle and
//! exposes the summarization adapter.

pub mod modules;
pub mod summarizer;

use anyhow::Context;
use bookshelf_db::{Database, TableDef};
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// Build the registry with every project module
pub fn registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings).context("failed to register modules")?;
    Ok(registry)
}

/// Create the tables every registered module owns
pub async fn ensure_schema(registry: &ModuleRegistry, db: &Database) -> anyhow::Result<usize> {
    let tables: Vec<TableDef> = registry
        .collect_tables()
        .into_iter()
        .map(|(module, table)| {
            tracing::debug!(module, table = table.name, "collected table");
            table
        })
        .collect();

    db.ensure_schema(&tables).await?;
    Ok(tables.len())
}

/// Init modules, create the schema, then start modules
pub async fn prepare(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
    registry.init_modules(ctx).await?;
    ensure_schema(registry, ctx.db).await?;
    registry.start_modules(ctx).await?;
    Ok(())
}

/// Run the HTTP service until a shutdown signal arrives
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let db = Database::connect(&settings.database)
        .await
        .context("failed to open database")?;
    let registry = registry(&settings)?;

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    prepare(&registry, &ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, &db, shutdown_signal()).await;

    // Tear down even when serving failed
    let stopped = registry.stop_modules().await;
    db.close().await;

    served?;
    stopped?;
    tracing::info!("bookshelf shut down cleanly");
    Ok(())
}

/// Create the schema without serving; returns the number of tables ensured
pub async fn init_db(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database)
        .await
        .context("failed to open database")?;
    let registry = registry(settings)?;

    let result = ensure_schema(&registry, &db).await;
    db.close().await;
    result
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
