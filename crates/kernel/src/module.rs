use async_trait::async_trait;
use axum::Router;
use bookshelf_db::{Database, TableDef};

/// Context provided to modules during initialization and route construction
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub db: &'a Database,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup before the schema is ensured
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `{api_prefix}/{module_name}`
    fn routes(&self, _ctx: &InitCtx<'_>) -> Router {
        Router::new()
    }

    /// Return OpenAPI fragment for this module as JSON
    /// Paths are relative to the module mount point
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Tables this module owns, created at startup when missing
    /// Executed in the order returned
    fn tables(&self) -> Vec<TableDef> {
        vec![]
    }

    /// Called after the schema is in place
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
