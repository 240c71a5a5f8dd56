pub mod models;
pub mod openapi;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use bookshelf_db::TableDef;
use bookshelf_kernel::{settings::Settings, InitCtx, Module};

use crate::summarizer::{HttpSummarizer, Summarizer};

/// Books and reviews, plus generated summaries
pub struct BooksModule {
    summarizer: Arc<dyn Summarizer>,
}

impl BooksModule {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            summarizer = %ctx.settings.summarizer.endpoint,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(routes::BooksState {
            db: ctx.db.clone(),
            summarizer: self.summarizer.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi::document())
    }

    fn tables(&self) -> Vec<TableDef> {
        store::tables()
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let mut conn = ctx
            .db
            .pool()
            .acquire()
            .await
            .context("failed to acquire connection")?;
        let books = store::count_books(&mut conn)
            .await
            .context("failed to count books")?;

        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module talking to the configured summarization endpoint
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    let summarizer = HttpSummarizer::new(&settings.summarizer)?;
    Ok(Arc::new(BooksModule::new(Arc::new(summarizer))))
}
