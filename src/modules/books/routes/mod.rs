use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use bookshelf_db::Database;
use bookshelf_http::error::AppError;
use bookshelf_http::extract::{ApiPath, ValidJson};

use super::models::{
    BookCreate, BookResponse, DeleteResponse, ReviewCreate, ReviewResponse, SummaryResponse,
};
use super::service;
use crate::summarizer::Summarizer;

/// Shared handles for the books handlers
#[derive(Clone)]
pub struct BooksState {
    pub db: Database,
    pub summarizer: Arc<dyn Summarizer>,
}

/// Routes relative to the module mount point (`/books` by default)
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .route("/{id}/reviews", get(list_reviews).post(create_review))
        .route("/{id}/summary", get(book_summary))
        .with_state(state)
}

async fn create_book(
    State(state): State<BooksState>,
    ValidJson(payload): ValidJson<BookCreate>,
) -> Result<Json<BookResponse>, AppError> {
    Ok(Json(service::create_book(&state.db, &payload).await?))
}

async fn list_books(State(state): State<BooksState>) -> Result<Json<Vec<BookResponse>>, AppError> {
    Ok(Json(service::list_books(&state.db).await?))
}

async fn get_book(
    State(state): State<BooksState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<BookResponse>, AppError> {
    Ok(Json(service::get_book(&state.db, id).await?))
}

async fn update_book(
    State(state): State<BooksState>,
    ApiPath(id): ApiPath<i64>,
    ValidJson(payload): ValidJson<BookCreate>,
) -> Result<Json<BookResponse>, AppError> {
    Ok(Json(service::update_book(&state.db, id, &payload).await?))
}

async fn delete_book(
    State(state): State<BooksState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    Ok(Json(service::delete_book(&state.db, id).await?))
}

async fn create_review(
    State(state): State<BooksState>,
    ApiPath(id): ApiPath<i64>,
    ValidJson(payload): ValidJson<ReviewCreate>,
) -> Result<Json<ReviewResponse>, AppError> {
    Ok(Json(service::create_review(&state.db, id, &payload).await?))
}

async fn list_reviews(
    State(state): State<BooksState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    Ok(Json(service::list_reviews(&state.db, id).await?))
}

async fn book_summary(
    State(state): State<BooksState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SummaryResponse>, AppError> {
    Ok(Json(
        service::summarize_book(&state.db, state.summarizer.as_ref(), id).await?,
    ))
}
