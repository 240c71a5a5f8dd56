//! Book and review operations.
//!
//! Each operation opens one transaction, commits on success, and lets the
//! transaction drop (rolling back) on any error.

use std::collections::HashMap;

use bookshelf_db::Database;
use bookshelf_http::error::AppError;
use serde_json::json;
use thiserror::Error;

use super::models::{
    BookCreate, BookResponse, DeleteResponse, ReviewCreate, ReviewRecord, ReviewResponse,
    SummaryResponse,
};
use super::store;
use crate::summarizer::{SummarizeError, Summarizer};

#[derive(Debug, Error)]
pub enum BooksError {
    #[error("Book {0} not found")]
    BookNotFound(i64),

    #[error("Book {0} has no summary text")]
    MissingSummary(i64),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),
}

impl From<BooksError> for AppError {
    fn from(error: BooksError) -> Self {
        match error {
            BooksError::BookNotFound(_) => AppError::not_found("Book not found"),
            BooksError::MissingSummary(_) | BooksError::Summarize(SummarizeError::EmptyInput) => {
                AppError::validation(
                    vec![json!({"field": "summary", "error": "empty"})],
                    "Book has no summary text to condense",
                )
            }
            BooksError::Summarize(e) => AppError::upstream(e.to_string()),
            BooksError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

pub async fn create_book(db: &Database, payload: &BookCreate) -> Result<BookResponse, BooksError> {
    let mut tx = db.begin().await?;
    let book = store::insert_book(&mut tx, payload).await?;
    tx.commit().await?;

    tracing::info!(book_id = book.id, title = %book.title, "book created");
    Ok(BookResponse::from_parts(book, Vec::new()))
}

pub async fn list_books(db: &Database) -> Result<Vec<BookResponse>, BooksError> {
    let mut tx = db.begin().await?;
    let books = store::fetch_books(&mut tx).await?;
    let reviews = store::fetch_all_reviews(&mut tx).await?;
    tx.commit().await?;

    let mut by_book: HashMap<i64, Vec<ReviewRecord>> = HashMap::new();
    for review in reviews {
        by_book.entry(review.book_id).or_default().push(review);
    }

    Ok(books
        .into_iter()
        .map(|book| {
            let reviews = by_book.remove(&book.id).unwrap_or_default();
            BookResponse::from_parts(book, reviews)
        })
        .collect())
}

pub async fn get_book(db: &Database, id: i64) -> Result<BookResponse, BooksError> {
    let mut tx = db.begin().await?;
    let book = store::fetch_book(&mut tx, id)
        .await?
        .ok_or(BooksError::BookNotFound(id))?;
    let reviews = store::fetch_reviews_for_book(&mut tx, id).await?;
    tx.commit().await?;

    Ok(BookResponse::from_parts(book, reviews))
}

/// Replace every field of an existing book.
pub async fn update_book(
    db: &Database,
    id: i64,
    payload: &BookCreate,
) -> Result<BookResponse, BooksError> {
    let mut tx = db.begin().await?;
    let book = store::replace_book(&mut tx, id, payload)
        .await?
        .ok_or(BooksError::BookNotFound(id))?;
    let reviews = store::fetch_reviews_for_book(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(book_id = id, "book replaced");
    Ok(BookResponse::from_parts(book, reviews))
}

pub async fn delete_book(db: &Database, id: i64) -> Result<DeleteResponse, BooksError> {
    let mut tx = db.begin().await?;
    if !store::delete_book(&mut tx, id).await? {
        return Err(BooksError::BookNotFound(id));
    }
    tx.commit().await?;

    tracing::info!(book_id = id, "book deleted");
    Ok(DeleteResponse {
        message: "Book deleted successfully".to_string(),
    })
}

pub async fn create_review(
    db: &Database,
    book_id: i64,
    payload: &ReviewCreate,
) -> Result<ReviewResponse, BooksError> {
    let mut tx = db.begin().await?;
    let review = store::insert_review(&mut tx, book_id, payload)
        .await?
        .ok_or(BooksError::BookNotFound(book_id))?;
    tx.commit().await?;

    tracing::info!(
        book_id,
        review_id = review.id,
        user_id = review.user_id,
        "review created"
    );
    Ok(review.into())
}

/// Reviews for `book_id`; an unknown book simply has none.
pub async fn list_reviews(db: &Database, book_id: i64) -> Result<Vec<ReviewResponse>, BooksError> {
    let mut tx = db.begin().await?;
    let reviews = store::fetch_reviews_for_book(&mut tx, book_id).await?;
    tx.commit().await?;

    Ok(reviews.into_iter().map(ReviewResponse::from).collect())
}

/// Condense the book's stored summary through the external model.
///
/// The connection is released before the model is called.
pub async fn summarize_book(
    db: &Database,
    summarizer: &dyn Summarizer,
    id: i64,
) -> Result<SummaryResponse, BooksError> {
    let book = {
        let mut tx = db.begin().await?;
        let book = store::fetch_book(&mut tx, id)
            .await?
            .ok_or(BooksError::BookNotFound(id))?;
        tx.commit().await?;
        book
    };

    let text = book
        .summary
        .filter(|text| !text.trim().is_empty())
        .ok_or(BooksError::MissingSummary(id))?;

    let book_summary = summarizer.summarize(&text).await?;
    tracing::info!(book_id = id, summary_chars = book_summary.len(), "summary generated");

    Ok(SummaryResponse {
        book_id: id,
        book_summary,
    })
}
