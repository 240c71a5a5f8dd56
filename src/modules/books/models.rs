use serde::{Deserialize, Serialize};
use validator::Validate;

/// Book row as stored in the `books` table.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year_published: Option<i64>,
    pub summary: Option<String>,
}

/// Review row as stored in the `reviews` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub review_text: Option<String>,
    pub rating: f64,
}

/// Request model for creating or fully replacing a book.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookCreate {
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    pub genre: Option<String>,
    pub year_published: Option<i64>,
    /// Long-form text the summary endpoint condenses
    pub summary: Option<String>,
}

/// Request model for reviewing a book.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewCreate {
    pub user_id: i64,
    pub review_text: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub review_text: Option<String>,
    pub rating: f64,
}

/// A book together with every review written for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year_published: Option<i64>,
    pub summary: Option<String>,
    pub reviews: Vec<ReviewResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub book_id: i64,
    pub book_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl From<ReviewRecord> for ReviewResponse {
    fn from(record: ReviewRecord) -> Self {
        Self {
            id: record.id,
            book_id: record.book_id,
            user_id: record.user_id,
            review_text: record.review_text,
            rating: record.rating,
        }
    }
}

impl BookResponse {
    pub fn from_parts(book: BookRecord, reviews: Vec<ReviewRecord>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            year_published: book.year_published,
            summary: book.summary,
            reviews: reviews.into_iter().map(ReviewResponse::from).collect(),
        }
    }
}
