//! SQL for the `books` and `reviews` tables.
//!
//! Every function runs on a connection borrowed from the caller's
//! transaction; rows are mapped by hand in [`book_from_row`] and
//! [`review_from_row`].

use bookshelf_db::TableDef;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::models::{BookCreate, BookRecord, ReviewCreate, ReviewRecord};

const BOOKS_TABLE: TableDef = TableDef {
    name: "books",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS books (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            title          TEXT    NOT NULL,
            author         TEXT    NOT NULL,
            genre          TEXT,
            year_published INTEGER,
            summary        TEXT
        );
    "#,
};

// Reviews disappear with their book.
const REVIEWS_TABLE: TableDef = TableDef {
    name: "reviews",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id     INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
            user_id     INTEGER NOT NULL,
            review_text TEXT,
            rating      REAL    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS reviews_book_id ON reviews (book_id);
    "#,
};

const BOOK_COLUMNS: &str = "id, title, author, genre, year_published, summary";
const REVIEW_COLUMNS: &str = "id, book_id, user_id, review_text, rating";

/// Tables in creation order; `books` must exist before `reviews` references it.
pub fn tables() -> Vec<TableDef> {
    vec![BOOKS_TABLE, REVIEWS_TABLE]
}

pub fn book_from_row(row: &SqliteRow) -> Result<BookRecord, sqlx::Error> {
    Ok(BookRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        genre: row.try_get("genre")?,
        year_published: row.try_get("year_published")?,
        summary: row.try_get("summary")?,
    })
}

pub fn review_from_row(row: &SqliteRow) -> Result<ReviewRecord, sqlx::Error> {
    Ok(ReviewRecord {
        id: row.try_get("id")?,
        book_id: row.try_get("book_id")?,
        user_id: row.try_get("user_id")?,
        review_text: row.try_get("review_text")?,
        rating: row.try_get("rating")?,
    })
}

pub async fn insert_book(
    conn: &mut SqliteConnection,
    book: &BookCreate,
) -> Result<BookRecord, sqlx::Error> {
    let sql = format!(
        "INSERT INTO books (title, author, genre, year_published, summary)
         VALUES (?, ?, ?, ?, ?)
         RETURNING {BOOK_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.year_published)
        .bind(&book.summary)
        .fetch_one(&mut *conn)
        .await?;
    book_from_row(&row)
}

pub async fn fetch_books(conn: &mut SqliteConnection) -> Result<Vec<BookRecord>, sqlx::Error> {
    let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id");
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(book_from_row).collect()
}

pub async fn fetch_book(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<BookRecord>, sqlx::Error> {
    let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(book_from_row).transpose()
}

pub async fn count_books(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM books")
        .fetch_one(&mut *conn)
        .await?;
    row.try_get("total")
}

/// Overwrite every column; `None` if the book does not exist.
pub async fn replace_book(
    conn: &mut SqliteConnection,
    id: i64,
    book: &BookCreate,
) -> Result<Option<BookRecord>, sqlx::Error> {
    let sql = format!(
        "UPDATE books
         SET title = ?, author = ?, genre = ?, year_published = ?, summary = ?
         WHERE id = ?
         RETURNING {BOOK_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.year_published)
        .bind(&book.summary)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(book_from_row).transpose()
}

/// Returns whether a row was removed.
pub async fn delete_book(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert a review if its book exists; `None` otherwise.
///
/// The existence check and the insert are one statement, so the write lock is
/// requested up front instead of upgraded from a read.
pub async fn insert_review(
    conn: &mut SqliteConnection,
    book_id: i64,
    review: &ReviewCreate,
) -> Result<Option<ReviewRecord>, sqlx::Error> {
    let sql = format!(
        "INSERT INTO reviews (book_id, user_id, review_text, rating)
         SELECT ?, ?, ?, ?
         WHERE EXISTS (SELECT 1 FROM books WHERE id = ?)
         RETURNING {REVIEW_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(book_id)
        .bind(review.user_id)
        .bind(&review.review_text)
        .bind(review.rating)
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(review_from_row).transpose()
}

pub async fn fetch_reviews_for_book(
    conn: &mut SqliteConnection,
    book_id: i64,
) -> Result<Vec<ReviewRecord>, sqlx::Error> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = ? ORDER BY id");
    let rows = sqlx::query(&sql)
        .bind(book_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(review_from_row).collect()
}

pub async fn fetch_all_reviews(
    conn: &mut SqliteConnection,
) -> Result<Vec<ReviewRecord>, sqlx::Error> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY id");
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(review_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::{Database, DatabaseSettings};

    async fn database() -> Database {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        db.ensure_schema(&tables()).await.unwrap();
        db
    }

    fn dune() -> BookCreate {
        BookCreate {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            genre: Some("SciFi".to_string()),
            year_published: Some(1965),
            summary: Some("A desert planet...".to_string()),
        }
    }

    fn review(user_id: i64, rating: f64) -> ReviewCreate {
        ReviewCreate {
            user_id,
            review_text: "Great".to_string(),
            rating,
        }
    }

    #[tokio::test]
    async fn insert_then_fetch_maps_every_column() {
        let db = database().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let inserted = insert_book(&mut conn, &dune()).await.unwrap();
        assert_eq!(inserted.id, 1);

        let fetched = fetch_book(&mut conn, inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.year_published, Some(1965));
        assert!(fetch_book(&mut conn, 2).await.unwrap().is_none());
        assert_eq!(count_books(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_clears_omitted_fields() {
        let db = database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let book = insert_book(&mut conn, &dune()).await.unwrap();

        let bare = BookCreate {
            title: "Dune Messiah".to_string(),
            author: "Herbert".to_string(),
            genre: None,
            year_published: None,
            summary: None,
        };
        let replaced = replace_book(&mut conn, book.id, &bare)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.title, "Dune Messiah");
        assert!(replaced.genre.is_none());
        assert!(replaced.summary.is_none());

        assert!(replace_book(&mut conn, 99, &bare).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_book_cascades_to_reviews() {
        let db = database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let book = insert_book(&mut conn, &dune()).await.unwrap();
        insert_review(&mut conn, book.id, &review(7, 5.0))
            .await
            .unwrap()
            .unwrap();

        assert!(delete_book(&mut conn, book.id).await.unwrap());
        assert!(!delete_book(&mut conn, book.id).await.unwrap());
        assert!(fetch_all_reviews(&mut conn).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn review_for_missing_book_is_not_inserted() {
        let db = database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        assert!(insert_review(&mut conn, 42, &review(7, 3.0))
            .await
            .unwrap()
            .is_none());
        assert!(fetch_all_reviews(&mut conn).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn review_foreign_key_is_enforced() {
        let db = database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO reviews (book_id, user_id, review_text, rating) VALUES (42, 7, 'x', 1.0)",
        )
        .execute(&mut *conn)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reviews_are_scoped_to_their_book() {
        let db = database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let first = insert_book(&mut conn, &dune()).await.unwrap();
        let second = insert_book(&mut conn, &dune()).await.unwrap();

        let a = insert_review(&mut conn, first.id, &review(7, 5.0))
            .await
            .unwrap()
            .unwrap();
        let b = insert_review(&mut conn, first.id, &review(7, 2.5))
            .await
            .unwrap()
            .unwrap();
        insert_review(&mut conn, second.id, &review(8, 1.0))
            .await
            .unwrap()
            .unwrap();

        let reviews = fetch_reviews_for_book(&mut conn, first.id).await.unwrap();
        assert_eq!(reviews, vec![a, b]);
        assert_eq!(reviews[1].rating, 2.5);
        assert_eq!(fetch_books(&mut conn).await.unwrap().len(), 2);
    }
}
