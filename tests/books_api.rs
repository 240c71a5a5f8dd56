use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use bookshelf_app::books::BooksModule;
use bookshelf_app::summarizer::{SummarizeError, Summarizer};
use bookshelf_db::{Database, DatabaseSettings};
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Keeps the first sentence and counts how often it was asked.
#[derive(Default)]
struct FirstSentence {
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FirstSentence {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sentence = text.split('.').next().unwrap_or(text);
        Ok(format!("{}.", sentence.trim()))
    }
}

/// Stands in for a model endpoint that is down.
struct Unavailable;

#[async_trait]
impl Summarizer for Unavailable {
    async fn summarize(&self, _text: &str) -> Result<String, SummarizeError> {
        Err(SummarizeError::Status {
            status: 503,
            body: "model is loading".to_string(),
        })
    }
}

async fn app_router(db_settings: DatabaseSettings, summarizer: Arc<dyn Summarizer>) -> Router {
    let settings = Settings::default();
    let db = Database::connect(&db_settings).await.unwrap();

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(BooksModule::new(summarizer)));

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    bookshelf_app::prepare(&registry, &ctx).await.unwrap();

    bookshelf_http::build_router(&registry, &settings, &db)
}

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

struct TestApp {
    router: Router,
    summarizer: Arc<FirstSentence>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_database(DatabaseSettings::in_memory()).await
    }

    async fn with_database(db_settings: DatabaseSettings) -> Self {
        let summarizer = Arc::new(FirstSentence::default());
        Self {
            router: app_router(db_settings, summarizer.clone()).await,
            summarizer,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(self.router.clone(), method, uri, body).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }
}

fn dune() -> Value {
    json!({
        "title": "Dune",
        "author": "Herbert",
        "genre": "SciFi",
        "year_published": 1965,
        "summary": "A desert planet. A noble family. A prophecy."
    })
}

#[tokio::test]
async fn dune_scenario() {
    let app = TestApp::new().await;

    let (status, created) = app.post("/books", dune()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);
    assert_eq!(created["title"], "Dune");
    assert_eq!(created["author"], "Herbert");
    assert_eq!(created["genre"], "SciFi");
    assert_eq!(created["year_published"], 1965);
    assert_eq!(created["reviews"], json!([]));

    let (status, fetched) = app.get("/books/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, review) = app
        .post(
            "/books/1/reviews",
            json!({"user_id": 7, "review_text": "Great", "rating": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(review["book_id"], 1);
    assert_eq!(review["user_id"], 7);
    assert_eq!(review["review_text"], "Great");
    assert_eq!(review["rating"].as_f64(), Some(5.0));
}

#[tokio::test]
async fn created_books_get_distinct_ids() {
    let app = TestApp::new().await;

    let (_, first) = app.post("/books", dune()).await;
    let (_, second) = app
        .post("/books", json!({"title": "Emma", "author": "Austen"}))
        .await;
    assert_ne!(first["id"], second["id"]);
    assert!(second["genre"].is_null());
    assert!(second["year_published"].is_null());
    assert!(second["summary"].is_null());

    let (status, books) = app.get("/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_payloads_are_unprocessable() {
    let app = TestApp::new().await;

    for payload in [
        json!({"title": "Dune"}),
        json!({"title": "Dune", "author": "Herbert", "year_published": "nineteen"}),
        json!({"title": null, "author": "Herbert"}),
    ] {
        let (status, body) = app.post("/books", payload.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{payload}");
        assert_eq!(body["error"]["code"], "validation_error");
    }

    let (_, books) = app.get("/books").await;
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn empty_strings_are_valid_title_and_author() {
    let app = TestApp::new().await;

    let (status, created) = app.post("/books", json!({"title": "", "author": "  "})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["title"], "");
    assert_eq!(created["author"], "  ");

    let (_, fetched) = app.get(&format!("/books/{}", created["id"])).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn invalid_replacement_leaves_the_book_untouched() {
    let app = TestApp::new().await;
    let (_, created) = app.post("/books", dune()).await;

    for payload in [
        json!({"title": "Dune Messiah"}),
        json!({"title": "Dune Messiah", "author": "Herbert", "year_published": "soon"}),
    ] {
        let (status, body) = app.put("/books/1", payload.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{payload}");
        assert_eq!(body["error"]["code"], "validation_error");
    }

    let (_, fetched) = app.get("/books/1").await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn missing_book_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/books/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "Book not found");
}

#[tokio::test]
async fn non_numeric_id_is_unprocessable() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/books/dune").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_replaces_every_field() {
    let app = TestApp::new().await;

    let (status, _) = app
        .put("/books/1", json!({"title": "Dune", "author": "Herbert"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post("/books", dune()).await;
    app.post(
        "/books/1/reviews",
        json!({"user_id": 1, "review_text": "Sandy", "rating": 4.5}),
    )
    .await;

    let (status, updated) = app
        .put(
            "/books/1",
            json!({"title": "Dune Messiah", "author": "Frank Herbert"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], 1);
    assert_eq!(updated["title"], "Dune Messiah");
    assert_eq!(updated["author"], "Frank Herbert");
    assert!(updated["genre"].is_null());
    assert!(updated["year_published"].is_null());
    assert!(updated["summary"].is_null());
    assert_eq!(updated["reviews"].as_array().unwrap().len(), 1);

    let (_, fetched) = app.get("/books/1").await;
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn delete_succeeds_once_and_takes_reviews_along() {
    let app = TestApp::new().await;
    app.post("/books", dune()).await;
    app.post(
        "/books/1/reviews",
        json!({"user_id": 7, "review_text": "Great", "rating": 5}),
    )
    .await;

    let (status, body) = app.delete("/books/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book deleted successfully");

    let (status, _) = app.delete("/books/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/books/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, reviews) = app.get("/books/1/reviews").await;
    assert_eq!(reviews, json!([]));
}

#[tokio::test]
async fn review_for_missing_book_is_not_created() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/books/5/reviews",
            json!({"user_id": 7, "review_text": "Great", "rating": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, reviews) = app.get("/books/5/reviews").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews, json!([]));
}

#[tokio::test]
async fn review_payload_requires_every_field() {
    let app = TestApp::new().await;
    app.post("/books", dune()).await;

    let (status, body) = app
        .post("/books/1/reviews", json!({"user_id": 7, "rating": 5}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "review_text");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reviews_on_a_file_database_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::with_database(DatabaseSettings {
        url: format!("sqlite://{}", dir.path().join("bookshelf.db").display()),
        ..DatabaseSettings::default()
    })
    .await;
    app.post("/books", dune()).await;

    let handles: Vec<_> = (0..64)
        .map(|user_id| {
            let router = app.router.clone();
            tokio::spawn(async move {
                let review = json!({"user_id": user_id, "review_text": "Great", "rating": 4});
                send(router, Method::POST, "/books/1/reviews", Some(review)).await
            })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, reviews) = app.get("/books/1/reviews").await;
    assert_eq!(reviews.as_array().unwrap().len(), 64);
}

#[tokio::test]
async fn two_reviews_are_both_listed() {
    let app = TestApp::new().await;
    app.post("/books", dune()).await;

    let (_, first) = app
        .post(
            "/books/1/reviews",
            json!({"user_id": 7, "review_text": "Great", "rating": 5}),
        )
        .await;
    let (_, second) = app
        .post(
            "/books/1/reviews",
            json!({"user_id": 7, "review_text": "Still great", "rating": 4.5}),
        )
        .await;
    assert_ne!(first["id"], second["id"]);

    let (status, reviews) = app.get("/books/1/reviews").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews, json!([first, second]));

    let (_, book) = app.get("/books/1").await;
    assert_eq!(book["reviews"], reviews);
}

#[tokio::test]
async fn summary_condenses_stored_text() {
    let app = TestApp::new().await;
    app.post("/books", dune()).await;

    let (status, body) = app.get("/books/1/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book_id"], 1);
    assert_eq!(body["book_summary"], "A desert planet.");
    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn summary_of_missing_book_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/books/3/summary").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn summary_without_text_is_rejected_before_the_model() {
    let app = TestApp::new().await;
    app.post("/books", json!({"title": "Emma", "author": "Austen", "summary": ""}))
        .await;

    let (status, body) = app.get("/books/1/summary").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "summary");
    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_model_is_a_bad_gateway() {
    let router = app_router(DatabaseSettings::in_memory(), Arc::new(Unavailable)).await;
    send(router.clone(), Method::POST, "/books", Some(dune())).await;

    let (status, body) = send(router, Method::GET, "/books/1/summary", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn openapi_documents_book_routes() {
    let app = TestApp::new().await;
    let (status, spec) = app.get("/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/books"]["post"].is_object());
    assert!(spec["paths"]["/books/{id}/summary"]["get"].is_object());
    assert!(spec["components"]["schemas"]["BookCreate"].is_object());
}
