//! OpenAPI fragment for the books module; paths are relative to the mount point.

use serde_json::{json, Value};

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn list_of(name: &str) -> Value {
    json!({ "type": "array", "items": schema_ref(name) })
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": json_content(schema_ref("ErrorResponse"))
    })
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "Book identifier",
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn request_body(name: &str) -> Value {
    json!({ "required": true, "content": json_content(schema_ref(name)) })
}

fn ok(description: &str, schema: Value) -> Value {
    json!({ "description": description, "content": json_content(schema) })
}

pub fn document() -> Value {
    json!({
        "paths": {
            "/": collection_path(),
            "/{id}": item_path(),
            "/{id}/reviews": reviews_path(),
            "/{id}/summary": summary_path()
        },
        "components": {
            "schemas": schemas()
        }
    })
}

fn collection_path() -> Value {
    json!({
        "get": {
            "summary": "List books with their reviews",
            "tags": ["Books"],
            "responses": {
                "200": ok("All books", list_of("Book")),
                "500": error_response("Internal server error")
            }
        },
        "post": {
            "summary": "Create a book",
            "tags": ["Books"],
            "requestBody": request_body("BookCreate"),
            "responses": {
                "200": ok("Created book", schema_ref("Book")),
                "422": error_response("Validation error")
            }
        }
    })
}

fn item_path() -> Value {
    json!({
        "get": {
            "summary": "Get a book",
            "tags": ["Books"],
            "parameters": [id_parameter()],
            "responses": {
                "200": ok("The book", schema_ref("Book")),
                "404": error_response("Book not found")
            }
        },
        "put": {
            "summary": "Replace every field of a book",
            "tags": ["Books"],
            "parameters": [id_parameter()],
            "requestBody": request_body("BookCreate"),
            "responses": {
                "200": ok("Updated book", schema_ref("Book")),
                "404": error_response("Book not found"),
                "422": error_response("Validation error")
            }
        },
        "delete": {
            "summary": "Delete a book and its reviews",
            "tags": ["Books"],
            "parameters": [id_parameter()],
            "responses": {
                "200": ok("Confirmation", schema_ref("DeleteConfirmation")),
                "404": error_response("Book not found")
            }
        }
    })
}

fn reviews_path() -> Value {
    json!({
        "get": {
            "summary": "List reviews for a book",
            "tags": ["Reviews"],
            "parameters": [id_parameter()],
            "responses": {
                "200": ok("Reviews", list_of("Review"))
            }
        },
        "post": {
            "summary": "Review a book",
            "tags": ["Reviews"],
            "parameters": [id_parameter()],
            "requestBody": request_body("ReviewCreate"),
            "responses": {
                "200": ok("Created review", schema_ref("Review")),
                "404": error_response("Book not found"),
                "422": error_response("Validation error")
            }
        }
    })
}

fn summary_path() -> Value {
    json!({
        "get": {
            "summary": "Generate a short summary of the book's summary text",
            "tags": ["Books"],
            "parameters": [id_parameter()],
            "responses": {
                "200": ok("Generated summary", schema_ref("BookSummary")),
                "404": error_response("Book not found"),
                "422": error_response("Book has no summary text"),
                "502": error_response("Summarization model failed")
            }
        }
    })
}

fn schemas() -> Value {
    let int64 = json!({ "type": "integer", "format": "int64" });
    let nullable_text = json!({ "type": ["string", "null"] });
    let nullable_year = json!({ "type": ["integer", "null"], "format": "int64" });

    json!({
        "BookCreate": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "genre": nullable_text,
                "year_published": nullable_year,
                "summary": nullable_text
            },
            "required": ["title", "author"]
        },
        "Book": {
            "type": "object",
            "properties": {
                "id": int64,
                "title": { "type": "string" },
                "author": { "type": "string" },
                "genre": nullable_text,
                "year_published": nullable_year,
                "summary": nullable_text,
                "reviews": list_of("Review")
            },
            "required": ["id", "title", "author", "reviews"]
        },
        "ReviewCreate": {
            "type": "object",
            "properties": {
                "user_id": int64,
                "review_text": { "type": "string" },
                "rating": { "type": "number", "format": "double" }
            },
            "required": ["user_id", "review_text", "rating"]
        },
        "Review": {
            "type": "object",
            "properties": {
                "id": int64,
                "book_id": int64,
                "user_id": int64,
                "review_text": nullable_text,
                "rating": { "type": "number", "format": "double" }
            },
            "required": ["id", "book_id", "user_id", "rating"]
        },
        "BookSummary": {
            "type": "object",
            "properties": {
                "book_id": int64,
                "book_summary": { "type": "string" }
            },
            "required": ["book_id", "book_summary"]
        },
        "DeleteConfirmation": {
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"]
        }
    })
}
