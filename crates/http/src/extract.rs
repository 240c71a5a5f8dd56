//! Extractors that turn malformed input into `422` validation errors.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// JSON body that has been deserialized and passed its field constraints.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value.validate().map_err(constraint_violations)?;
        Ok(Self(value))
    }
}

/// Path parameters; unparsable segments are a validation error, not a 400.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(path_rejection)
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let text = rejection.body_text();
    let detail = match field_hint(&text) {
        Some(field) => json!({"location": "body", "field": field, "error": text}),
        None => json!({"location": "body", "error": text}),
    };
    AppError::validation(vec![detail], "request body is invalid")
}

fn path_rejection(rejection: PathRejection) -> AppError {
    AppError::validation(
        vec![json!({"location": "path", "error": rejection.body_text()})],
        "path parameter is invalid",
    )
}

fn constraint_violations(errors: ValidationErrors) -> AppError {
    let mut details: Vec<_> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, violations)| {
            let field = field.to_string();
            violations.iter().map(move |violation| {
                json!({
                    "location": "body",
                    "field": field,
                    "error": violation.code,
                    "message": violation.message,
                })
            })
        })
        .collect();
    details.sort_by(|a, b| a["field"].as_str().cmp(&b["field"].as_str()));

    AppError::validation(details, "request body failed validation")
}

/// Pull the field name out of serde messages like "missing field `title`".
fn field_hint(text: &str) -> Option<&str> {
    let start = text.find("field `")? + "field `".len();
    let rest = &text[start..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}
