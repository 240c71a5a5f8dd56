//! Router builder for the bookshelf HTTP server

use axum::{extract::Request, http::HeaderValue, routing::get, Router};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{Timestamp, Uuid};

use bookshelf_kernel::ModuleRegistry;

/// Builder for constructing the main HTTP router.
///
/// Middlewares are recorded and only applied in [`RouterBuilder::build`], so
/// they wrap every route regardless of call order.
pub struct RouterBuilder {
    router: Router,
    api_prefix: String,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            api_prefix: String::new(),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
        }
    }

    /// Prefix placed in front of every module mount point
    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Where a module's routes live, e.g. `/books` or `/api/books`
    pub fn mount_path(&self, module_name: &str) -> String {
        format!("{}/{}", self.api_prefix, module_name)
    }

    /// Mount a module's router under `{api_prefix}/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        let path = self.mount_path(module_name);
        self.router = self.router.nest(&path, module_router);
        self
    }

    /// Trace every request and response
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Allow cross-origin calls from anywhere
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Tag requests with an `x-request-id` and echo it back
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Abort requests that run longer than `timeout_ms`
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Add OpenAPI documentation by collecting fragments from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = self.merged_openapi(registry);

        // Fall back to a bare document if a fragment is not valid for utoipa
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "merged OpenAPI document rejected by swagger ui");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Bookshelf API")
                            .version(env!("CARGO_PKG_VERSION"))
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Raw merged document for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    fn merged_openapi(&self, registry: &ModuleRegistry) -> serde_json::Value {
        let mut openapi_spec = serde_json::json!({
            "openapi": "3.1.0",
            "info": {
                "title": "Bookshelf API",
                "version": env!("CARGO_PKG_VERSION"),
                "description": "Books, reviews and generated summaries"
            },
            "paths": {},
            "components": {
                "schemas": {}
            }
        });

        openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
            "type": "object",
            "properties": {
                "error": {
                    "type": "object",
                    "properties": {
                        "code": { "type": "string" },
                        "message": { "type": "string" },
                        "details": {
                            "type": "array",
                            "items": { "type": "object" }
                        },
                        "trace_id": { "type": "string" },
                        "timestamp": { "type": "string" }
                    },
                    "required": ["code", "message", "details", "trace_id", "timestamp"]
                }
            },
            "required": ["error"]
        });

        for (path, summary) in [("/healthz", "Liveness probe"), ("/readyz", "Readiness probe")] {
            openapi_spec["paths"][path] = serde_json::json!({
                "get": {
                    "summary": summary,
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            });
        }

        for module in registry.modules() {
            let Some(module_spec) = module.openapi() else {
                continue;
            };
            let mount = self.mount_path(module.name());

            if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
                for (path, path_item) in paths {
                    // "/" inside a module is the mount point itself
                    let prefixed_path = if path == "/" {
                        mount.clone()
                    } else {
                        format!("{}{}", mount, path)
                    };
                    openapi_spec["paths"][prefixed_path] = path_item.clone();
                }
            }

            if let Some(schemas) = module_spec
                .get("components")
                .and_then(|c| c.get("schemas"))
                .and_then(|s| s.as_object())
            {
                for (schema_name, schema_def) in schemas {
                    openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
                }
            }
        }

        openapi_spec
    }

    /// Build the final router, wrapping it in the requested middlewares
    pub fn build(self) -> Router {
        let mut router = self.router;

        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }

        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }

        // Outermost, so the id is present before the trace span opens
        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-ordered request ids
#[derive(Clone)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}
