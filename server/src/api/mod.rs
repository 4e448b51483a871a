pub mod classify;
pub mod convert;
pub mod extract;
pub mod health;
mod json;
pub mod scale;

pub use json::JsonBody;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use larder_core::{ErrorCode, ResolveError};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::AppState;

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// One of invalid_argument, unavailable, processing_failed, not_found
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.as_str().to_string(),
        }
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::ProcessingFailed => StatusCode::BAD_GATEWAY,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
    }
}

/// Turn a resolver failure into its caller-facing response. Internal detail
/// stays in the logs.
pub fn error_response(err: &ResolveError) -> Response {
    let code = err.code();
    tracing::warn!(
        code = code.as_str(),
        stage = err.stage().as_str(),
        error = %err,
        "Request failed"
    );
    (
        status_for(code),
        Json(ErrorResponse::new(code, err.public_message())),
    )
        .into_response()
}

/// All /api routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/api/classify", classify::router())
        .nest("/api/convert", convert::router())
        .merge(extract::router())
        .merge(scale::router())
        .merge(health::router())
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "larder", description = "Recipe and ingredient assistant API"),
        components(schemas(ErrorResponse))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        extract::ApiDoc::openapi(),
        scale::ApiDoc::openapi(),
        convert::ApiDoc::openapi(),
        classify::ApiDoc::openapi(),
        health::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}
