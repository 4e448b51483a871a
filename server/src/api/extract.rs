use crate::api::{error_response, ErrorResponse, JsonBody};
use crate::AppState;
use axum::routing::post;
use axum::{extract::State, response::IntoResponse, Json, Router};
use larder_core::{ExtractRequest, IngredientLine};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/extract", post(extract_ingredients))
}

#[derive(OpenApi)]
#[openapi(
    paths(extract_ingredients),
    components(schemas(ExtractIngredientsRequest, ExtractIngredientsResponse, ExtractedIngredient))
)]
pub struct ApiDoc;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExtractIngredientsRequest {
    /// Free recipe or ingredient text
    pub text: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExtractedIngredient {
    pub ingredient: String,
    /// "<quantity> <unit>" or "unknown"
    pub measure: String,
}

impl From<IngredientLine> for ExtractedIngredient {
    fn from(line: IngredientLine) -> Self {
        Self {
            ingredient: line.ingredient,
            measure: line.measure,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExtractIngredientsResponse {
    pub ingredients: Vec<ExtractedIngredient>,
}

#[utoipa::path(
    post,
    path = "/api/extract",
    tag = "ingredients",
    request_body = ExtractIngredientsRequest,
    responses(
        (status = 200, description = "Ingredients in source order", body = ExtractIngredientsResponse),
        (status = 400, description = "Missing or empty text", body = ErrorResponse),
        (status = 502, description = "Model output could not be used", body = ErrorResponse),
        (status = 503, description = "Model unavailable", body = ErrorResponse)
    )
)]
pub async fn extract_ingredients(
    State(resolver): State<AppState>,
    JsonBody(request): JsonBody<ExtractIngredientsRequest>,
) -> impl IntoResponse {
    match resolver
        .extract_ingredients(&ExtractRequest { text: request.text })
        .await
    {
        Ok(lines) => Json(ExtractIngredientsResponse {
            ingredients: lines.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}
