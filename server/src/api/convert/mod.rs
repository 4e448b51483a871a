pub mod recipe;
pub mod unit;

use crate::AppState;
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/convert endpoints (mounted at /api/convert)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(unit::convert_unit))
        .route("/recipe", post(recipe::convert_recipe))
}

#[derive(OpenApi)]
#[openapi(
    paths(unit::convert_unit, recipe::convert_recipe),
    components(schemas(
        unit::ConvertUnitRequest,
        unit::ConvertUnitResponse,
        recipe::ConvertRecipeBody,
        recipe::ConvertRecipeResponse,
        recipe::ConvertedLineBody,
    ))
)]
pub struct ApiDoc;
