pub mod archive;
pub mod image;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/classify endpoints (mounted at /api/classify)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(image::classify_image))
        .route("/recipes", get(archive::list_archived_recipes))
}

#[derive(OpenApi)]
#[openapi(
    paths(image::classify_image, archive::list_archived_recipes),
    components(schemas(
        image::ClassifyImageRequest,
        image::ClassifyImageResponse,
        archive::ArchivedRecipesResponse,
        archive::ArchivedRecipeItem,
    ))
)]
pub struct ApiDoc;
