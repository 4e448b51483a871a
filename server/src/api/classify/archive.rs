use crate::api::{status_for, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use larder_core::{ArchivedRecipe, BakedRecipe, ErrorCode};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListArchivedParams {
    /// Owner the recipes were archived under
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArchivedRecipeItem {
    pub id: Uuid,
    pub image_url: String,
    #[schema(value_type = Object)]
    pub recipe: BakedRecipe,
    pub created_at: DateTime<Utc>,
}

impl From<ArchivedRecipe> for ArchivedRecipeItem {
    fn from(entry: ArchivedRecipe) -> Self {
        Self {
            id: entry.id,
            image_url: entry.image_url,
            recipe: entry.recipe,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArchivedRecipesResponse {
    pub recipes: Vec<ArchivedRecipeItem>,
}

fn error(code: ErrorCode, message: &str) -> axum::response::Response {
    (status_for(code), Json(ErrorResponse::new(code, message))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/classify/recipes",
    tag = "classification",
    params(ListArchivedParams),
    responses(
        (status = 200, description = "Archived recipes, newest first", body = ArchivedRecipesResponse),
        (status = 400, description = "Missing owner", body = ErrorResponse),
        (status = 404, description = "Recipe archive disabled", body = ErrorResponse),
        (status = 503, description = "Archive could not be read", body = ErrorResponse)
    )
)]
pub async fn list_archived_recipes(
    State(resolver): State<AppState>,
    Query(params): Query<ListArchivedParams>,
) -> impl IntoResponse {
    let owner = params.owner.trim();
    if owner.is_empty() {
        return error(ErrorCode::InvalidArgument, "owner must not be empty");
    }

    let Some(archive) = resolver.archive() else {
        return error(ErrorCode::NotFound, "Recipe archive is not enabled");
    };

    match archive.list(owner).await {
        Ok(entries) => Json(ArchivedRecipesResponse {
            recipes: entries.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(owner, error = %e, "Failed to read recipe archive");
            error(
                ErrorCode::Unavailable,
                "Service temporarily unavailable, please retry.",
            )
        }
    }
}
