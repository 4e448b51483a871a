use crate::api::{error_response, ErrorResponse, JsonBody};
use crate::AppState;
use axum::routing::post;
use axum::{extract::State, response::IntoResponse, Json, Router};
use larder_core::{ScaleRequest, ScaledRecipe};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/scale", post(scale_recipe))
}

#[derive(OpenApi)]
#[openapi(
    paths(scale_recipe),
    components(schemas(
        ScaleRecipeRequest,
        ScaleRecipeResponse,
        ScaledRecipeBody,
        ScaledIngredientBody
    ))
)]
pub struct ApiDoc;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScaleRecipeRequest {
    /// Recipe object as stored by the caller
    #[schema(value_type = Object)]
    pub recipe: serde_json::Value,
    pub new_servings: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScaledIngredientBody {
    pub name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScaledRecipeBody {
    pub ingredients: Vec<ScaledIngredientBody>,
    /// Steps in their original order
    pub instructions: Vec<String>,
}

impl From<ScaledRecipe> for ScaledRecipeBody {
    fn from(recipe: ScaledRecipe) -> Self {
        Self {
            ingredients: recipe
                .ingredients
                .into_iter()
                .map(|i| ScaledIngredientBody {
                    name: i.name,
                    quantity: i.quantity,
                })
                .collect(),
            instructions: recipe.instructions,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScaleRecipeResponse {
    pub scaled_recipe: ScaledRecipeBody,
}

#[utoipa::path(
    post,
    path = "/api/scale",
    tag = "recipes",
    request_body = ScaleRecipeRequest,
    responses(
        (status = 200, description = "Recipe scaled", body = ScaleRecipeResponse),
        (status = 400, description = "Zero servings or recipe not an object", body = ErrorResponse),
        (status = 502, description = "Model output could not be used", body = ErrorResponse),
        (status = 503, description = "Model unavailable", body = ErrorResponse)
    )
)]
pub async fn scale_recipe(
    State(resolver): State<AppState>,
    JsonBody(request): JsonBody<ScaleRecipeRequest>,
) -> impl IntoResponse {
    let request = ScaleRequest {
        recipe: request.recipe,
        new_servings: request.new_servings,
    };

    match resolver.scale_recipe(&request).await {
        Ok(scaled) => Json(ScaleRecipeResponse {
            scaled_recipe: scaled.into(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}
