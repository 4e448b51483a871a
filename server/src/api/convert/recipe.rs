use crate::api::{error_response, ErrorResponse, JsonBody};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use larder_core::{ConvertRecipeRequest, ConvertedLine};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConvertRecipeBody {
    /// Free recipe text
    pub text: String,
    pub output_unit: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConvertedLineBody {
    pub ingredient: String,
    /// Converted measure, or the original one when `converted` is false
    pub measure: String,
    pub converted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ConvertedLine> for ConvertedLineBody {
    fn from(line: ConvertedLine) -> Self {
        Self {
            ingredient: line.ingredient,
            measure: line.measure,
            converted: line.converted,
            error: line.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConvertRecipeResponse {
    pub ingredients: Vec<ConvertedLineBody>,
}

#[utoipa::path(
    post,
    path = "/api/convert/recipe",
    tag = "conversion",
    request_body = ConvertRecipeBody,
    responses(
        (status = 200, description = "Every extracted line, converted where possible", body = ConvertRecipeResponse),
        (status = 400, description = "Empty text, unit or unknown region", body = ErrorResponse),
        (status = 502, description = "Extraction output could not be used", body = ErrorResponse),
        (status = 503, description = "Model unavailable", body = ErrorResponse)
    )
)]
pub async fn convert_recipe(
    State(resolver): State<AppState>,
    JsonBody(request): JsonBody<ConvertRecipeBody>,
) -> impl IntoResponse {
    let request = ConvertRecipeRequest {
        text: request.text,
        output_unit: request.output_unit,
        region: request.region,
    };

    match resolver.convert_recipe(&request).await {
        Ok(lines) => Json(ConvertRecipeResponse {
            ingredients: lines.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, send};
    use axum::http::StatusCode;
    use larder_core::FakeProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_convert_recipe() {
        let provider = FakeProvider::new();
        provider.add_response(
            "Extract all ingredients",
            r#"[{"ingredient": "milk", "measure": "1 cup"}, {"ingredient": "salt", "measure": "unknown"}]"#,
        );
        provider.add_response("1 cup of milk into ml", "236.6");
        let app = app(provider);

        let (status, body) = send(
            &app,
            "POST",
            "/api/convert/recipe",
            Some(json!({"text": "1 cup milk, salt", "output_unit": "ml", "region": "US"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"ingredients": [
                {"ingredient": "milk", "measure": "236.60 ml", "converted": true},
                {"ingredient": "salt", "measure": "unknown", "converted": false}
            ]})
        );
    }

    #[tokio::test]
    async fn test_convert_recipe_requires_unit() {
        let app = app(FakeProvider::default());
        let (status, _) = send(
            &app,
            "POST",
            "/api/convert/recipe",
            Some(json!({"text": "1 cup milk", "output_unit": " ", "region": "US"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_convert_recipe_missing_fields_is_invalid_argument() {
        let app = app(FakeProvider::default());
        let (status, body) = send(
            &app,
            "POST",
            "/api/convert/recipe",
            Some(json!({"text": "1 cup milk"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
    }
}
