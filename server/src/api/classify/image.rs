use crate::api::{error_response, ErrorResponse, JsonBody};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use larder_core::{ClassificationResult, ClassifyRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassifyImageRequest {
    /// Publicly reachable http(s) image URL
    pub image_url: String,
    /// If set, baked-product recipes are archived under this owner
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassifyImageResponse {
    /// Tagged by `type`: ingredient {name, uses}, baked_product {recipe} or unknown {message}
    #[schema(value_type = Object)]
    pub detected: ClassificationResult,
}

#[utoipa::path(
    post,
    path = "/api/classify",
    tag = "classification",
    request_body = ClassifyImageRequest,
    responses(
        (status = 200, description = "Image classified", body = ClassifyImageResponse),
        (status = 400, description = "Missing or invalid image URL", body = ErrorResponse),
        (status = 404, description = "No recognizable objects in the image", body = ErrorResponse),
        (status = 502, description = "Model output could not be used", body = ErrorResponse),
        (status = 503, description = "Label detection or model unavailable", body = ErrorResponse)
    )
)]
pub async fn classify_image(
    State(resolver): State<AppState>,
    JsonBody(request): JsonBody<ClassifyImageRequest>,
) -> impl IntoResponse {
    let request = ClassifyRequest {
        image_url: request.image_url,
        owner: request.owner.filter(|o| !o.trim().is_empty()),
    };

    match resolver.classify_image(&request).await {
        Ok(detected) => Json(ClassifyImageResponse { detected }).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, app_with_labels, send};
    use axum::http::StatusCode;
    use larder_core::FakeProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_classify_ingredient() {
        let app = app_with_labels(
            FakeProvider::with_response(
                "Detected Features from Vision API: Lemon, Citrus",
                r#"{"type": "ingredient", "name": "lemon", "uses": ["lemonade"]}"#,
            ),
            &["Lemon", "Citrus"],
            None,
        );
        let (status, body) = send(
            &app,
            "POST",
            "/api/classify",
            Some(json!({"image_url": "https://example.com/lemon.jpg"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"detected": {"type": "ingredient", "name": "lemon", "uses": ["lemonade"]}})
        );
    }

    #[tokio::test]
    async fn test_classify_unknown_carries_message() {
        let app = app_with_labels(FakeProvider::default(), &["Abstract"], None);
        let (status, body) = send(
            &app,
            "POST",
            "/api/classify",
            Some(json!({"image_url": "https://example.com/blur.jpg"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detected"]["type"], "unknown");
        assert_eq!(
            body["detected"]["message"],
            "could not determine the ingredient or baked product"
        );
    }

    #[tokio::test]
    async fn test_classify_no_labels() {
        let app = app_with_labels(FakeProvider::default(), &[], None);
        let (status, body) = send(
            &app,
            "POST",
            "/api/classify",
            Some(json!({"image_url": "https://example.com/void.jpg"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No recognizable objects found in image.");
    }

    #[tokio::test]
    async fn test_classify_without_detector() {
        let app = app(FakeProvider::default());
        let (status, body) = send(
            &app,
            "POST",
            "/api/classify",
            Some(json!({"image_url": "https://example.com/lemon.jpg"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "unavailable");
    }

    #[tokio::test]
    async fn test_classify_missing_url_is_invalid_argument() {
        let app = app_with_labels(FakeProvider::default(), &["Lemon"], None);
        let (status, body) = send(&app, "POST", "/api/classify", Some(json!({"owner": "sam"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
    }
}
