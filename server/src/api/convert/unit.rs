use crate::api::{error_response, ErrorResponse, JsonBody};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use larder_core::ConvertRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConvertUnitRequest {
    pub ingredient: String,
    pub quantity: f64,
    pub input_unit: String,
    pub output_unit: String,
    /// US, UK, India, Australia, Germany, France or China
    pub region: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConvertUnitResponse {
    /// Converted amount with two decimals
    pub converted_quantity: String,
    /// True when answered from learned factors
    pub cached: bool,
}

#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "conversion",
    request_body = ConvertUnitRequest,
    responses(
        (status = 200, description = "Quantity converted", body = ConvertUnitResponse),
        (status = 400, description = "Invalid quantity, unit or region", body = ErrorResponse),
        (status = 502, description = "Model answer was not a positive number", body = ErrorResponse),
        (status = 503, description = "Model or conversion store unavailable", body = ErrorResponse)
    )
)]
pub async fn convert_unit(
    State(resolver): State<AppState>,
    JsonBody(request): JsonBody<ConvertUnitRequest>,
) -> impl IntoResponse {
    let request = ConvertRequest {
        ingredient: request.ingredient,
        quantity: request.quantity,
        input_unit: request.input_unit,
        output_unit: request.output_unit,
        region: request.region,
    };

    match resolver.convert_unit(&request).await {
        Ok(converted) => Json(ConvertUnitResponse {
            converted_quantity: converted.display(),
            cached: converted.cached,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}
