use crate::api::{status_for, ErrorResponse};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use larder_core::ErrorCode;
use serde::de::DeserializeOwned;

/// JSON request body whose rejections are reported as `invalid_argument`.
///
/// Use this instead of [`Json`] for request bodies:
/// ```ignore
/// async fn my_handler(JsonBody(request): JsonBody<MyRequest>) -> impl IntoResponse {
///     // request is the deserialized body
/// }
/// ```
pub struct JsonBody<T>(pub T);

pub struct InvalidBody(JsonRejection);

impl IntoResponse for InvalidBody {
    fn into_response(self) -> Response {
        let code = ErrorCode::InvalidArgument;
        let message = self.0.body_text();
        tracing::debug!(status = %self.0.status(), error = %message, "Rejected request body");
        (status_for(code), Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = InvalidBody;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(InvalidBody)?;
        Ok(JsonBody(value))
    }
}
