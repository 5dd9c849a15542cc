//! Request extractors that answer with the API's JSON error body.

use axum::{
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    Json,
};

use crate::app::errors;

/// `Json<T>` whose rejection is a 400 `invalid_body` error object instead of
/// axum's plain-text response.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "request body rejected");
                Err(errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_body",
                    rejection.body_text(),
                ))
            }
        }
    }
}
