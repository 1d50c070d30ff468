//! Request body extractor
//!
//! Wraps `axum::Json` so malformed bodies, unknown fields and missing
//! content types surface as the crate's 400 validation error.

use axum::{
    Json, async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body whose rejection is an [`AppError::Validation`]
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
                JsonRejection::JsonSyntaxError(e) => AppError::Validation(e.body_text()),
                JsonRejection::MissingJsonContentType(e) => AppError::Validation(e.body_text()),
                JsonRejection::BytesRejection(e) => AppError::Validation(e.body_text()),
                _ => AppError::Validation("Invalid JSON body".to_string()),
            })?;

        Ok(ApiJson(value))
    }
}
