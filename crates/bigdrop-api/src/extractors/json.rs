//! JSON body extractor that runs `validator` rules before the handler.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use bigdrop_core::error::AppError;

use crate::error::ApiError;

/// A deserialized and validated JSON body.
///
/// Malformed JSON and rule violations both surface as `VALIDATION` errors
/// in the standard error envelope.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        value.validate().map_err(|errors| {
            let details = serde_json::to_value(&errors).unwrap_or_default();
            AppError::validation(format!("Invalid request: {errors}")).with_details(details)
        })?;

        Ok(ValidatedJson(value))
    }
}
