use service_core::axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use service_core::error::AppError;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::services::ProfileError;

/// JSON body that has been deserialized and validated.
///
/// Malformed bodies and failed field rules both answer with the flow's
/// `400 {"error": ...}` shape instead of axum's plain-text rejection.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                tracing::debug!(error = %rejection, "Rejected request body");
                AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
            })?;

        value
            .validate()
            .map_err(|errors| AppError::from(ProfileError::from(errors)))?;

        Ok(ValidatedJson(value))
    }
}
