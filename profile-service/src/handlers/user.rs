use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::{dtos::ProfileResponse, middleware::AuthUser, AppState};

/// Profile of the authenticated account, `null` when none is stored
#[utoipa::path(
    get,
    path = "/user/get-info",
    responses(
        (status = 200, description = "Stored profile or null", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Missing USER_PROFILE_VIEW_SELF role", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<ProfileResponse>>, AppError> {
    let profile = state.auth_service.find_me(&user.0).await?;
    Ok(Json(profile.map(ProfileResponse::from)))
}
