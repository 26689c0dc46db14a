use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{LoginRequest, RefreshRequest, RegisterRequest, TokenExchangeRequest},
    utils::ValidatedJson,
    AppState,
};

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Registration failed", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.register(&req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Unknown user or rejected credentials", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.login(&req).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Trade a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = AuthResponse),
        (status = 400, description = "Refresh rejected", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.refresh(&req.refresh_token).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Exchange a brokered provider token for realm tokens
#[utoipa::path(
    post,
    path = "/auth/exchange",
    request_body = TokenExchangeRequest,
    responses(
        (status = 200, description = "Token exchanged", body = AuthResponse),
        (status = 400, description = "Exchange rejected", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn exchange(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TokenExchangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .auth_service
        .exchange(&req.subject_token, &req.subject_issuer)
        .await?;
    Ok((StatusCode::OK, Json(res)))
}
