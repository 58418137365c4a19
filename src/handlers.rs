//! Authentication HTTP Handlers
//!
//! REST API endpoints for authentication operations.

use crate::error::AuthError;
use crate::extractors::ValidJson;
use crate::models::*;
use crate::workflow::AuthWorkflow;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Shared workflow state
pub type AuthState = Arc<AuthWorkflow>;

/// Prefix all auth routes are nested under
pub const API_PREFIX: &str = "/api/v1/auth";

// ============================================
// Route Builder
// ============================================

/// Create the application router
pub fn create_routes(workflow: AuthState) -> Router {
    let auth = Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .route("/forgot-password/", post(forgot_password))
        .route("/reset-password/:token", post(reset_password));

    Router::new()
        .route("/", get(root))
        .nest(API_PREFIX, auth)
        .with_state(workflow)
}

/// GET /
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "Hello": "World" }))
}

// ============================================
// Registration
// ============================================

/// POST /register/
///
/// Register a new user account
pub async fn register(
    State(auth): State<AuthState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

// ============================================
// Login / Logout
// ============================================

/// POST /login/
///
/// Authenticate user and return a bearer token
pub async fn login(
    State(auth): State<AuthState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.login(req).await?;

    Ok(Json(response))
}

/// POST /logout/
pub async fn logout(
    State(auth): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let response = auth.logout(authorization).await?;

    Ok(Json(response))
}

// ============================================
// Password Management
// ============================================

/// POST /forgot-password/
///
/// Send a password reset link to the user's email
pub async fn forgot_password(
    State(auth): State<AuthState>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.forgot_password(&req.email).await?;

    Ok(Json(response))
}

/// POST /reset-password/:token
///
/// Complete password reset with the emailed token
pub async fn reset_password(
    State(auth): State<AuthState>,
    Path(token): Path<String>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.reset_password(&token, req).await?;

    Ok(Json(response))
}
