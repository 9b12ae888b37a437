//! Registration, login and logout.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::request::Parts;
use common::{Principal, Role};
use serde::{Deserialize, Serialize};
use store::{NewUser, ShopStore};

use crate::AppState;
use crate::auth::{self, bearer_token};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// -- Handlers --

/// POST /auth/register — create a customer account and log it in.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "name, email and password are required".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&req.password)
        .map_err(|_| ApiError::BadRequest("unusable password".to_string()))?;

    let user_id = state
        .store
        .insert_user(NewUser {
            name: name.clone(),
            email,
            password_hash,
            phone: req.phone,
            address: req.address,
            role: Role::Customer,
        })
        .await?;

    // auto-login, as the registration form does
    let principal = Principal::customer(user_id);
    let token = state.sessions.create(principal);
    metrics::counter!("registrations_total").increment(1);
    tracing::info!(%user_id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user_id: user_id.to_string(),
            name,
            role: Role::Customer,
        }),
    ))
}

/// POST /auth/login — verify credentials and open a session.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let principal = Principal {
        user_id: user.id,
        role: user.role,
    };
    let token = state.sessions.create(principal);
    metrics::counter!("logins_total").increment(1);

    Ok(Json(SessionResponse {
        token,
        user_id: user.id.to_string(),
        name: user.name,
        role: user.role,
    }))
}

/// POST /auth/logout — drop the caller's session, if any.
pub async fn logout<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    parts: Parts,
) -> Json<LogoutResponse> {
    if let Some(token) = bearer_token(&parts) {
        state.sessions.revoke(token);
    }
    Json(LogoutResponse { success: true })
}
