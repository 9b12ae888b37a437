//! Session-token authentication.
//!
//! The core services only ever see the `{user_id, role}` principal;
//! everything token-shaped lives here: password hashing, the session
//! map, and the request extractor.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use common::Principal;
use uuid::Uuid;

use crate::error::ApiError;

/// In-memory session map from opaque bearer token to principal.
/// Sessions do not survive a restart.
#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, Principal>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session and returns its token.
    pub fn create(&self, principal: Principal) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.inner.write().unwrap().insert(token.clone(), principal);
        token
    }

    pub fn get(&self, token: &str) -> Option<Principal> {
        self.inner.read().unwrap().get(token).copied()
    }

    /// Removes a session; unknown tokens are ignored.
    pub fn revoke(&self, token: &str) {
        self.inner.write().unwrap().remove(token);
    }
}

/// Extracts the authenticated principal from the `Authorization:
/// Bearer <token>` header. Rejects with 401 when the header is missing
/// or the token is unknown.
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    Sessions: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Sessions::from_ref(state);
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;
        let principal = sessions.get(token).ok_or(ApiError::Unauthenticated)?;
        Ok(CurrentUser(principal))
    }
}

/// Pulls the bearer token out of request parts, if present.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use common::UserId;

    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn sessions_create_get_revoke() {
        let sessions = Sessions::new();
        let principal = Principal::customer(UserId::new());

        let token = sessions.create(principal);
        assert_eq!(sessions.get(&token), Some(principal));

        sessions.revoke(&token);
        assert_eq!(sessions.get(&token), None);
        // revoking again is harmless
        sessions.revoke(&token);
    }

    #[test]
    fn tokens_are_unique_per_session() {
        let sessions = Sessions::new();
        let principal = Principal::customer(UserId::new());
        assert_ne!(sessions.create(principal), sessions.create(principal));
    }
}
