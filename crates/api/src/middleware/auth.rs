//! Session extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use mu2mi_core::error::CoreError;
use mu2mi_core::types::UserId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a Bearer session token in the
/// `Authorization` header. Rejects with `UNAUTHENTICATED` when absent or
/// invalid.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthenticated(
                "Missing Authorization header".into(),
            ))
        })?;
        authenticate(token, state)
    }
}

/// Optional session for endpoints that also serve anonymous callers.
///
/// A missing header yields `None`; a present but invalid token is still
/// rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.user_id.as_str())
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(authenticate(token, state)?))),
            None => Ok(Self(None)),
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| {
        AppError::Core(CoreError::Unauthenticated(
            "Invalid Authorization header".into(),
        ))
    })?;
    value.strip_prefix("Bearer ").map(Some).ok_or_else(|| {
        AppError::Core(CoreError::Unauthenticated(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })
}

fn authenticate(token: &str, state: &AppState) -> Result<AuthUser, AppError> {
    let claims = validate_token(token, &state.config.session).map_err(|_| {
        AppError::Core(CoreError::Unauthenticated("Invalid or expired session".into()))
    })?;
    Ok(AuthUser {
        user_id: claims.sub,
    })
}
