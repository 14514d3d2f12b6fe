use std::{fmt, str::FromStr};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};

mod login;
mod password;
mod profile;
mod register;
mod token;
pub(crate) mod users;

pub use password::{hash_password, verify_password};
pub use token::{Claims, Keys};
pub use users::{ProjectOwner, UserSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Researcher,
    Investor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        use Role::*;
        match self {
            Researcher => "researcher",
            Investor => "investor",
            Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "researcher" => Ok(Role::Researcher),
            "investor" => Ok(Role::Investor),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::validation(format!("Unknown role: {other}"))),
        }
    }
}

/// The authenticated caller, taken from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    /// Role guard for routes limited to some roles.
    pub fn require(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Authorization("Access denied".to_owned()))
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    Keys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Err(AppError::Unauthenticated(
                "No token, authorization denied".to_owned(),
            ));
        };

        let Some(token) = header.strip_prefix("Bearer ") else {
            return Err(AppError::Unauthenticated("Token is not valid".to_owned()));
        };
        let claims = Keys::from_ref(state).verify(token.trim())?;

        Ok(Identity {
            id: claims.sub,
            role: claims.role,
        })
    }
}
