//! Session extractors.
//!
//! The token comes from `Authorization: Bearer <token>`, or from an
//! `access_token` query parameter for clients such as `EventSource` that
//! cannot set headers.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use shiptrack::{Actor, AuthError, Role, Services};

use crate::error::ApiError;

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn session_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.access_token)
            .filter(|token| !token.is_empty())
    })
}

/// A signed-in employee or admin.
pub struct Authenticated {
    pub token: String,
    pub actor: Actor,
}

impl FromRequestParts<Services> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        services: &Services,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(AuthError::NotSignedIn)?;
        let actor = services.authenticate(&token)?;
        Ok(Self { token, actor })
    }
}

/// A signed-in admin.
pub struct AdminActor(pub Actor);

impl FromRequestParts<Services> for AdminActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        services: &Services,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated { actor, .. } =
            Authenticated::from_request_parts(parts, services).await?;
        actor.require(Role::Admin)?;
        Ok(Self(actor))
    }
}
