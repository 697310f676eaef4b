use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use shiptrack::identity::IdentityProvider;
use shiptrack::sanitize::{redact_email, redact_token};
use shiptrack::{Actor, AuthError, Role, Services};

use super::{ok, ApiResult};
use crate::auth::Authenticated;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: Actor,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub password: String,
}

pub fn router() -> Router<Services> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/password-reset", post(request_password_reset))
        .route("/api/auth/password-reset/confirm", post(confirm_password_reset))
        .route("/api/me", get(me))
}

async fn login(
    State(services): State<Services>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload?;
    let password = SecretString::from(request.password);

    let (session, user) = services.login(&request.email, &password, request.role)?;
    tracing::info!(
        email = %redact_email(&user.email),
        role = %user.role,
        "Signed in"
    );

    ok(LoginResponse {
        token: session.token,
        user,
    })
}

async fn logout(
    State(services): State<Services>,
    Authenticated { token, actor }: Authenticated,
) -> ApiResult<()> {
    services.identity.sign_out(&token);
    tracing::info!(
        email = %redact_email(&actor.email),
        session = %redact_token(&token),
        "Signed out"
    );
    ok(())
}

async fn request_password_reset(
    State(services): State<Services>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Json(request) = payload?;
    // Same answer whether or not the account exists.
    match services.identity.send_password_reset_email(&request.email) {
        Ok(()) => {}
        Err(AuthError::UnknownAccount(_)) => {
            tracing::debug!(
                email = %redact_email(&request.email),
                "Password reset requested for an unknown email"
            );
        }
        Err(e) => return Err(e.into()),
    }
    ok(())
}

async fn confirm_password_reset(
    State(services): State<Services>,
    payload: Result<Json<ResetConfirmRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Json(request) = payload?;
    let password = SecretString::from(request.password);
    services
        .identity
        .confirm_password_reset(&request.token, &password)?;
    ok(())
}

async fn me(Authenticated { actor, .. }: Authenticated) -> ApiResult<Actor> {
    ok(actor)
}
