use serde_json::Value;

use crate::{
    api::types::{
        Envelope,
        auth::{
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
            SessionGrant, StepToken, VerifyEmailRequest,
        },
    },
    client::{ApiClient, ApiRequest},
    error::{AppError, Result},
    services::auth::TokenKind,
};

use super::{validate_email, validate_password};

pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<SessionGrant> {
    validate_email(email)?;
    validate_password(password)?;

    let request = ApiRequest::post("/auth/login").json(&LoginRequest { email, password })?;
    let grant = client
        .public_request::<Envelope<SessionGrant>>(request)
        .await?
        .into_attributes();

    start_session(client, &grant);
    Ok(grant)
}

/// Creates the account and keeps the email-verification token for [`verify_email`].
pub async fn register(
    client: &ApiClient,
    full_name: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    if full_name.trim().is_empty() || username.trim().is_empty() {
        return Err(AppError::InvalidParams("Name and username are required".into()));
    }
    validate_email(email)?;
    validate_password(password)?;

    let request = ApiRequest::post("/auth/register").json(&RegisterRequest {
        full_name,
        username,
        email,
        password,
    })?;
    let step = client
        .public_request::<Envelope<StepToken>>(request)
        .await?
        .into_attributes();

    let store = client.store();
    store.set_token(
        TokenKind::EmailVerification,
        &step.token,
        store.default_ttl(TokenKind::EmailVerification),
    );
    Ok(())
}

pub async fn verify_email(client: &ApiClient, otp: &str) -> Result<SessionGrant> {
    if otp.trim().is_empty() {
        return Err(AppError::InvalidParams("Verification code is required".into()));
    }

    let token = client
        .store()
        .get_token(TokenKind::EmailVerification)
        .ok_or_else(|| {
            AppError::InvalidParams("Verification session expired. Please register again.".into())
        })?;

    let request = ApiRequest::post("/auth/verify-email")
        .header("authorization", format!("Bearer {token}"))
        .json(&VerifyEmailRequest { otp })?;
    let grant = client
        .public_request::<Envelope<SessionGrant>>(request)
        .await?
        .into_attributes();

    client.store().remove_token(TokenKind::EmailVerification);
    start_session(client, &grant);
    Ok(grant)
}

/// Requests a reset code and keeps the reset token for [`reset_password`].
pub async fn forgot_password(client: &ApiClient, email: &str) -> Result<()> {
    validate_email(email)?;

    let request =
        ApiRequest::post("/auth/forgot-password").json(&ForgotPasswordRequest { email })?;
    let step = client
        .public_request::<Envelope<StepToken>>(request)
        .await?
        .into_attributes();

    let store = client.store();
    store.set_token(
        TokenKind::ResetPassword,
        &step.token,
        store.default_ttl(TokenKind::ResetPassword),
    );
    Ok(())
}

pub async fn reset_password(client: &ApiClient, password: &str) -> Result<()> {
    validate_password(password)?;

    let token = client
        .store()
        .get_token(TokenKind::ResetPassword)
        .ok_or_else(|| {
            AppError::InvalidParams("Reset session expired. Please request a new code.".into())
        })?;

    let request = ApiRequest::post("/auth/reset-password")
        .header("authorization", format!("Bearer {token}"))
        .json(&ResetPasswordRequest { password })?;
    client.public_request::<Value>(request).await?;

    client.store().remove_token(TokenKind::ResetPassword);
    Ok(())
}

/// Tells the server, then ends the session locally whatever the server said.
pub async fn logout(client: &ApiClient) {
    if let Some(refresh_token) = client.store().refresh_token() {
        let request = ApiRequest::post("/auth/logout")
            .json(&serde_json::json!({ "refreshToken": refresh_token }));

        match request {
            Ok(request) => {
                if let Err(e) = client.public_request::<Value>(request).await {
                    tracing::debug!(error = %e, "Server-side logout failed");
                }
            }
            Err(e) => tracing::debug!(error = %e, "Failed to build logout request"),
        }
    }

    client.end_session("logout").await;
}

fn start_session(client: &ApiClient, grant: &SessionGrant) {
    client.begin_session(&grant.tokens);

    let store = client.store();
    if grant.is_first_time {
        store.set_flag(TokenKind::FirstTimeUser);
    }
    if grant.user.as_ref().is_some_and(|user| user.is_profile_completed) {
        store.set_flag(TokenKind::ProfileCompleted);
    }
}
