use serde::{Deserialize, Serialize};

use crate::services::auth::CredentialPair;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub full_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest<'a> {
    pub otp: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest<'a> {
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// `{ "data": { "tokens": { "accessToken", "refreshToken"? } } }`
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub data: RefreshData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshData {
    pub tokens: TokenGrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub is_profile_completed: bool,
}

/// Attributes of a successful login or email verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub tokens: CredentialPair,

    #[serde(default)]
    pub user: Option<UserSummary>,

    #[serde(default)]
    pub is_first_time: bool,
}

/// Attributes carrying a one-shot token for a follow-up step (verification, password reset).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepToken {
    #[serde(alias = "verificationToken", alias = "resetPasswordToken")]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_refresh_response_with_and_without_rotation() {
        let rotated: RefreshResponse = serde_json::from_value(json!({
            "data": { "tokens": { "accessToken": "a2", "refreshToken": "r2" } }
        }))
        .unwrap();
        assert_eq!(rotated.data.tokens.refresh_token.as_deref(), Some("r2"));

        let access_only: RefreshResponse =
            serde_json::from_value(json!({ "data": { "tokens": { "accessToken": "a2" } } }))
                .unwrap();
        assert_eq!(access_only.data.tokens.access_token, "a2");
        assert_eq!(access_only.data.tokens.refresh_token, None);

        assert!(serde_json::from_value::<RefreshResponse>(json!({ "data": {} })).is_err());
    }

    #[test]
    fn test_step_token_aliases() {
        let step: StepToken =
            serde_json::from_value(json!({ "verificationToken": "v-123" })).unwrap();
        assert_eq!(step.token, "v-123");
    }
}
