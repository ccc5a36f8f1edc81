/// Auth client: the single point of contact with the hosted auth service.
///
/// The service owns credentials and issues access tokens; this crate only
/// asks it who a token belongs to, signs users in with email/password and
/// revokes tokens on sign-out. Speaks the GoTrue REST dialect
/// (`/user`, `/logout`, `/token?grant_type=password`, `/recover`).
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{User, UserId};

pub mod session;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid login credentials")]
    InvalidCredentials,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Unauthorized,
            other => AppError::Auth(other.to_string()),
        }
    }
}

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
}

/// The authentication collaborator. Carried in `AppState` as `Arc<dyn Authenticator>`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// The user owning `access_token`, or `None` when the token is unknown or expired.
    async fn get_user(&self, access_token: &str) -> Result<Option<User>, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Asks the service to email a password recovery link. `redirect_to` is
    /// where that link lands once followed.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError>;
}

#[derive(Debug, Deserialize)]
struct AuthUserBody {
    id: Uuid,
    email: Option<String>,
}

impl From<AuthUserBody> for User {
    fn from(body: AuthUserBody) -> Self {
        User {
            id: UserId(body.id),
            email: body.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    user: AuthUserBody,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(alias = "error_description", alias = "msg")]
    message: String,
}

/// `reqwest` client for the hosted auth API.
#[derive(Clone)]
pub struct HostedAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl HostedAuthClient {
    pub fn new(base_url: &str, anon_key: String) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn api_error(response: reqwest::Response) -> AuthError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AuthErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        AuthError::Api { status, message }
    }
}

#[async_trait]
impl Authenticator for HostedAuthClient {
    async fn get_user(&self, access_token: &str) -> Result<Option<User>, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Auth service rejected access token");
                Ok(None)
            }
            status if status.is_success() => {
                let body: AuthUserBody = response.json().await?;
                Ok(Some(body.into()))
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            warn!("Sign-in rejected for {email}");
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: TokenBody = response.json().await?;
        Ok(AuthSession {
            access_token: body.access_token,
            user: body.user.into(),
        })
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut request = self
            .client
            .post(self.endpoint("recover"))
            .header("apikey", &self.anon_key)
            .json(&RecoverRequest { email });
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            debug!("Recovery email requested");
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = HostedAuthClient::new("https://auth.example.com/auth/v1/", "anon".into()).unwrap();
        assert_eq!(client.endpoint("user"), "https://auth.example.com/auth/v1/user");
        assert_eq!(
            client.endpoint("/token?grant_type=password"),
            "https://auth.example.com/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_user_body_ignores_extra_fields() {
        let body: AuthUserBody = serde_json::from_str(
            r#"{"id":"6f1c1a56-5a53-4a7e-9a57-0d1f3c3a2b10","aud":"authenticated","email":"ada@example.com","role":"authenticated"}"#,
        )
        .unwrap();
        let user: User = body.into();
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(
            user.id.to_string(),
            "6f1c1a56-5a53-4a7e-9a57-0d1f3c3a2b10"
        );
    }

    #[test]
    fn test_recover_request_body() {
        let body = serde_json::to_value(RecoverRequest {
            email: "ada@example.com",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "email": "ada@example.com" }));
    }

    #[tokio::test]
    async fn test_static_recovery_records_and_fails_on_demand() {
        let auth = testing::StaticAuthenticator::new();
        auth.reset_password_for_email("ada@example.com", Some("https://app.test/cb"))
            .await
            .unwrap();
        assert_eq!(
            auth.recovery_requests(),
            vec![(
                "ada@example.com".to_string(),
                Some("https://app.test/cb".to_string())
            )]
        );

        let down = testing::StaticAuthenticator::new().with_recovery_down();
        assert!(down
            .reset_password_for_email("ada@example.com", None)
            .await
            .is_err());
        assert!(down.recovery_requests().is_empty());
    }

    #[test]
    fn test_error_body_aliases() {
        let e: AuthErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(e.message, "Invalid login credentials");
    }

    #[test]
    fn test_invalid_credentials_maps_to_unauthorized() {
        assert!(matches!(
            AppError::from(AuthError::InvalidCredentials),
            AppError::Unauthorized
        ));
        assert!(matches!(
            AppError::from(AuthError::Api {
                status: 500,
                message: "down".into()
            }),
            AppError::Auth(_)
        ));
    }
}
