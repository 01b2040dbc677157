//! Client for the hosted GoTrue-style identity API.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use hacks_types::api::{PasswordCredentials, RefreshTokenRequest, Session, SignUpResponse};

use crate::{AuthError, IdentityBackend, Result};

#[derive(Clone)]
pub struct GoTrueClient {
    client: Client,
    /// Ends with `/auth/v1/`.
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GoTrueClient {
    pub fn new(base_url: Url, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| AuthError::Rejected {
            status: 0,
            message: format!("bad identity endpoint {}: {}", path, e),
        })
    }

    async fn post<B, T>(&self, path: &str, grant_type: Option<&str>, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self
            .client
            .post(self.endpoint(path)?)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body);
        if let Some(grant_type) = grant_type {
            req = req.query(&[("grant_type", grant_type)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(path, status = status.as_u16(), "identity round trip");

        if !status.is_success() {
            return Err(error_from_body(status, &text));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn password_grant(&self, credentials: &PasswordCredentials) -> Result<Session> {
        let session: Session = self.post("token", Some("password"), credentials).await?;
        Ok(stamp_expiry(session))
    }

    async fn sign_up_request(&self, credentials: &PasswordCredentials) -> Result<SignUpResponse> {
        let resp: SignUpResponse = self.post("signup", None, credentials).await?;
        Ok(match resp {
            SignUpResponse::Session(session) => SignUpResponse::Session(stamp_expiry(session)),
            user => user,
        })
    }

    async fn logout(&self, access_token: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("logout")?)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(error_from_body(status, &text))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<Session> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let session: Session = self.post("token", Some("refresh_token"), &body).await?;
        Ok(stamp_expiry(session))
    }
}

impl IdentityBackend for GoTrueClient {
    fn sign_in_with_password<'a>(
        &'a self,
        credentials: &'a PasswordCredentials,
    ) -> BoxFuture<'a, Result<Session>> {
        Box::pin(self.password_grant(credentials))
    }

    fn sign_up<'a>(
        &'a self,
        credentials: &'a PasswordCredentials,
    ) -> BoxFuture<'a, Result<SignUpResponse>> {
        Box::pin(self.sign_up_request(credentials))
    }

    fn sign_out<'a>(&'a self, access_token: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.logout(access_token))
    }

    fn refresh_session<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<Session>> {
        Box::pin(self.refresh_grant(refresh_token))
    }
}

/// Fill in `expires_at` from `expires_in` when the service left it out.
fn stamp_expiry(mut session: Session) -> Session {
    if session.expires_at.is_none() {
        session.expires_at = Some(chrono::Utc::now().timestamp() + session.expires_in);
    }
    session
}

fn error_from_body(status: StatusCode, body: &str) -> AuthError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let invalid_grant = parsed.error.as_deref() == Some("invalid_grant")
        || parsed.error_code.as_deref() == Some("invalid_credentials");
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        });

    if status == StatusCode::BAD_REQUEST && invalid_grant && message.contains("credentials") {
        return AuthError::InvalidCredentials;
    }

    AuthError::Rejected {
        status: status.as_u16(),
        message,
    }
}
