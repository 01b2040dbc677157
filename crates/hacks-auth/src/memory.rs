//! In-process identity service for local runs and tests.
//!
//! Accounts live only as long as the value. Tokens are real HS256 JWTs so
//! the rest of the stack reads them exactly like hosted ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use futures_util::future::{self, BoxFuture};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::info;
use uuid::Uuid;

use hacks_types::api::{AuthUser, Claims, PasswordCredentials, Session, SignUpResponse};

use crate::{AuthError, IdentityBackend, Result};

const MIN_PASSWORD_LEN: usize = 6;
const DEFAULT_TTL_SECS: i64 = 3600;

struct Account {
    id: Uuid,
    email: String,
    /// Argon2id PHC string.
    password_hash: String,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    /// refresh token -> owning account email key
    refresh_tokens: HashMap<String, String>,
}

#[derive(Clone)]
pub struct MemoryIdentity {
    state: Arc<Mutex<State>>,
    secret: Arc<[u8]>,
    auto_confirm: bool,
    ttl_secs: i64,
}

impl MemoryIdentity {
    /// Accounts are usable right after sign-up.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            secret: Uuid::new_v4().as_bytes().to_vec().into(),
            auto_confirm: true,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    /// Sign-ups wait for [`confirm`](Self::confirm) before they can sign in.
    pub fn requiring_confirmation() -> Self {
        Self {
            auto_confirm: false,
            ..Self::new()
        }
    }

    /// Lifetime of issued access tokens. Zero or negative issues tokens that
    /// are already stale, which is handy for exercising refresh.
    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Mark an account as having clicked its confirmation link.
    pub fn confirm(&self, email: &str) -> bool {
        let mut state = self.lock();
        match state.accounts.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn issue(&self, state: &mut State, key: &str, id: Uuid, email: &str) -> Result<Session> {
        let now = chrono::Utc::now().timestamp();
        let expires_at = now + self.ttl_secs;
        let claims = Claims {
            sub: id,
            email: Some(email.to_string()),
            exp: expires_at.max(0) as usize,
        };
        let access_token = encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))?;
        let refresh_token = Uuid::new_v4().simple().to_string();
        state
            .refresh_tokens
            .insert(refresh_token.clone(), key.to_string());

        Ok(Session {
            access_token,
            refresh_token,
            token_type: "bearer".into(),
            expires_in: self.ttl_secs,
            expires_at: Some(expires_at),
            user: AuthUser {
                id,
                email: Some(email.to_string()),
            },
        })
    }

    fn password_sign_in(&self, credentials: &PasswordCredentials) -> Result<Session> {
        let key = credentials.email.trim().to_lowercase();
        let mut state = self.lock();
        let (id, email) = match state.accounts.get(&key) {
            Some(account) if verify_password(&credentials.password, &account.password_hash) => {
                if !account.confirmed {
                    return Err(AuthError::Rejected {
                        status: 400,
                        message: "Email not confirmed".into(),
                    });
                }
                (account.id, account.email.clone())
            }
            _ => return Err(AuthError::InvalidCredentials),
        };
        self.issue(&mut state, &key, id, &email)
    }

    fn register(&self, credentials: &PasswordCredentials) -> Result<SignUpResponse> {
        let email = credentials.email.trim().to_string();
        if !email.contains('@') {
            return Err(AuthError::Rejected {
                status: 400,
                message: "Unable to validate email address: invalid format".into(),
            });
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected {
                status: 422,
                message: format!("Password should be at least {} characters", MIN_PASSWORD_LEN),
            });
        }

        let password_hash = hash_password(&credentials.password)?;
        let key = email.to_lowercase();
        let mut state = self.lock();
        if state.accounts.contains_key(&key) {
            return Err(AuthError::Rejected {
                status: 422,
                message: "User already registered".into(),
            });
        }

        let id = Uuid::new_v4();
        state.accounts.insert(
            key.clone(),
            Account {
                id,
                email: email.clone(),
                password_hash,
                confirmed: self.auto_confirm,
            },
        );
        info!(user_id = %id, "account registered");

        if self.auto_confirm {
            Ok(SignUpResponse::Session(self.issue(&mut state, &key, id, &email)?))
        } else {
            Ok(SignUpResponse::User(AuthUser {
                id,
                email: Some(email),
            }))
        }
    }

    fn revoke(&self, access_token: &str) -> Result<()> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.validate_aud = false;
        let claims = decode::<Claims>(access_token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|_| AuthError::Rejected {
                status: 401,
                message: "invalid JWT".into(),
            })?
            .claims;

        let mut state = self.lock();
        let key = state
            .accounts
            .iter()
            .find(|(_, account)| account.id == claims.sub)
            .map(|(key, _)| key.clone());
        if let Some(key) = key {
            state.refresh_tokens.retain(|_, owner| *owner != key);
        }
        Ok(())
    }

    fn exchange(&self, refresh_token: &str) -> Result<Session> {
        let mut state = self.lock();
        let key = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| AuthError::Rejected {
                status: 400,
                message: "Invalid Refresh Token: Refresh Token Not Found".into(),
            })?;
        let (id, email) = match state.accounts.get(&key) {
            Some(account) => (account.id, account.email.clone()),
            None => return Err(AuthError::NoSession),
        };
        self.issue(&mut state, &key, id, &email)
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityBackend for MemoryIdentity {
    fn sign_in_with_password<'a>(
        &'a self,
        credentials: &'a PasswordCredentials,
    ) -> BoxFuture<'a, Result<Session>> {
        Box::pin(future::ready(self.password_sign_in(credentials)))
    }

    fn sign_up<'a>(
        &'a self,
        credentials: &'a PasswordCredentials,
    ) -> BoxFuture<'a, Result<SignUpResponse>> {
        Box::pin(future::ready(self.register(credentials)))
    }

    fn sign_out<'a>(&'a self, access_token: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(future::ready(self.revoke(access_token)))
    }

    fn refresh_session<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<Session>> {
        Box::pin(future::ready(self.exchange(refresh_token)))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::token;

    fn creds(email: &str, password: &str) -> PasswordCredentials {
        PasswordCredentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let identity = MemoryIdentity::new();
        let resp = identity.sign_up(&creds("Mom@Example.com", "hunter22")).await.unwrap();
        let user_id = resp.user().id;
        assert!(resp.into_session().is_some());

        let session = identity
            .sign_in_with_password(&creds("mom@example.com", "hunter22"))
            .await
            .unwrap();
        assert_eq!(session.user.id, user_id);

        let claims = token::unverified_claims(&session.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let identity = MemoryIdentity::new();
        identity.sign_up(&creds("a@b.c", "secret1")).await.unwrap();

        let err = identity
            .sign_in_with_password(&creds("a@b.c", "secret2"))
            .await
            .unwrap_err();
        assert_matches!(err, AuthError::InvalidCredentials);

        let err = identity
            .sign_in_with_password(&creds("nobody@b.c", "secret1"))
            .await
            .unwrap_err();
        assert_matches!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn passwords_are_stored_as_argon2_hashes() {
        let identity = MemoryIdentity::new();
        identity.sign_up(&creds("a@b.c", "secret1")).await.unwrap();

        let stored = identity.lock().accounts["a@b.c"].password_hash.clone();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("secret1"));
        assert!(verify_password("secret1", &stored));
        assert!(!verify_password("secret2", &stored));
        assert!(!verify_password("secret1", "not a phc string"));
    }

    #[tokio::test]
    async fn sign_up_rejections() {
        let identity = MemoryIdentity::new();
        let err = identity.sign_up(&creds("a@b.c", "12345")).await.unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters");

        identity.sign_up(&creds("a@b.c", "123456")).await.unwrap();
        let err = identity.sign_up(&creds("A@B.C", "123456")).await.unwrap_err();
        assert_matches!(err, AuthError::Rejected { status: 422, .. });
        assert_eq!(err.to_string(), "User already registered");
    }

    #[tokio::test]
    async fn unconfirmed_accounts_cannot_sign_in() {
        let identity = MemoryIdentity::requiring_confirmation();
        let resp = identity.sign_up(&creds("a@b.c", "123456")).await.unwrap();
        assert_matches!(resp, SignUpResponse::User(_));

        let err = identity
            .sign_in_with_password(&creds("a@b.c", "123456"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email not confirmed");

        assert!(identity.confirm("a@b.c"));
        identity
            .sign_in_with_password(&creds("a@b.c", "123456"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_rotates_and_sign_out_revokes() {
        let identity = MemoryIdentity::new();
        let first = identity
            .sign_up(&creds("a@b.c", "123456"))
            .await
            .unwrap()
            .into_session()
            .unwrap();

        let second = identity.refresh_session(&first.refresh_token).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_matches!(
            identity.refresh_session(&first.refresh_token).await,
            Err(AuthError::Rejected { status: 400, .. })
        );

        identity.sign_out(&second.access_token).await.unwrap();
        assert!(identity.refresh_session(&second.refresh_token).await.is_err());
    }
}
