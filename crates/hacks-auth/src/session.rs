use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};
use uuid::Uuid;

use hacks_db::Database;
use hacks_types::api::{AuthUser, PasswordCredentials, Session};
use hacks_types::events::AuthEvent;
use hacks_types::models::Profile;

use crate::store::SessionStore;
use crate::{IdentityBackend, Result, token};

/// What the rest of the app knows about the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub session: Option<Session>,
    /// Cached `profiles` row; empty when signed out or when the fetch failed.
    pub profile: Option<Profile>,
    /// True until the stored session has been restored.
    pub loading: bool,
}

impl AuthState {
    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    /// False when the account still has to be confirmed by email.
    pub signed_in: bool,
}

/// Process-wide session context shared by every page.
#[derive(Clone)]
pub struct SessionProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    identity: Arc<dyn IdentityBackend>,
    db: Database,
    store: Option<SessionStore>,
    state: RwLock<AuthState>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionProvider {
    pub fn new(identity: Arc<dyn IdentityBackend>, db: Database, store: Option<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ProviderInner {
                identity,
                db,
                store,
                state: RwLock::new(AuthState {
                    loading: true,
                    ..AuthState::default()
                }),
                events,
            }),
        }
    }

    /// Restore the persisted session, refreshing it when it has expired.
    pub async fn initialize(&self) {
        let stored = match &self.inner.store {
            Some(store) => store.load().await.unwrap_or_else(|e| {
                warn!("could not read stored session: {}", e);
                None
            }),
            None => None,
        };

        let session = match stored {
            Some(session) if token::is_expired(&session, chrono::Utc::now().timestamp()) => {
                match self.inner.identity.refresh_session(&session.refresh_token).await {
                    Ok(fresh) => Some(fresh),
                    Err(e) => {
                        warn!(user_id = %session.user.id, "stored session could not be refreshed: {}", e);
                        None
                    }
                }
            }
            other => other,
        };

        let user_id = session.as_ref().map(|s| s.user.id);
        self.apply(session, AuthEvent::InitialSession { user_id })
            .await;
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let credentials = PasswordCredentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let session = self
            .inner
            .identity
            .sign_in_with_password(&credentials)
            .await?;
        let user = session.user.clone();
        info!(user_id = %user.id, "signed in");

        self.apply(Some(session), AuthEvent::SignedIn { user_id: user.id })
            .await;
        Ok(user)
    }

    /// Create an account and its profile row.
    ///
    /// The profile insert is best effort: the account exists either way.
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome> {
        let credentials = PasswordCredentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = self.inner.identity.sign_up(&credentials).await?;
        let user = resp.user().clone();
        let session = resp.into_session();

        if let Some(session) = &session {
            self.inner
                .db
                .set_access_token(Some(session.access_token.clone()));
        }
        if let Err(e) = self.inner.db.insert_profile(user.id, username.trim()).await {
            warn!(user_id = %user.id, "profile row not created: {}", e);
        }

        let signed_in = session.is_some();
        if let Some(session) = session {
            self.apply(Some(session), AuthEvent::SignedIn { user_id: user.id })
                .await;
        }
        info!(user_id = %user.id, signed_in, "account created");

        Ok(SignUpOutcome { user, signed_in })
    }

    /// End the session. Local state is cleared even if the identity service
    /// cannot be reached.
    pub async fn sign_out(&self) {
        let token = self
            .inner
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            if let Err(e) = self.inner.identity.sign_out(&token).await {
                warn!("remote sign-out failed: {}", e);
            }
        }
        self.apply(None, AuthEvent::SignedOut).await;
        info!("signed out");
    }

    /// Exchange the refresh token when the access token is (nearly) expired.
    /// Returns whether a refresh happened. A rejected refresh signs out.
    pub async fn refresh_if_expired(&self) -> Result<bool> {
        let session = match self.session().await {
            Some(session) => session,
            None => return Ok(false),
        };
        if !token::is_expired(&session, chrono::Utc::now().timestamp()) {
            return Ok(false);
        }

        match self
            .inner
            .identity
            .refresh_session(&session.refresh_token)
            .await
        {
            Ok(fresh) => {
                let user_id = fresh.user.id;
                self.apply(Some(fresh), AuthEvent::TokenRefreshed { user_id })
                    .await;
                Ok(true)
            }
            Err(e) => {
                warn!(user_id = %session.user.id, "session refresh rejected: {}", e);
                self.apply(None, AuthEvent::SignedOut).await;
                Err(e)
            }
        }
    }

    pub async fn user(&self) -> Option<AuthUser> {
        self.inner.state.read().await.user().cloned()
    }

    pub async fn profile(&self) -> Option<Profile> {
        self.inner.state.read().await.profile.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.inner.state.read().await.session.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.loading
    }

    pub async fn snapshot(&self) -> AuthState {
        self.inner.state.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Option<Profile> {
        match self.inner.db.profile_by_id(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, "profile fetch failed: {}", e);
                None
            }
        }
    }

    async fn apply(&self, session: Option<Session>, event: AuthEvent) {
        self.inner
            .db
            .set_access_token(session.as_ref().map(|s| s.access_token.clone()));

        if let Some(store) = &self.inner.store {
            let persisted = match &session {
                Some(session) => store.save(session).await,
                None => store.clear().await,
            };
            if let Err(e) = persisted {
                warn!(path = %store.path().display(), "session not persisted: {}", e);
            }
        }

        let profile = match &session {
            Some(session) => self.fetch_profile(session.user.id).await,
            None => None,
        };

        {
            let mut state = self.inner.state.write().await;
            state.session = session;
            state.profile = profile;
            state.loading = false;
        }

        let _ = self.inner.events.send(event);
    }
}
