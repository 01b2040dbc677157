pub mod card;
pub mod layout;
pub mod pages;
pub mod route;
pub mod search;

use tracing::warn;
use uuid::Uuid;

use hacks_auth::{AuthError, SessionProvider};
use hacks_db::{Database, DbError};
use hacks_types::api::AuthUser;

pub use card::HackCard;
pub use pages::{Page, navigate};
pub use route::Route;
pub use search::SearchBox;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The action needs a signed-in user; the message is shown as is.
    #[error("{0}")]
    SignInRequired(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Everything a page needs: the data store and the session context.
#[derive(Clone)]
pub struct AppContext {
    pub db: Database,
    pub auth: SessionProvider,
}

impl AppContext {
    pub fn new(auth: SessionProvider) -> Self {
        Self {
            db: auth.db().clone(),
            auth,
        }
    }

    pub async fn user(&self) -> Option<AuthUser> {
        self.auth.user().await
    }

    pub async fn user_id(&self) -> Option<Uuid> {
        self.auth.user().await.map(|u| u.id)
    }

    /// Swap an expired access token for a fresh one before talking to the
    /// store. A rejected refresh leaves the context signed out.
    pub async fn refresh_session(&self) {
        if let Err(e) = self.auth.refresh_if_expired().await {
            warn!("session could not be refreshed: {}", e);
        }
    }

    /// The signed-in user, or `SignInRequired` carrying `message`.
    pub async fn require_user(&self, message: &'static str) -> Result<AuthUser> {
        self.refresh_session().await;
        self.auth
            .user()
            .await
            .ok_or(AppError::SignInRequired(message))
    }
}
