pub mod gotrue;
pub mod memory;
pub mod session;
pub mod store;
pub mod token;

use futures_util::future::BoxFuture;

use hacks_types::api::{PasswordCredentials, Session, SignUpResponse};

pub use gotrue::GoTrueClient;
pub use memory::MemoryIdentity;
pub use session::{AuthState, SessionProvider, SignUpOutcome};
pub use store::SessionStore;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The identity service refused the request; `message` is meant for users.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("request to the identity service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed identity response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid access token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("session storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] hacks_db::DbError),

    #[error("not signed in")]
    NoSession,
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Hosted identity API: password accounts and refreshable sessions.
pub trait IdentityBackend: Send + Sync {
    fn sign_in_with_password<'a>(
        &'a self,
        credentials: &'a PasswordCredentials,
    ) -> BoxFuture<'a, Result<Session>>;

    fn sign_up<'a>(
        &'a self,
        credentials: &'a PasswordCredentials,
    ) -> BoxFuture<'a, Result<SignUpResponse>>;

    /// Revoke the refresh tokens behind `access_token`.
    fn sign_out<'a>(&'a self, access_token: &'a str) -> BoxFuture<'a, Result<()>>;

    fn refresh_session<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<Session>>;
}
