use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session change notifications published by the session provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AuthEvent {
    /// Startup finished restoring (or failing to restore) a stored session
    InitialSession { user_id: Option<Uuid> },

    /// A password sign-in or auto-confirmed sign-up produced a session
    SignedIn { user_id: Uuid },

    /// The session was ended locally or rejected by the identity service
    SignedOut,

    /// An expired access token was exchanged for a fresh one
    TokenRefreshed { user_id: Uuid },
}

impl AuthEvent {
    /// The identity the event leaves behind, if any.
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::InitialSession { user_id } => *user_id,
            Self::SignedIn { user_id } | Self::TokenRefreshed { user_id } => Some(*user_id),
            Self::SignedOut => None,
        }
    }
}
