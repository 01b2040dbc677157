use tracing::debug;

use crate::{AppContext, AppError, Result, Route};

pub const MISSING_USERNAME: &str = "Please enter a username";
pub const MISSING_CREDENTIALS: &str = "Please enter your email and password";
pub const ACCOUNT_CREATED: &str = "Account created! Please check your email to verify.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::SignIn => "Welcome Back",
            Self::SignUp => "Create Account",
        }
    }

    pub fn tagline(&self) -> &'static str {
        match self {
            Self::SignIn => "Sign in to save and upvote hacks",
            Self::SignUp => "Join the parent hacks community",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Signed in; continue at `Route`.
    SignedIn(Route),
    /// Account created but email confirmation is pending.
    AwaitingConfirmation,
}

/// Sign-in / sign-up form.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    /// Only read in sign-up mode.
    pub username: String,
}

impl AuthForm {
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
    }

    pub async fn submit(&self, ctx: &AppContext) -> Result<AuthOutcome> {
        if self.mode == AuthMode::SignUp && self.username.trim().is_empty() {
            return Err(AppError::Validation(MISSING_USERNAME.into()));
        }
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation(MISSING_CREDENTIALS.into()));
        }

        match self.mode {
            AuthMode::SignIn => {
                ctx.auth.sign_in(&self.email, &self.password).await?;
                Ok(AuthOutcome::SignedIn(Route::Home))
            }
            AuthMode::SignUp => {
                let outcome = ctx
                    .auth
                    .sign_up(&self.email, &self.password, &self.username)
                    .await?;
                debug!(user_id = %outcome.user.id, signed_in = outcome.signed_in, "sign-up finished");
                if outcome.signed_in {
                    Ok(AuthOutcome::SignedIn(Route::Home))
                } else {
                    Ok(AuthOutcome::AwaitingConfirmation)
                }
            }
        }
    }
}
