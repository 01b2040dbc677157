use hacks_auth::AuthState;
use hacks_types::api::AuthUser;
use hacks_types::models::Profile;

use crate::Route;

pub const APP_TITLE: &str = "Parent Hacks";
pub const FOOTER: &str = "Made with ❤️ by parents, for parents";

/// Header shown above every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Avatar letter linking to the profile; `None` shows a sign-in link.
    pub avatar: Option<char>,
    pub links: Vec<(&'static str, Route)>,
}

impl Header {
    pub fn for_state(state: &AuthState) -> Self {
        match state.user() {
            Some(user) => Self {
                avatar: Some(avatar_initial(state.profile.as_ref(), user)),
                links: vec![
                    ("+ Submit Hack", Route::Submit { question: None }),
                    ("Profile", Route::Profile),
                ],
            },
            None => Self {
                avatar: None,
                links: vec![("Sign In", Route::Auth)],
            },
        }
    }
}

/// First letter of the username, else of the email, else `U`; upper-cased.
pub fn avatar_initial(profile: Option<&Profile>, user: &AuthUser) -> char {
    profile
        .and_then(|p| p.username.as_deref())
        .and_then(|name| name.chars().next())
        .or_else(|| user.email.as_deref().and_then(|email| email.chars().next()))
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('U')
}
