use std::fmt;

use url::Url;
use uuid::Uuid;

/// Client-side routes of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    /// Decoded category name.
    Category(String),
    Question(Uuid),
    Hack(Uuid),
    /// Optionally preselects a question in the form.
    Submit { question: Option<Uuid> },
    Auth,
    Profile,
}

impl Route {
    /// Parse an app path such as `/category/Screen%20Time` or
    /// `/submit?question=<id>`. Unknown paths give `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let base = Url::parse("app://parent-hacks/").ok()?;
        let url = base.join(path.trim()).ok()?;
        if url.scheme() != "app" || url.host_str() != Some("parent-hacks") {
            return None;
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [] => Some(Self::Home),
            ["category", category] => {
                let decoded = urlencoding::decode(category).ok()?;
                Some(Self::Category(decoded.into_owned()))
            }
            ["question", id] => Uuid::parse_str(id).ok().map(Self::Question),
            ["hack", id] => Uuid::parse_str(id).ok().map(Self::Hack),
            ["submit"] => {
                let question = url
                    .query_pairs()
                    .find(|(k, _)| k == "question")
                    .and_then(|(_, v)| Uuid::parse_str(&v).ok());
                Some(Self::Submit { question })
            }
            ["auth"] => Some(Self::Auth),
            ["profile"] => Some(Self::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Category(category) => format!("/category/{}", urlencoding::encode(category)),
            Self::Question(id) => format!("/question/{}", id),
            Self::Hack(id) => format!("/hack/{}", id),
            Self::Submit { question: Some(id) } => format!("/submit?question={}", id),
            Self::Submit { question: None } => "/submit".to_string(),
            Self::Auth => "/auth".to_string(),
            Self::Profile => "/profile".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
