use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use tracing::info;
use url::Url;

use hacks_app::AppContext;
use hacks_auth::{GoTrueClient, IdentityBackend, MemoryIdentity, SessionProvider, SessionStore};
use hacks_db::{Backend, Database, LocalBackend, RestBackend};

/// Browse and share parenting hacks from the terminal
#[derive(Debug, clap::Parser)]
#[command(name = "parent-hacks", author, version, about, long_about = None)]
pub struct Cli {
    /// Where data and accounts live
    #[clap(long, env = "PARENT_HACKS_BACKEND", default_value = "remote")]
    pub backend: BackendKind,

    /// Project URL of the hosted backend, e.g. https://xyz.supabase.co
    #[clap(long, env = "PARENT_HACKS_URL")]
    pub url: Option<String>,

    /// Public anon key of the hosted backend
    #[clap(long, env = "PARENT_HACKS_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// SQLite file for the local backend
    #[clap(long, env = "PARENT_HACKS_DB_PATH", default_value = "parent-hacks.db")]
    pub db_path: PathBuf,

    /// Keep the signed-in session in this file between runs
    #[clap(long, env = "PARENT_HACKS_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Request timeout for the hosted backend, in seconds
    #[clap(long, env = "PARENT_HACKS_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, clap::ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted query and identity APIs
    Remote,
    /// SQLite file with demo data and throwaway accounts
    Local,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Print one page and exit
    Open {
        /// App path, e.g. / or /category/Sleep
        path: String,
    },
}

/// Endpoints of the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoints {
    pub rest: Url,
    pub auth: Url,
    pub anon_key: String,
}

impl Cli {
    /// Validate the hosted backend settings.
    pub fn remote_endpoints(&self) -> anyhow::Result<RemoteEndpoints> {
        let raw = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .context("PARENT_HACKS_URL (or --url) is required for the remote backend")?;
        let anon_key = self
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .context("PARENT_HACKS_ANON_KEY (or --anon-key) is required for the remote backend")?;
        if is_placeholder(anon_key) {
            bail!("PARENT_HACKS_ANON_KEY still holds a placeholder; paste the project's anon key");
        }

        let mut base = Url::parse(raw).with_context(|| format!("invalid backend URL {:?}", raw))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("backend URL must be http or https, got {:?}", raw);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(RemoteEndpoints {
            rest: base.join("rest/v1/")?,
            auth: base.join("auth/v1/")?,
            anon_key: anon_key.to_string(),
        })
    }

    /// Wire up the store, the identity service and the session context.
    pub async fn connect(&self) -> anyhow::Result<AppContext> {
        let (backend, identity): (Arc<dyn Backend>, Arc<dyn IdentityBackend>) = match self.backend {
            BackendKind::Remote => {
                let endpoints = self.remote_endpoints()?;
                let timeout = Duration::from_secs(self.timeout_secs);
                info!(url = %endpoints.rest, "using hosted backend");
                (
                    Arc::new(RestBackend::new(endpoints.rest, &endpoints.anon_key, timeout)?),
                    Arc::new(GoTrueClient::new(endpoints.auth, &endpoints.anon_key, timeout)?),
                )
            }
            BackendKind::Local => {
                let local = LocalBackend::open(&self.db_path)
                    .with_context(|| format!("opening {}", self.db_path.display()))?;
                local.seed_demo()?;
                info!(path = %self.db_path.display(), "using local backend");
                (Arc::new(local), Arc::new(MemoryIdentity::new()))
            }
        };

        let store = self.session_file.clone().map(SessionStore::new);
        let auth = SessionProvider::new(identity, Database::new(backend), store);
        auth.initialize().await;
        Ok(AppContext::new(auth))
    }
}

/// Template values shipped in example env files.
fn is_placeholder(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.starts_with("your")
        || lower.contains("your-anon")
        || lower.contains("your_anon")
        || lower.contains("placeholder")
        || lower.starts_with('<')
        || lower == "changeme"
}
