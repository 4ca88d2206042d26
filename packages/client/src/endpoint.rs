//! Realtime endpoint resolution and local token storage.
//!
//! Resolution order:
//!
//! 1. no page context (headless) → nothing, the manager stays idle
//! 2. explicit configured URL
//! 3. page origin with `https → wss`, anything else `→ ws`; local-development
//!    hosts use [`LOCAL_DEV_WS_PORT`]
//!
//! A stored auth token is appended as the `token` query parameter.

use std::{
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use url::{Url, form_urlencoded};

/// Port of the realtime endpoint when the page is served from a local dev host
pub const LOCAL_DEV_WS_PORT: u16 = 3007;

const LOCAL_DEV_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Locally persisted auth token
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Stored token, if any. Read failures count as "no token".
    fn load_token(&self) -> Option<String>;

    fn save_token(&self, token: &str) -> io::Result<()>;

    fn clear_token(&self) -> io::Result<()>;
}

/// Token kept in a single file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load_token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save_token(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear_token(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Token kept in memory only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> Option<String> {
        self.token
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .filter(|t| !t.is_empty())
    }

    fn save_token(&self, token: &str) -> io::Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| io::Error::other("token store lock poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> io::Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| io::Error::other("token store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Resolves the realtime URL from configuration, page origin and stored token
#[derive(Clone)]
pub struct EndpointResolver {
    configured: Option<String>,
    page_origin: Option<Url>,
    tokens: Arc<dyn TokenStore>,
    dev_port: u16,
}

impl EndpointResolver {
    /// `page_origin` is `None` for headless contexts, which resolve to nothing.
    pub fn new(
        configured: Option<String>,
        page_origin: Option<Url>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            configured: configured.filter(|url| !url.trim().is_empty()),
            page_origin,
            tokens,
            dev_port: LOCAL_DEV_WS_PORT,
        }
    }

    #[must_use]
    pub fn with_dev_port(mut self, port: u16) -> Self {
        self.dev_port = port;
        self
    }

    /// Best-effort endpoint URL. Never fails.
    pub fn resolve(&self) -> Option<String> {
        let origin = self.page_origin.as_ref()?;
        let base = match &self.configured {
            Some(url) => url.clone(),
            None => derive_from_origin(origin, self.dev_port),
        };
        Some(match self.tokens.load_token() {
            Some(token) => append_token(&base, &token),
            None => base,
        })
    }
}

fn derive_from_origin(origin: &Url, dev_port: u16) -> String {
    let scheme = if origin.scheme() == "https" { "wss" } else { "ws" };
    // IPv6 hosts come back bracketed
    let host = origin.host_str().unwrap_or("localhost");
    let port = if LOCAL_DEV_HOSTS.contains(&host) {
        Some(dev_port)
    } else {
        origin.port()
    };
    match port {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    }
}

fn append_token(base: &str, token: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}token={encoded}")
}
