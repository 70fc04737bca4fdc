use chrono::{DateTime, Utc};
use embedsync_core::{CoreError, FeedApiError, SessionProvider, SessionToken};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::api::{PatreonApiClient, PatreonCredentials};

/// Performs the credential exchange that yields a fresh session cookie.
pub trait Authenticator {
    async fn login(&self, credentials: &PatreonCredentials) -> Result<Option<String>, CoreError>;
}

impl Authenticator for PatreonApiClient {
    async fn login(&self, credentials: &PatreonCredentials) -> Result<Option<String>, CoreError> {
        PatreonApiClient::login(self, credentials).await
    }
}

/// Durable storage for the raw session cookie between runs.
pub trait TokenStore {
    async fn load(&self) -> Result<Option<String>, CoreError>;
    async fn save(&self, raw_cookie: &str) -> Result<(), CoreError>;
}

/// Keeps the cookie in a plain text file. Last writer wins.
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
    async fn load(&self) -> Result<Option<String>, CoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let contents = contents.trim();
                Ok((!contents.is_empty()).then(|| contents.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, raw_cookie: &str) -> Result<(), CoreError> {
        tokio::fs::write(&self.path, raw_cookie).await?;
        Ok(())
    }
}

/// Hands out a session, reusing the cached one until it is close to expiry.
pub struct SessionManager<A, S> {
    authenticator: A,
    store: S,
    credentials: PatreonCredentials,
}

impl<A: Authenticator, S: TokenStore> SessionManager<A, S> {
    pub fn new(authenticator: A, store: S, credentials: PatreonCredentials) -> Self {
        Self {
            authenticator,
            store,
            credentials,
        }
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn acquire_session_at(&self, now: DateTime<Utc>) -> Result<SessionToken, CoreError> {
        let cached = self.load_cached().await;

        let token = match cached {
            Some(token) if !token.needs_renewal(now) => {
                info!(
                    "Reusing cached Patreon session (expires {:?})",
                    token.expires_at()
                );
                token
            }
            cached => self.renew(cached, now).await?,
        };

        // The run continues even when the cache cannot be written.
        if let Err(e) = self.store.save(token.raw_cookie()).await {
            warn!("Failed to persist Patreon session: {}", e);
        }

        Ok(token)
    }

    async fn load_cached(&self) -> Option<SessionToken> {
        match self.store.load().await {
            Ok(Some(raw)) => Some(SessionToken::from_cookie(raw)),
            Ok(None) => {
                debug!("No cached Patreon session");
                None
            }
            Err(e) => {
                warn!("Failed to read cached Patreon session: {}", e);
                None
            }
        }
    }

    async fn renew(
        &self,
        cached: Option<SessionToken>,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, CoreError> {
        let failure = match self.authenticator.login(&self.credentials).await {
            Ok(Some(raw_cookie)) => {
                let token = SessionToken::from_cookie(raw_cookie);
                info!(
                    "Logged in to Patreon, session expires {:?}",
                    token.expires_at()
                );
                return Ok(token);
            }
            Ok(None) => FeedApiError::SessionUnavailable,
            Err(e) => FeedApiError::AuthenticationFailed {
                reason: e.to_string(),
            },
        };

        match cached {
            Some(token) if !token.is_expired(now) => {
                warn!(
                    "Patreon login failed ({}); using cached session until {:?}",
                    failure,
                    token.expires_at()
                );
                Ok(token)
            }
            _ => Err(failure.into()),
        }
    }
}

impl<A: Authenticator, S: TokenStore> SessionProvider for SessionManager<A, S> {
    async fn acquire_session(&self) -> Result<SessionToken, CoreError> {
        self.acquire_session_at(Utc::now()).await
    }
}
