//! Per-invocation context and the factory that derives it from request
//! headers.
//!
//! Credentials are read from `Authorization: Bearer <token>` first, then from
//! the session cookie. Resolution goes through a [`SessionResolver`]; any
//! failure there yields an anonymous context rather than an error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE};

use scrap_core::config::AuthConfig;
use scrap_core::{Identity, ProcedureError, Role, Session, UserId};
use scrap_store::ScrapStore;

/// Failure inside the authentication collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

/// Resolves an opaque credential to an identity. The credential format
/// belongs to the implementation.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `Ok(None)` means the credential is unknown or expired.
    async fn resolve(&self, credential: &str) -> Result<Option<Identity>, AuthError>;
}

/// Token table resolver, loaded from `[[auth.sessions]]`.
#[derive(Debug, Default, Clone)]
pub struct StaticSessionResolver {
    sessions: HashMap<String, Identity>,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        let mut resolver = Self::new();
        for entry in &auth.sessions {
            resolver = resolver.with_session(
                entry.token.clone(),
                Identity {
                    user_id: UserId::new(entry.user_id.clone()),
                    display_name: entry.display_name.clone(),
                    role: entry.role,
                },
            );
        }
        resolver
    }

    pub fn with_session(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.sessions.insert(token.into(), identity);
        self
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<Identity>, AuthError> {
        Ok(self.sessions.get(credential).cloned())
    }
}

/// Everything a handler may touch for one invocation.
///
/// Not `Clone`: each invocation gets its own value, moved into the handler.
pub struct Context {
    session: Session,
    store: Arc<dyn ScrapStore>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(session: Session, store: Arc<dyn ScrapStore>) -> Self {
        Self { session, store }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.identity().map(|identity| &identity.user_id)
    }

    pub fn require_identity(&self) -> Result<&Identity, ProcedureError> {
        self.identity().ok_or(ProcedureError::Unauthenticated)
    }

    /// Authenticated and holding at least `required`.
    pub fn require_role(&self, required: Role) -> Result<&Identity, ProcedureError> {
        let identity = self.require_identity()?;
        if identity.role.satisfies(required) {
            Ok(identity)
        } else {
            Err(ProcedureError::Forbidden { required })
        }
    }

    pub fn store(&self) -> &dyn ScrapStore {
        self.store.as_ref()
    }

    /// Owned handle to the store, for work spawned off the handler task.
    pub fn shared_store(&self) -> Arc<dyn ScrapStore> {
        Arc::clone(&self.store)
    }
}

/// Builds a fresh [`Context`] for every invocation.
#[derive(Clone)]
pub struct ContextFactory {
    resolver: Arc<dyn SessionResolver>,
    store: Arc<dyn ScrapStore>,
    session_cookie: String,
}

impl ContextFactory {
    pub fn new(
        resolver: Arc<dyn SessionResolver>,
        store: Arc<dyn ScrapStore>,
        session_cookie: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            store,
            session_cookie: session_cookie.into(),
        }
    }

    /// Derive a context from inbound request headers.
    ///
    /// Resolves the credential exactly once; never fails.
    pub async fn create(&self, headers: &HeaderMap) -> Context {
        let session = match extract_credential(headers, &self.session_cookie) {
            None => Session::Anonymous,
            Some(credential) => match self.resolver.resolve(&credential).await {
                Ok(identity) => Session::from(identity),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "session resolution failed; continuing anonymously"
                    );
                    Session::Anonymous
                }
            },
        };
        self.for_session(session)
    }

    /// Context for code that already knows the session, e.g. server-side
    /// rendering through the direct caller.
    pub fn for_session(&self, session: Session) -> Context {
        Context::new(session, Arc::clone(&self.store))
    }

    pub fn store(&self) -> &Arc<dyn ScrapStore> {
        &self.store
    }
}

/// Pull the session credential out of `headers`.
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
