use std::sync::Arc;

use crate::{
    auth::{DecodeFailure, Role, Session, decode_claims},
    storage::{MemoryTokenStore, TokenStoreState},
};

/// SessionStore
///
/// The single source of truth for "who is acting now". It owns the bearer token, keeps the
/// derived [`Session`] cached, and writes the token through to durable storage so the identity
/// survives a restart.
///
/// There is exactly one store per client; consumers receive it by reference. The cached session
/// is replaced on every `establish`/`clear`, so a query after either call sees the new identity
/// immediately.
///
/// No method here fails: storage problems are logged and the in-memory session still changes,
/// and an undecodable token simply means `Guest`.
pub struct SessionStore {
    store: TokenStoreState,
    session: Session,
}

impl SessionStore {
    /// restore
    ///
    /// Opens a store over `store`, picking up any token a previous run persisted.
    pub fn restore(store: TokenStoreState) -> Self {
        let token = match store.load() {
            Ok(token) => token.map(|t| normalize_token(&t)).filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted session token");
                None
            }
        };

        let session = Session::from_token(token);
        tracing::debug!(
            authenticated = session.is_authenticated(),
            role = %session.role(),
            "session restored"
        );

        Self { store, session }
    }

    /// A store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::restore(Arc::new(MemoryTokenStore::new()))
    }

    /// establish
    ///
    /// Adopts `token` (as returned by the login endpoint) as the current credential. An empty
    /// token is treated as signing out.
    pub fn establish(&mut self, token: &str) {
        let token = normalize_token(token);
        if token.is_empty() {
            self.clear();
            return;
        }

        if let Err(e) = self.store.save(&token) {
            tracing::warn!(error = %e, "session token not persisted, keeping it in memory only");
        }

        self.session = Session::from_token(Some(token));
        tracing::debug!(
            authenticated = self.session.is_authenticated(),
            user_id = self.session.user_id().unwrap_or("-"),
            role = %self.session.role(),
            "session established"
        );
    }

    /// sign_in
    ///
    /// Like `establish`, but only a token that yields an identity is adopted. Any other token
    /// leaves the store signed out with nothing persisted, and the reason is returned.
    pub fn sign_in(&mut self, token: &str) -> Result<(), DecodeFailure> {
        let token = normalize_token(token);
        match decode_claims(&token) {
            Ok(_) => {
                self.establish(&token);
                Ok(())
            }
            Err(failure) => {
                self.clear();
                Err(failure)
            }
        }
    }

    /// clear
    ///
    /// Drops the credential. Calling it again, or without a session, changes nothing.
    pub fn clear(&mut self) {
        if let Err(e) = self.store.remove() {
            tracing::warn!(error = %e, "persisted session token could not be removed");
        }
        if self.session.raw_token().is_some() {
            tracing::debug!("session cleared");
        }
        self.session = Session::guest();
    }

    /// Snapshot of the current identity.
    pub fn identity(&self) -> Session {
        self.session.clone()
    }

    /// Borrowed view of the current identity.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.user_id()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.raw_token()
    }

    /// The storage handle, for collaborators that attach the token to outgoing requests.
    pub fn token_store(&self) -> TokenStoreState {
        Arc::clone(&self.store)
    }
}

/// normalize_token
///
/// Strips what commonly surrounds a token on its way in: whitespace, the quotes of a JSON string
/// body, and an `Authorization`-style `Bearer ` prefix.
pub fn normalize_token(raw: &str) -> String {
    let mut token = raw.trim();
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        token = token[1..token.len() - 1].trim();
    }
    if let Some(rest) = token
        .strip_prefix("Bearer ")
        .or_else(|| token.strip_prefix("bearer "))
    {
        token = rest.trim();
    }
    token.to_string()
}
