//! Request-scoped identity.
//!
//! The hosted auth provider issues bearer tokens; an [`IdentityProvider`]
//! turns one into a user id. Client-supplied user ids are never trusted on
//! their own: handlers compare them against the resolved [`SessionUser`].

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod extract;
pub mod jwt;

pub use extract::SessionUser;
pub use jwt::JwtIdentityProvider;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingToken,

    #[error("Invalid authorization format, expected 'Bearer <token>'")]
    MalformedHeader,

    #[error("Invalid or expired session")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Fixed token table. Used by tests and local runs without an auth provider.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    sessions: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, user_id: Uuid) -> Self {
        self.sessions.insert(
            token.into(),
            Identity {
                user_id,
                email: None,
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.sessions
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
