// src/application/session.rs
use crate::domain::{DomainError, Session, UserIdentity};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Authentication boundary: owns sign-in and sign-out
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, DomainError>;

    async fn sign_in(&self, user: UserIdentity) -> Result<Session, DomainError>;

    async fn sign_out(&self) -> Result<(), DomainError>;
}

/// Blocks access to notes until a session exists
pub struct AuthGate<P: SessionProvider> {
    provider: Arc<P>,
}

impl<P: SessionProvider + 'static> AuthGate<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Sign-out capability handed to views opened behind the gate
    pub fn session_provider(&self) -> Arc<dyn SessionProvider> {
        self.provider.clone()
    }

    pub async fn require(&self) -> Result<Session, DomainError> {
        match self.provider.current_session().await? {
            Some(session) => {
                debug!(user = %session.user, "Session found");
                Ok(session)
            }
            None => Err(DomainError::NotSignedIn),
        }
    }

    pub async fn sign_in(&self, username: &str) -> Result<Session, DomainError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::InvalidUsername(
                "username must not be empty".to_string(),
            ));
        }
        self.provider.sign_in(UserIdentity::new(username)).await
    }

    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.provider.sign_out().await
    }
}
