use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    error::AuthError,
    management::CredentialStore,
    spotify::auth::TokenEndpoint,
    types::{Token, TokenGrant},
    warning,
};

/// Seconds before expiry at which a token counts as expiring soon.
pub const EXPIRY_GRACE_SECS: i64 = 60;

/// The registered application's identity at the accounts service.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Valid,
    ExpiringSoon,
    Expired,
}

fn state_of(token: Option<&Token>, now: i64) -> SessionState {
    match token {
        None => SessionState::Unauthenticated,
        Some(t) if now >= t.expires_at => SessionState::Expired,
        Some(t) if now > t.expires_at - EXPIRY_GRACE_SECS => SessionState::ExpiringSoon,
        Some(_) => SessionState::Valid,
    }
}

fn token_from_grant(grant: TokenGrant, previous_refresh: Option<String>) -> Token {
    Token {
        access_token: grant.access_token,
        // Refresh tokens may rotate; keep the old one only when none came back.
        refresh_token: grant.refresh_token.or(previous_refresh),
        scope: grant.scope,
        expires_at: Utc::now().timestamp() + grant.expires_in,
    }
}

/// A user's OAuth session with the streaming service.
///
/// All token access goes through one async mutex, which also makes refreshes
/// exclusive: a caller that waited for a running refresh finds a valid token
/// and returns it without refreshing again.
pub struct TokenSession {
    credentials: ClientCredentials,
    endpoint: Arc<dyn TokenEndpoint>,
    store: Option<Arc<dyn CredentialStore>>,
    token: Mutex<Option<Token>>,
}

impl TokenSession {
    pub fn new(credentials: ClientCredentials, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            credentials,
            endpoint,
            store: None,
            token: Mutex::new(None),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Starts from an already known token, e.g. one handed over by another process.
    pub fn with_token(self, token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            ..self
        }
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &Arc<dyn TokenEndpoint> {
        &self.endpoint
    }

    /// Loads a persisted token from the store. Returns whether one was found.
    pub async fn restore(&self) -> Result<bool, AuthError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let loaded = store.load().await?;
        let found = loaded.is_some();
        *self.token.lock().await = loaded;
        Ok(found)
    }

    /// Stores the result of a successful authorization-code exchange.
    pub async fn store_grant(&self, grant: TokenGrant) -> Result<(), AuthError> {
        let token = token_from_grant(grant, None);
        let mut guard = self.token.lock().await;
        if let Some(store) = &self.store {
            store.save(&token).await?;
        }
        *guard = Some(token);
        Ok(())
    }

    pub async fn state(&self) -> SessionState {
        let guard = self.token.lock().await;
        state_of(guard.as_ref(), Utc::now().timestamp())
    }

    pub async fn has_refresh_token(&self) -> bool {
        let guard = self.token.lock().await;
        guard.as_ref().is_some_and(|t| t.refresh_token.is_some())
    }

    /// Returns an access token that is valid for at least the grace window,
    /// refreshing first when needed.
    pub async fn get_valid_access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.token.lock().await;
        let state = state_of(guard.as_ref(), Utc::now().timestamp());

        match state {
            SessionState::Unauthenticated => Err(AuthError::NotLoggedIn),
            SessionState::Valid => current_access(&guard),
            SessionState::ExpiringSoon | SessionState::Expired => {
                let can_refresh = guard.as_ref().is_some_and(|t| t.refresh_token.is_some());
                if !can_refresh {
                    return match state {
                        // Still usable for a few more seconds.
                        SessionState::ExpiringSoon => current_access(&guard),
                        _ => Err(AuthError::AuthRequired),
                    };
                }
                self.refresh_locked(&mut guard).await?;
                current_access(&guard)
            }
        }
    }

    /// Exchanges the refresh token for a new access token, regardless of expiry.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let mut guard = self.token.lock().await;
        self.refresh_locked(&mut guard).await
    }

    async fn refresh_locked(&self, slot: &mut Option<Token>) -> Result<(), AuthError> {
        let refresh_token = match slot.as_ref() {
            None => return Err(AuthError::NotLoggedIn),
            Some(t) => t.refresh_token.clone().ok_or(AuthError::AuthRequired)?,
        };

        let grant = self
            .endpoint
            .refresh(&self.credentials, &refresh_token)
            .await?;
        let token = token_from_grant(grant, Some(refresh_token));

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&token).await {
                warning!("Refreshed token could not be saved: {}", e);
            }
        }
        *slot = Some(token);
        Ok(())
    }

    /// Forgets every credential, in memory and in the store.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let mut guard = self.token.lock().await;
        *guard = None;
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        Ok(())
    }
}

fn current_access(slot: &Option<Token>) -> Result<String, AuthError> {
    slot.as_ref()
        .map(|t| t.access_token.clone())
        .ok_or(AuthError::NotLoggedIn)
}
