use std::path::PathBuf;

use async_trait::async_trait;

use crate::{config, error::AuthError, types::Token};

/// Where a [`TokenSession`](super::TokenSession) keeps its tokens between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Token>, AuthError>;
    async fn save(&self, token: &Token) -> Result<(), AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
}

/// Stores the token pair as JSON in the local data directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<data dir>/openster/cache/token.json`
    pub fn default_location() -> Self {
        let mut path = config::data_dir();
        path.push("cache/token.json");
        Self::new(path)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Token>, AuthError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Store(e.to_string())),
        };
        let token: Token =
            serde_json::from_str(&content).map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(Some(token))
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
        }

        let json =
            serde_json::to_string_pretty(token).map_err(|e| AuthError::Store(e.to_string()))?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }
}
