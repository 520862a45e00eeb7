use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{error, spotify, success, types::PkceToken, warning};

use super::new_session;

pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) {
    let session = new_session();
    if let Err(e) = session.restore().await {
        warning!("Ignoring unreadable stored token: {}", e);
    }

    if let Err(e) = spotify::auth::login(&session, shared_state).await {
        error!("Authentication failed: {}", e);
    }
}

pub async fn logout() {
    let session = new_session();
    match session.logout().await {
        Ok(()) => success!("Logged out. Stored Spotify credentials removed."),
        Err(e) => {
            error!("Failed to remove stored credentials: {}", e);
        }
    }
}
