use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::{types::PkceToken, warning};

/// Receives the redirect from the Spotify authorization page.
///
/// Only records the outcome; the login flow performs the code exchange.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceToken>>>>,
) -> Html<&'static str> {
    let mut state = shared_state.lock().await;
    let Some(pending) = state.as_mut() else {
        return Html("<h4>No login in progress.</h4>");
    };

    if params.get("state") != Some(&pending.state) {
        warning!("Ignoring OAuth callback with mismatching state");
        return Html("<h4>Login failed: state mismatch.</h4>");
    }

    if let Some(reason) = params.get("error") {
        pending.denied = Some(reason.clone());
        return Html("<h4>Login was cancelled.</h4>");
    }

    match params.get("code") {
        Some(code) => {
            pending.code = Some(code.clone());
            Html("<h2>Authentication successful.</h2><p>You can close this window.</p>")
        }
        None => Html("<h4>Missing authorization code.</h4>"),
    }
}
