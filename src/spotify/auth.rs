use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::Mutex;

use crate::{
    config,
    error::AuthError,
    info,
    management::{ClientCredentials, TokenSession},
    server::start_api_server,
    success,
    types::{PkceToken, TokenGrant},
    utils, warning,
};

/// How long the login flow waits for the browser to come back.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(180);

/// The accounts-service operations a [`TokenSession`] depends on.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, AuthError>;

    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenGrant, AuthError>;
}

/// HTTP client for `POST /api/token`.
///
/// With a client secret the request carries HTTP Basic client authentication;
/// without one it is sent as a PKCE public client with `client_id` in the form.
pub struct SpotifyAccounts {
    client: Client,
    token_url: String,
}

impl SpotifyAccounts {
    pub fn new(token_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            token_url: token_url.into(),
        })
    }

    async fn post_form(
        &self,
        credentials: &ClientCredentials,
        mut form: Vec<(&str, String)>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.post(&self.token_url);
        match &credentials.client_secret {
            Some(secret) => {
                request = request.header(
                    reqwest::header::AUTHORIZATION,
                    utils::basic_auth_value(&credentials.client_id, secret),
                );
            }
            None => form.push(("client_id", credentials.client_id.clone())),
        }

        request.form(&form).send().await
    }
}

#[async_trait]
impl TokenEndpoint for SpotifyAccounts {
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, AuthError> {
        let form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("code_verifier", code_verifier.to_string()),
        ];

        let response = self
            .post_form(credentials, form)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("{}: {}", status, body)));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))
    }

    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenGrant, AuthError> {
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];

        let response = self
            .post_form(credentials, form)
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        match response.status() {
            // invalid_grant: the refresh token was revoked or already rotated away
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::AuthRequired),
            status if !status.is_success() => {
                Err(AuthError::RefreshFailed(format!("token endpoint returned {}", status)))
            }
            _ => response
                .json::<TokenGrant>()
                .await
                .map_err(|e| AuthError::RefreshFailed(e.to_string())),
        }
    }
}

/// Builds the `/authorize` URL for the authorization-code flow with PKCE.
///
/// The scope comes from [`config::spotify_scope`]. `show_dialog=true` makes
/// Spotify ask again even when the user approved the app before, so a second
/// account can be picked.
///
/// # Arguments
///
/// * `client_id` - Client id of the registered application
/// * `redirect_uri` - Must match the URI registered in the Spotify dashboard
/// * `code_challenge` - S256 challenge of the verifier kept for the exchange
/// * `state` - Random value the callback has to echo back
///
/// # Returns
///
/// - `Ok(Url)` - The URL to open in the browser
/// - `Err(AuthError::Exchange)` - The configured authorize URL is malformed
pub fn authorize_url(
    client_id: &str,
    redirect_uri: &str,
    code_challenge: &str,
    state: &str,
) -> Result<Url, AuthError> {
    let scope = config::spotify_scope();
    Url::parse_with_params(
        &config::spotify_apiauth_url(),
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
            ("state", state),
            ("scope", scope.as_str()),
            ("show_dialog", "true"),
        ],
    )
    .map_err(|e| AuthError::Exchange(format!("invalid authorize URL: {}", e)))
}

/// Runs the interactive login and stores the resulting tokens in `session`.
///
/// 1. Generates a PKCE verifier/challenge pair and a random `state`
/// 2. Starts the local callback server
/// 3. Opens the authorization URL in the browser (or prints it)
/// 4. Waits for the callback to deliver the authorization code
/// 5. Exchanges the code and stores the grant, which moves the session to `Valid`
///
/// # Arguments
///
/// * `session` - Session that receives the grant; it is persisted through the
///   session's credential store
/// * `shared_state` - Slot shared with the `/callback` handler
///
/// # Returns
///
/// - `Ok(())` - Logged in
/// - `Err(AuthError::Exchange)` - The user denied access, the wait timed out
///   after three minutes or the code exchange failed
/// - `Err(AuthError::Store)` - The tokens could not be written to disk
///
/// # Example
///
/// ```
/// let session = cli::new_session();
/// let shared_state = Arc::new(Mutex::new(None));
/// spotify::auth::login(&session, shared_state).await?;
/// ```
pub async fn login(
    session: &TokenSession,
    shared_state: Arc<Mutex<Option<PkceToken>>>,
) -> Result<(), AuthError> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let state = utils::generate_code_verifier()[..32].to_string();
    let redirect_uri = config::spotify_redirect_uri();

    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier: code_verifier.clone(),
            state: state.clone(),
            code: None,
            denied: None,
        });
    }

    let server_state = Arc::clone(&shared_state);
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = authorize_url(
        &session.credentials().client_id,
        &redirect_uri,
        &code_challenge,
        &state,
    )?;

    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    } else {
        info!("Waiting for Spotify authorization in the browser...");
    }

    let outcome = wait_for_code(Arc::clone(&shared_state)).await;
    server.abort();

    let code = match outcome {
        Some(Ok(code)) => code,
        Some(Err(reason)) => {
            return Err(AuthError::Exchange(format!("authorization denied: {}", reason)));
        }
        None => return Err(AuthError::Exchange("timed out waiting for login".to_string())),
    };

    let grant = session
        .endpoint()
        .exchange_code(session.credentials(), &code, &redirect_uri, &code_verifier)
        .await?;
    session.store_grant(grant).await?;

    success!("Authentication successful!");
    Ok(())
}

/// Polls the shared state until the callback delivered a code or a denial.
async fn wait_for_code(
    shared_state: Arc<Mutex<Option<PkceToken>>>,
) -> Option<Result<String, String>> {
    let start = tokio::time::Instant::now();

    while start.elapsed() < LOGIN_TIMEOUT {
        {
            let lock = shared_state.lock().await;
            if let Some(pkce) = lock.as_ref() {
                if let Some(reason) = &pkce.denied {
                    return Some(Err(reason.clone()));
                }
                if let Some(code) = &pkce.code {
                    return Some(Ok(code.clone()));
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    None
}
