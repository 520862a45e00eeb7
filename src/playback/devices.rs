use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{
    error::PlaybackError,
    management::TokenSession,
    spotify::PlaybackApi,
    types::Device,
    warning,
};

/// Live view on the user's playback devices. Nothing is cached: every call
/// is a fresh query.
pub struct DeviceRegistry {
    api: Arc<dyn PlaybackApi>,
    session: Arc<TokenSession>,
}

impl DeviceRegistry {
    pub fn new(api: Arc<dyn PlaybackApi>, session: Arc<TokenSession>) -> Self {
        Self { api, session }
    }

    pub async fn list_devices(&self) -> Result<Vec<Device>, PlaybackError> {
        let token = self.session.get_valid_access_token().await?;
        Ok(self.api.list_devices(&token).await?)
    }

    /// Polls until at least one device shows up, at most `max_attempts` times
    /// with `delay` between attempts. Returns an empty list when none did.
    ///
    /// A failed poll counts as an empty one. Only a session that needs a new
    /// login ends the wait early.
    pub async fn wait_for_device(
        &self,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<Vec<Device>, PlaybackError> {
        for attempt in 1..=max_attempts {
            match self.list_devices().await {
                Ok(devices) if !devices.is_empty() => return Ok(devices),
                Ok(_) => {}
                Err(PlaybackError::Auth(e)) if e.requires_login() => {
                    return Err(PlaybackError::Auth(e));
                }
                Err(e) => warning!("Device poll {} failed: {}", attempt, e),
            }

            if attempt < max_attempts {
                sleep(delay).await;
            }
        }

        Ok(Vec::new())
    }
}
