//! Credentials for the metadata wrangler.
//!
//! The wrangler identifies a circulation site by a client id and a shared
//! secret. Both live on the site's metadata wrangler integration: the id as
//! its username, the secret as its password or `shared_secret` setting.

use thiserror::Error;

use crate::model::integration::SHARED_SECRET_SETTING;
use crate::model::ExternalIntegration;

/// Auth errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Metadata Wrangler improperly configured: no client ID or shared secret")]
    NotConfigured,

    #[error("Integration {0} has no URL")]
    MissingUrl(String),
}

/// Client credentials presented with every wrangler request.
#[derive(Clone, PartialEq, Eq)]
pub struct WranglerCredentials {
    pub client_id: String,
    pub shared_secret: String,
}

impl std::fmt::Debug for WranglerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WranglerCredentials")
            .field("client_id", &self.client_id)
            .field("shared_secret", &"<redacted>")
            .finish()
    }
}

impl WranglerCredentials {
    /// Read credentials from an integration.
    pub fn from_integration(integration: &ExternalIntegration) -> Result<Self, AuthError> {
        let client_id = integration
            .username
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::NotConfigured)?;
        let shared_secret = integration
            .password
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| integration.setting(SHARED_SECRET_SETTING))
            .ok_or(AuthError::NotConfigured)?;

        Ok(Self {
            client_id: client_id.to_string(),
            shared_secret: shared_secret.to_string(),
        })
    }
}

/// Base URL of an integration, without a trailing slash.
pub fn integration_url(integration: &ExternalIntegration) -> Result<String, AuthError> {
    integration
        .url
        .as_deref()
        .map(|u| u.trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AuthError::MissingUrl(
                integration
                    .name
                    .clone()
                    .unwrap_or_else(|| integration.id.to_string()),
            )
        })
}
