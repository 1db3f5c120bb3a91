//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::coverage::{SyncConfig, DEFAULT_BATCH_SIZE};

/// Configuration for a circulation service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory for the catalog snapshot.
    pub data_dir: PathBuf,

    /// Identifiers per metadata wrangler request.
    pub batch_size: usize,

    /// Timeout for requests to external services.
    pub http_timeout: Duration,

    /// Public URL of this site, sent when registering with the wrangler.
    pub public_url: Option<String>,
}

impl ServiceConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            batch_size: DEFAULT_BATCH_SIZE,
            http_timeout: Duration::from_secs(60),
            public_url: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Sync settings derived from this config.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default().with_batch_size(self.batch_size)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("org", "librarysimplified", "circulation")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".circulation"));

        Self::new(data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = ServiceConfig::new(PathBuf::from("/tmp/circ"))
            .with_batch_size(0)
            .with_http_timeout(Duration::from_secs(5));

        assert_eq!(config.batch_size, 1);
        assert_eq!(config.sync_config().batch_size, 1);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::new(PathBuf::from("data"));
        assert_eq!(config.batch_size, 25);
        assert!(config.public_url.is_none());
    }
}
