//! HTTP client for the metadata wrangler's collection endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::opds::{parse_feed, FeedError, ParsedFeed};
use crate::auth::{integration_url, AuthError, WranglerCredentials};
use crate::model::{Collection, ExternalIntegration};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Got status code {status} from metadata wrangler: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Expected an OPDS feed, got {0}")]
    NotOpdsFeed(String),

    #[error("Could not parse feed: {0}")]
    Feed(#[from] FeedError),

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Raw response from the wrangler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl LookupResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error unless the status is 2xx.
    pub fn ensure_success(self) -> Result<Self, LookupError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(LookupError::UnexpectedStatus {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Parse the body, which must be a successful OPDS feed.
    pub fn into_feed(self) -> Result<ParsedFeed, LookupError> {
        let response = self.ensure_success()?;
        let content_type = response.content_type.clone().unwrap_or_default();
        if !content_type.contains("atom+xml") && !content_type.contains("opds") {
            return Err(LookupError::NotOpdsFeed(if content_type.is_empty() {
                "no content type".to_string()
            } else {
                content_type
            }));
        }
        Ok(parse_feed(&response.body)?)
    }
}

/// Remote operations on a collection at the metadata wrangler.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Whether requests will carry credentials.
    fn authenticated(&self) -> bool;

    async fn lookup(&self, collection: &Collection, urns: &[String]) -> Result<LookupResponse, LookupError>;

    /// Add identifiers to the remote collection.
    async fn register(&self, collection: &Collection, urns: &[String]) -> Result<LookupResponse, LookupError>;

    /// Remove identifiers from the remote collection.
    async fn remove(&self, collection: &Collection, urns: &[String]) -> Result<LookupResponse, LookupError>;

    /// Push an OPDS feed of local metadata.
    async fn add_with_metadata(&self, collection: &Collection, feed: String) -> Result<LookupResponse, LookupError>;
}

/// reqwest-backed [`LookupClient`].
#[derive(Debug, Clone)]
pub struct MetadataWranglerLookup {
    client: Client,
    base_url: String,
    credentials: Option<WranglerCredentials>,
}

#[derive(Deserialize)]
struct RegistrationResponse {
    metadata: RegistrationMetadata,
}

#[derive(Deserialize)]
struct RegistrationMetadata {
    shared_secret: String,
}

impl MetadataWranglerLookup {
    pub fn new(client: Client, base_url: impl Into<String>, credentials: Option<WranglerCredentials>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            credentials,
        }
    }

    /// Build a client from the site's wrangler integration.
    ///
    /// Missing credentials are not an error here; callers that need them
    /// check [`LookupClient::authenticated`].
    pub fn from_integration(integration: &ExternalIntegration, timeout: Duration) -> Result<Self, LookupError> {
        let base_url = integration_url(integration)?;
        let credentials = WranglerCredentials::from_integration(integration).ok();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, base_url, credentials))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &Collection, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection.metadata_identifier(), endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.client_id, Some(&creds.shared_secret)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<LookupResponse, LookupError> {
        let response = self.authorize(request).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        debug!(status, content_type = ?content_type, bytes = body.len(), "Metadata wrangler response");
        Ok(LookupResponse {
            status,
            content_type,
            body,
        })
    }

    fn urn_query(urns: &[String]) -> Vec<(&'static str, &str)> {
        urns.iter().map(|u| ("urn", u.as_str())).collect()
    }

    /// Register this site with the wrangler and return the shared secret.
    ///
    /// Follows the `register` link in the wrangler's root document and
    /// posts the site's public URL to it.
    pub async fn register_site(&self, site_url: &str) -> Result<String, LookupError> {
        let root = self.send(self.client.get(format!("{}/", self.base_url))).await?;
        let feed = root.into_feed()?;
        let register = feed
            .link("register")
            .ok_or_else(|| LookupError::Registration("no register link in root document".to_string()))?;

        let response = self
            .send(self.client.post(&register.href).form(&[("url", site_url)]))
            .await?
            .ensure_success()?;
        let parsed: RegistrationResponse = serde_json::from_str(&response.body)
            .map_err(|e| LookupError::Registration(format!("unreadable response: {}", e)))?;
        Ok(parsed.metadata.shared_secret)
    }
}

#[async_trait]
impl LookupClient for MetadataWranglerLookup {
    fn authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    async fn lookup(&self, collection: &Collection, urns: &[String]) -> Result<LookupResponse, LookupError> {
        let url = self.collection_url(collection, "lookup");
        self.send(self.client.get(url).query(&Self::urn_query(urns))).await
    }

    async fn register(&self, collection: &Collection, urns: &[String]) -> Result<LookupResponse, LookupError> {
        let url = self.collection_url(collection, "add");
        self.send(self.client.post(url).query(&Self::urn_query(urns))).await
    }

    async fn remove(&self, collection: &Collection, urns: &[String]) -> Result<LookupResponse, LookupError> {
        let url = self.collection_url(collection, "remove");
        self.send(self.client.post(url).query(&Self::urn_query(urns))).await
    }

    async fn add_with_metadata(&self, collection: &Collection, feed: String) -> Result<LookupResponse, LookupError> {
        let url = self.collection_url(collection, "add_with_metadata");
        self.send(
            self.client
                .post(url)
                .header(CONTENT_TYPE, super::opds::OPDS_MEDIA_TYPE)
                .body(feed),
        )
        .await
    }
}
