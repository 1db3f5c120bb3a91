//! Admin controller for metadata service integrations.
//!
//! Edits are made to a draft copy of the integration. The store is written
//! only once every check has passed, so a rejected submission leaves
//! nothing behind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use super::problem::{
    ProblemDetail, CANNOT_CHANGE_PROTOCOL, DUPLICATE_INTEGRATION, INCOMPLETE_CONFIGURATION,
    INTEGRATION_NAME_ALREADY_IN_USE, MISSING_SERVICE, NO_PROTOCOL_FOR_NEW_SERVICE, NO_SUCH_LIBRARY,
    REMOTE_INTEGRATION_FAILED, UNKNOWN_PROTOCOL,
};
use super::validator::{FieldKind, SettingField, SubmittedContent, Validator};
use crate::coverage::lookup::LookupError;
use crate::coverage::MetadataWranglerLookup;
use crate::model::{ExternalIntegration, Goal, IntegrationId, LibraryId, Protocol};
use crate::store::CatalogStore;

/// Form key listing the libraries a per-library integration belongs to.
pub const LIBRARIES_KEY: &str = "libraries";

const DEFAULT_WRANGLER_URL: &str = "http://metadata.librarysimplified.org/";

/// Registers this site with a metadata wrangler and returns the shared secret.
#[async_trait]
pub trait SiteRegistrar: Send + Sync {
    async fn register(&self, integration: &ExternalIntegration) -> Result<String, LookupError>;
}

/// [`SiteRegistrar`] that talks to the wrangler over HTTP.
#[derive(Debug, Clone)]
pub struct WranglerRegistrar {
    site_url: String,
    timeout: Duration,
}

impl WranglerRegistrar {
    pub fn new(site_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            site_url: site_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SiteRegistrar for WranglerRegistrar {
    async fn register(&self, integration: &ExternalIntegration) -> Result<String, LookupError> {
        let lookup = MetadataWranglerLookup::from_integration(integration, self.timeout)?;
        let secret = lookup.register_site(&self.site_url).await?;
        info!(wrangler = lookup.base_url(), site = %self.site_url, "Registered with the metadata wrangler");
        Ok(secret)
    }
}

/// A protocol as offered to the admin interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolDescription {
    pub name: &'static str,
    pub label: &'static str,
    pub sitewide: bool,
    pub settings: Vec<SettingField>,
}

impl ProtocolDescription {
    pub fn for_protocol(protocol: Protocol) -> Self {
        let settings = match protocol {
            Protocol::Nyt => vec![SettingField::new("password", "API key", FieldKind::Text).required()],
            Protocol::NoveList => vec![
                SettingField::new("username", "Profile", FieldKind::Text).required(),
                SettingField::new("password", "Password", FieldKind::Text).required(),
            ],
            Protocol::MetadataWrangler => vec![SettingField::new(
                "url",
                "URL",
                FieldKind::Url { allowed: vec![] },
            )
            .required()],
        };
        Self {
            name: protocol.as_str(),
            label: protocol.label(),
            sitewide: protocol.sitewide(),
            settings,
        }
    }
}

/// A configured service as shown to the admin. Passwords are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub id: IntegrationId,
    pub name: Option<String>,
    pub protocol: &'static str,
    pub url: Option<String>,
    pub username: Option<String>,
    pub libraries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataServices {
    pub metadata_services: Vec<ServiceInfo>,
    pub protocols: Vec<ProtocolDescription>,
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    Created(IntegrationId),
    Updated(IntegrationId),
}

impl Saved {
    pub fn id(&self) -> IntegrationId {
        match self {
            Self::Created(id) | Self::Updated(id) => *id,
        }
    }
}

/// An integration being edited, not yet in the store.
struct Draft {
    integration: ExternalIntegration,
    /// Id of the stored integration, `None` for a new one.
    existing: Option<IntegrationId>,
}

pub struct MetadataServicesController {
    protocols: Vec<ProtocolDescription>,
    validator: Validator,
    registrar: Option<Arc<dyn SiteRegistrar>>,
}

impl MetadataServicesController {
    pub fn new(registrar: Option<Arc<dyn SiteRegistrar>>) -> Self {
        Self {
            protocols: Protocol::ALL.iter().map(|p| ProtocolDescription::for_protocol(*p)).collect(),
            validator: Validator::new(),
            registrar,
        }
    }

    pub fn protocols(&self) -> &[ProtocolDescription] {
        &self.protocols
    }

    fn description(&self, protocol: Protocol) -> Option<&ProtocolDescription> {
        self.protocols.iter().find(|p| p.name == protocol.as_str())
    }

    /// Every metadata service, with the protocols that can be configured.
    pub fn process_get<S: CatalogStore + ?Sized>(&self, store: &S) -> MetadataServices {
        let libraries = store.libraries();
        let metadata_services = store
            .integrations()
            .into_iter()
            .filter(|i| i.goal == Goal::Metadata)
            .map(|i| ServiceInfo {
                id: i.id,
                name: i.name,
                protocol: i.protocol.as_str(),
                url: i.url,
                username: i.username,
                libraries: i
                    .libraries
                    .iter()
                    .filter_map(|id| libraries.iter().find(|l| l.id == *id))
                    .map(|l| l.short_name.clone())
                    .collect(),
            })
            .collect();

        MetadataServices {
            metadata_services,
            protocols: self.protocols.clone(),
        }
    }

    /// Create or edit a metadata service.
    pub async fn process_post<S: CatalogStore + ?Sized>(
        &self,
        store: &mut S,
        content: &SubmittedContent,
    ) -> Result<Saved, ProblemDetail> {
        let form = &content.form;
        let name = form.get("name").unwrap_or_default().trim().to_string();
        let protocol = self.validate_form_fields(&name, form.get("protocol"))?;

        let mut draft = match form.get("id").filter(|id| !id.is_empty()) {
            Some(id) => self.look_up_service_by_id(&*store, id, protocol)?,
            None => self.new_service(&*store, protocol)?,
        };

        self.check_name_unique(&*store, &draft, &name)?;
        self.set_protocol_settings(&*store, &mut draft, protocol, content)?;
        self.register_with_metadata_wrangler(&mut draft).await?;
        draft.integration.name = Some(name);

        let saved = match draft.existing {
            Some(id) => Saved::Updated(id),
            None => {
                let id = store.next_integration_id();
                draft.integration.id = id;
                Saved::Created(id)
            }
        };
        store.save_integration(draft.integration)?;
        store.commit()?;

        info!(id = %saved.id(), protocol = %protocol, created = matches!(saved, Saved::Created(_)), "Saved metadata service");
        Ok(saved)
    }

    /// Name and protocol are required, and the protocol must be one we know.
    fn validate_form_fields(&self, name: &str, protocol: Option<&str>) -> Result<Protocol, ProblemDetail> {
        if name.is_empty() {
            return Err(INCOMPLETE_CONFIGURATION);
        }
        let protocol = protocol.filter(|p| !p.is_empty()).ok_or(NO_PROTOCOL_FOR_NEW_SERVICE)?;
        protocol.parse::<Protocol>().map_err(|_| UNKNOWN_PROTOCOL)
    }

    fn look_up_service_by_id<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        protocol: Protocol,
    ) -> Result<Draft, ProblemDetail> {
        let id = id.trim().parse::<u64>().map(IntegrationId).map_err(|_| MISSING_SERVICE)?;
        let integration = store
            .integration(id)
            .ok()
            .filter(|i| i.goal == Goal::Metadata)
            .ok_or(MISSING_SERVICE)?;
        if integration.protocol != protocol {
            return Err(CANNOT_CHANGE_PROTOCOL);
        }
        Ok(Draft {
            integration,
            existing: Some(id),
        })
    }

    fn new_service<S: CatalogStore + ?Sized>(&self, store: &S, protocol: Protocol) -> Result<Draft, ProblemDetail> {
        if protocol.sitewide()
            && store
                .integrations()
                .iter()
                .any(|i| i.protocol == protocol && i.goal == Goal::Metadata)
        {
            return Err(DUPLICATE_INTEGRATION.detailed(format!(
                "A {} integration already exists. There can be only one.",
                protocol.label()
            )));
        }
        // The real id is assigned when the draft is saved.
        Ok(Draft {
            integration: ExternalIntegration::new(IntegrationId(0), protocol, Goal::Metadata),
            existing: None,
        })
    }

    fn check_name_unique<S: CatalogStore + ?Sized>(&self, store: &S, draft: &Draft, name: &str) -> Result<(), ProblemDetail> {
        let taken = store
            .integrations()
            .iter()
            .any(|i| i.name.as_deref() == Some(name) && Some(i.id) != draft.existing);
        if taken {
            return Err(INTEGRATION_NAME_ALREADY_IN_USE);
        }
        Ok(())
    }

    /// Validate the submitted settings and copy them onto the draft.
    fn set_protocol_settings<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        draft: &mut Draft,
        protocol: Protocol,
        content: &SubmittedContent,
    ) -> Result<(), ProblemDetail> {
        let description = self.description(protocol).ok_or(UNKNOWN_PROTOCOL)?;
        self.validator.validate(&description.settings, content)?;

        let integration = &mut draft.integration;
        for field in &description.settings {
            let value = content.form.get(&field.key).map(str::trim).filter(|v| !v.is_empty());
            let value = match (value, field.key.as_str()) {
                (None, "url") if protocol == Protocol::MetadataWrangler => Some(DEFAULT_WRANGLER_URL),
                (value, _) => value,
            };
            if value.is_none() && field.required {
                return Err(INCOMPLETE_CONFIGURATION.detailed(format!("Required field '{}' is missing.", field.label)));
            }
            let value = value.map(str::to_string);
            match field.key.as_str() {
                "url" => integration.url = value,
                "username" => integration.username = value,
                "password" => integration.password = value,
                key => match value {
                    Some(v) => {
                        integration.settings.insert(key.to_string(), v);
                    }
                    None => {
                        integration.settings.remove(key);
                    }
                },
            }
        }

        if protocol.per_library() {
            integration.libraries = self.libraries_from_form(store, content)?;
        }
        Ok(())
    }

    fn libraries_from_form<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        content: &SubmittedContent,
    ) -> Result<Vec<LibraryId>, ProblemDetail> {
        let mut libraries = Vec::new();
        for short_name in content.form.getlist(LIBRARIES_KEY).into_iter().filter(|s| !s.is_empty()) {
            let library = store.library_by_short_name(short_name).map_err(|_| {
                NO_SUCH_LIBRARY.detailed(format!(
                    "You attempted to add the integration to {}, but it does not exist.",
                    short_name
                ))
            })?;
            if !libraries.contains(&library.id) {
                libraries.push(library.id);
            }
        }
        Ok(libraries)
    }

    /// New wrangler integrations, and ones without a secret, register the site.
    async fn register_with_metadata_wrangler(&self, draft: &mut Draft) -> Result<(), ProblemDetail> {
        let integration = &mut draft.integration;
        if integration.protocol != Protocol::MetadataWrangler
            || (draft.existing.is_some() && integration.password.as_deref().is_some_and(|p| !p.is_empty()))
        {
            return Ok(());
        }

        let registrar = self.registrar.as_ref().ok_or_else(|| {
            REMOTE_INTEGRATION_FAILED.detailed("This site has no public URL to register with the metadata wrangler.")
        })?;
        match registrar.register(integration).await {
            Ok(secret) => {
                integration.password = Some(secret);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Metadata wrangler registration failed");
                Err(REMOTE_INTEGRATION_FAILED.detailed(e.to_string()))
            }
        }
    }

    /// Delete a metadata service.
    pub fn process_delete<S: CatalogStore + ?Sized>(&self, store: &mut S, id: IntegrationId) -> Result<(), ProblemDetail> {
        let integration = store
            .integration(id)
            .ok()
            .filter(|i| i.goal == Goal::Metadata)
            .ok_or(MISSING_SERVICE)?;
        store.delete_integration(integration.id)?;
        store.commit()?;
        info!(id = %id, protocol = %integration.protocol, "Deleted metadata service");
        Ok(())
    }
}
