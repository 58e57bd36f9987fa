//! Installer service flows
//!
//! The request-level operations a front end exposes: anonymous creation,
//! team upsert, validation and lookup. Transport concerns (routing, auth
//! token decoding, content negotiation) stay with the caller; an
//! authenticated caller passes the decoded team id.

use crate::component::ComponentName;
use crate::error::{Error, Result};
use crate::ids::{is_sha, is_valid_slug, slug_is_reserved};
use crate::spec::InstallerSpec;
use crate::store::{InstallerStore, UpsertOutcome};
use crate::validate::{ValidationContext, ValidationPolicy};
use kurl_core::SchemaValidator;
use kurl_versions::{CatalogProvider, StrategyTable, VersionResolver, LATEST};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a create or put
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedInstaller {
    pub id: String,
    /// Public URL of the installer
    pub url: String,
    /// `None` when nothing was written (the canonical latest installer)
    pub outcome: Option<UpsertOutcome>,
}

/// Installer operations over a store and a catalog
pub struct InstallerService {
    store: Arc<dyn InstallerStore>,
    catalog: Arc<dyn CatalogProvider>,
    resolver: VersionResolver,
    schema: &'static SchemaValidator,
    base_url: String,
    policy: ValidationPolicy,
}

impl InstallerService {
    /// Service with the built-in strategies and the embedded schema
    pub fn new(
        store: Arc<dyn InstallerStore>,
        catalog: Arc<dyn CatalogProvider>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            catalog,
            resolver: VersionResolver::new(StrategyTable::builtin()),
            schema: SchemaValidator::global()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: ValidationPolicy::default(),
        })
    }

    pub fn with_resolver(mut self, resolver: VersionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    fn url_for(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    /// Validate a parsed spec against the catalog of the kURL release it is
    /// pinned to, or the current snapshot when unpinned
    pub async fn check(&self, spec: &InstallerSpec) -> Result<()> {
        let catalog = self.catalog.catalog_for(spec.installer_version()).await?;
        let ctx = ValidationContext::new(&catalog, &self.resolver, self.schema).with_policy(self.policy);
        let errors = spec.validate(&ctx)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }

    /// Parse and validate a document without storing it
    pub async fn validate(&self, yaml: &str) -> Result<()> {
        let spec = InstallerSpec::parse(yaml, None)?;
        self.check(&spec).await
    }

    /// Store an anonymous installer under its content hash.
    ///
    /// A document where every component is `latest` is not stored; it maps
    /// to the canonical latest URL.
    pub async fn create_anonymous(&self, yaml: &str) -> Result<SavedInstaller> {
        let mut spec = InstallerSpec::parse(yaml, None)?;

        if spec.is_latest() {
            debug!("Document is the latest installer");
            return Ok(SavedInstaller {
                id: LATEST.to_string(),
                url: self.url_for(LATEST),
                outcome: None,
            });
        }

        spec.id = spec.hash();
        self.check(&spec).await?;

        let outcome = self.store.save_anonymous(&spec).await?;
        info!("Anonymous installer {} ({:?})", spec.id, outcome);
        Ok(SavedInstaller {
            url: self.url_for(&spec.id),
            id: spec.id,
            outcome: Some(outcome),
        })
    }

    /// Create or replace a team installer at `id`.
    ///
    /// `slug` is the application slug; it fills `kotsadm.applicationSlug`
    /// when the document leaves it unset.
    pub async fn put_team(
        &self,
        yaml: &str,
        id: &str,
        team_id: Option<&str>,
        slug: Option<&str>,
        skip_validation: bool,
    ) -> Result<SavedInstaller> {
        let team_id = team_id.filter(|t| !t.is_empty()).ok_or(Error::Unauthenticated)?;
        if is_sha(id) {
            return Err(Error::GeneratedIdName);
        }
        if slug_is_reserved(id) {
            return Err(Error::ReservedName);
        }
        if !is_valid_slug(id) {
            return Err(Error::InvalidName);
        }

        let mut spec = InstallerSpec::parse(yaml, Some(team_id))?;
        spec.id = id.to_string();

        if let (Some(kotsadm), Some(slug)) = (
            spec.component_mut(ComponentName::Kotsadm),
            slug.filter(|s| !s.is_empty()),
        ) {
            let unset = kotsadm.get_str("applicationSlug").is_none_or(str::is_empty);
            if unset {
                kotsadm.set("applicationSlug", slug);
            }
        }

        if skip_validation {
            debug!("Skipping validation of {}", id);
        } else {
            self.check(&spec).await?;
        }

        let outcome = self.store.save_team(&spec).await?;
        info!("Team installer {} ({:?})", id, outcome);
        Ok(SavedInstaller {
            id: spec.id,
            url: self.url_for(id),
            outcome: Some(outcome),
        })
    }

    /// Look up an installer, optionally with versions resolved.
    ///
    /// The canonical latest installer is returned with an empty id.
    pub async fn get(&self, id: &str, resolve: bool) -> Result<InstallerSpec> {
        let mut spec = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;

        if resolve {
            let catalog = self.catalog.catalog_for(spec.installer_version()).await?;
            spec = spec.resolve(&catalog, &self.resolver)?;
        }
        if spec.id == LATEST {
            spec.id.clear();
        }
        Ok(spec)
    }

    /// Every add-on's versions with `latest` first
    pub fn versions(&self) -> BTreeMap<String, Vec<String>> {
        self.catalog.current().listing()
    }
}
