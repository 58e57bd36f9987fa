//! Installer spec model
//!
//! An [`InstallerSpec`] is created by parsing and is otherwise treated as a
//! value: resolution returns a new spec so the unresolved form (with
//! `latest` and `X.Y.x` tokens) stays available for storage.

use crate::component::ComponentName;
use crate::fields::{S3_OVERRIDE, VERSION};
use kurl_versions::{ResolutionError, VersionCatalog, VersionResolver, LATEST};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// `apiVersion` written by canonical rendering
pub const API_VERSION: &str = "cluster.kurl.sh/v1beta1";

/// Older `apiVersion` whose disabled add-ons were written with empty versions
pub const LEGACY_API_VERSION: &str = "kurl.sh/v1beta1";

pub const KIND: &str = "Installer";

/// One component's fields, `version` included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSpec {
    fields: Map<String, Value>,
}

impl ComponentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: impl Into<String>) -> Self {
        let mut spec = Self::new();
        spec.set(VERSION, version.into());
        spec
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The version token, when it is a string
    pub fn version(&self) -> Option<&str> {
        self.get_str(VERSION)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// A download override is declared; exact versions are then trusted
    pub fn has_s3_override(&self) -> bool {
        self.fields.contains_key(S3_OVERRIDE)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parsed installer document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallerSpec {
    /// Empty, a generated 7-hex id or a team slug
    pub id: String,
    pub team_id: Option<String>,
    components: BTreeMap<ComponentName, ComponentSpec>,
    /// Top-level keys outside [`ComponentName`], kept so hashing and
    /// rendering stay faithful to the input
    unknown: BTreeMap<String, ComponentSpec>,
}

impl InstallerSpec {
    pub fn new(team_id: Option<String>) -> Self {
        Self {
            team_id,
            ..Default::default()
        }
    }

    /// The installer served at the `latest` URL
    pub fn latest() -> Self {
        let mut spec = Self::new(None);
        spec.id = LATEST.to_string();
        for component in [
            ComponentName::Kubernetes,
            ComponentName::Containerd,
            ComponentName::Weave,
            ComponentName::Longhorn,
            ComponentName::Minio,
            ComponentName::Ekco,
            ComponentName::Contour,
            ComponentName::Registry,
            ComponentName::Prometheus,
        ] {
            spec.insert(component, ComponentSpec::with_version(LATEST));
        }
        spec
    }

    pub fn component(&self, name: ComponentName) -> Option<&ComponentSpec> {
        self.components.get(&name)
    }

    pub fn component_mut(&mut self, name: ComponentName) -> Option<&mut ComponentSpec> {
        self.components.get_mut(&name)
    }

    pub fn has(&self, name: ComponentName) -> bool {
        self.components.contains_key(&name)
    }

    pub fn insert(&mut self, name: ComponentName, spec: ComponentSpec) -> Option<ComponentSpec> {
        self.components.insert(name, spec)
    }

    pub fn remove(&mut self, name: ComponentName) -> Option<ComponentSpec> {
        self.components.remove(&name)
    }

    /// Declared components in render order
    pub fn components(&self) -> impl Iterator<Item = (ComponentName, &ComponentSpec)> {
        self.components.iter().map(|(name, spec)| (*name, spec))
    }

    /// Undeclared top-level keys, sorted by name
    pub fn unknown_components(&self) -> impl Iterator<Item = (&str, &ComponentSpec)> {
        self.unknown.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub(crate) fn insert_unknown(&mut self, name: String, spec: ComponentSpec) {
        self.unknown.insert(name, spec);
    }

    pub(crate) fn components_mut(&mut self) -> &mut BTreeMap<ComponentName, ComponentSpec> {
        &mut self.components
    }

    pub(crate) fn unknown_mut(&mut self) -> &mut BTreeMap<String, ComponentSpec> {
        &mut self.unknown
    }

    /// Non-empty version token of a component
    pub fn version(&self, name: ComponentName) -> Option<&str> {
        self.component(name)
            .and_then(ComponentSpec::version)
            .filter(|v| !v.is_empty())
    }

    pub fn has_s3_override(&self, name: ComponentName) -> bool {
        self.component(name).is_some_and(ComponentSpec::has_s3_override)
    }

    /// `kurl.installerVersion`, the kURL release the spec is pinned to
    pub fn installer_version(&self) -> Option<&str> {
        self.component(ComponentName::Kurl)
            .and_then(|c| c.get_str("installerVersion"))
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.unknown.is_empty()
    }

    /// Every component is a bare `version: latest`.
    ///
    /// A component carrying any option besides `version` is not latest even
    /// when its version token is, so such specs keep their own id and their
    /// options instead of being mapped to the `latest` installer.
    pub fn is_latest(&self) -> bool {
        !self.components.is_empty()
            && self.unknown.is_empty()
            && self
                .components
                .values()
                .all(|c| c.fields().len() == 1 && c.version() == Some(LATEST))
    }

    /// Same components and fields; id and team are ignored
    pub fn spec_is_equal(&self, other: &InstallerSpec) -> bool {
        self.components == other.components && self.unknown == other.unknown
    }

    /// Copy with every `latest` and `X.Y.x` token replaced by a catalog version.
    ///
    /// Exact versions are kept as written (membership is a validation
    /// concern), as are symbolic tokens of add-ons the catalog does not know.
    pub fn resolve(
        &self,
        catalog: &VersionCatalog,
        resolver: &VersionResolver,
    ) -> Result<InstallerSpec, ResolutionError> {
        let mut resolved = self.clone();

        for (name, spec) in resolved.components.iter_mut() {
            resolve_component(name.as_str(), spec, catalog, resolver)?;
        }
        for (name, spec) in resolved.unknown.iter_mut() {
            resolve_component(name, spec, catalog, resolver)?;
        }

        Ok(resolved)
    }
}

fn resolve_component(
    addon: &str,
    spec: &mut ComponentSpec,
    catalog: &VersionCatalog,
    resolver: &VersionResolver,
) -> Result<(), ResolutionError> {
    let Some(token) = spec.version().filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    if !catalog.has_addon(addon) {
        debug!("{} is not in the catalog, keeping {:?}", addon, token);
        return Ok(());
    }
    if let Some(version) = resolver.resolve(addon, token, catalog, true)? {
        spec.set(VERSION, version);
    }
    Ok(())
}
