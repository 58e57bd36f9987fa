//! YAML to [`InstallerSpec`]
//!
//! Parsing is a pure function of the document and the optional team id.
//! Renamed fields from older documents are migrated here so that hashing
//! only ever sees current field names.

use crate::component::ComponentName;
use crate::error::ParseError;
use crate::fields::VERSION;
use crate::hash::js_string;
use crate::spec::{ComponentSpec, InstallerSpec, LEGACY_API_VERSION};
use serde_json::Value;
use tracing::debug;

/// Add-ons that older documents disabled by leaving the version empty
const LEGACY_DISABLED_ADDONS: [ComponentName; 7] = [
    ComponentName::Docker,
    ComponentName::Weave,
    ComponentName::Rook,
    ComponentName::Contour,
    ComponentName::Registry,
    ComponentName::Prometheus,
    ComponentName::Kotsadm,
];

impl InstallerSpec {
    /// Parse an installer document.
    ///
    /// The document must be a mapping. A missing or null `spec` yields a spec
    /// with no components; null components are treated as absent, and
    /// components whose `version` is the empty string are dropped.
    pub fn parse(yaml: &str, team_id: Option<&str>) -> Result<InstallerSpec, ParseError> {
        let doc: Value = serde_yaml_ng::from_str(yaml)?;
        let Value::Object(root) = doc else {
            return Err(ParseError::not_a_mapping("document"));
        };

        let mut installer = InstallerSpec::new(team_id.map(str::to_string));
        installer.id = root
            .get("metadata")
            .and_then(|m| m.get("name"))
            .filter(|name| !name.is_null() && !name.is_object() && !name.is_array())
            .map(js_string)
            .unwrap_or_default();

        let spec = match root.get("spec") {
            None | Some(Value::Null) => return Ok(installer),
            Some(Value::Object(spec)) => spec,
            Some(_) => return Err(ParseError::not_a_mapping("spec")),
        };

        for (key, value) in spec {
            let fields = match value {
                Value::Null => {
                    debug!("Ignoring empty component {}", key);
                    continue;
                }
                Value::Object(fields) => fields.clone(),
                _ => return Err(ParseError::not_a_mapping(format!("spec.{}", key))),
            };
            let component = ComponentSpec::from_fields(fields);
            match ComponentName::from_key(key) {
                Some(name) => {
                    installer.insert(name, component);
                }
                None => {
                    debug!("Keeping undeclared component {}", key);
                    installer.insert_unknown(key.clone(), component);
                }
            }
        }

        convert_legacy_fields(&mut installer);

        if let Some(collectd) = installer.component_mut(ComponentName::Collectd) {
            if collectd.version() == Some("0.0.1") {
                collectd.set(VERSION, "v5");
            }
        }

        if root.get("apiVersion").and_then(Value::as_str) == Some(LEGACY_API_VERSION) {
            migrate_v1beta1(&mut installer);
        }

        drop_unset_components(&mut installer);

        Ok(installer)
    }
}

/// JavaScript-style truthiness, matching how older documents were read
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Move `old` to `new` when `old` is set and `new` is not; `old` is removed
/// whenever it was set
fn rename_field(component: &mut ComponentSpec, old: &str, new: &str) {
    if !truthy(component.get(old)) {
        return;
    }
    if let Some(value) = component.remove(old) {
        if !truthy(component.get(new)) {
            component.set(new, value);
        }
    }
}

fn convert_legacy_fields(installer: &mut InstallerSpec) {
    if let Some(weave) = installer.component_mut(ComponentName::Weave) {
        if let Some(encrypt) = weave.remove("encryptNetwork") {
            if !weave.contains("isEncryptionDisabled") {
                weave.set("isEncryptionDisabled", encrypt != Value::Bool(true));
            }
        }
        rename_field(weave, "IPAllocRange", "podCidrRange");
    }
    if let Some(fluentd) = installer.component_mut(ComponentName::Fluentd) {
        rename_field(fluentd, "efkStack", "fullEFKStack");
    }
    if let Some(rook) = installer.component_mut(ComponentName::Rook) {
        rename_field(rook, "storageClass", "storageClassName");
        rename_field(rook, "cephPoolReplicas", "cephReplicaCount");
    }
}

fn migrate_v1beta1(installer: &mut InstallerSpec) {
    for name in LEGACY_DISABLED_ADDONS {
        let disabled = installer
            .component(name)
            .is_some_and(|c| !truthy(c.get(VERSION)));
        if disabled {
            debug!("Dropping disabled {} from {} document", name, LEGACY_API_VERSION);
            installer.remove(name);
        }
    }
}

fn drop_unset_components(installer: &mut InstallerSpec) {
    let unset = |c: &ComponentSpec| c.version() == Some("");
    installer.components_mut().retain(|_, c| !unset(c));
    installer.unknown_mut().retain(|_, c| !unset(c));
}
