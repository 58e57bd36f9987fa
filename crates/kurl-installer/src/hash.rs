//! Content-derived installer ids
//!
//! Legacy fields are fed first in a fixed order so that ids issued before
//! other fields took part in the hash stay valid. Every other
//! `{component}_{field}={value}` entry follows, sorted. Only the first 7 hex
//! characters of the SHA-256 digest are kept, roughly 28 bits, so collisions
//! between unrelated specs are possible and accepted.

use crate::component::ComponentName;
use crate::spec::{ComponentSpec, InstallerSpec};
use serde_json::Value;
use sha2::{Digest, Sha256};

const ID_LEN: usize = 7;

/// Hashed before everything else, in this order, when truthy
const LEGACY_FIELDS: [(ComponentName, &str); 8] = [
    (ComponentName::Kubernetes, "version"),
    (ComponentName::Weave, "version"),
    (ComponentName::Rook, "version"),
    (ComponentName::Contour, "version"),
    (ComponentName::Registry, "version"),
    (ComponentName::Prometheus, "version"),
    (ComponentName::Kotsadm, "version"),
    (ComponentName::Kotsadm, "applicationSlug"),
];

impl InstallerSpec {
    /// 7 lowercase hex characters identifying the spec's content
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();

        for (component, field) in LEGACY_FIELDS {
            let value = self.component(component).and_then(|c| c.get(field));
            if let Some(value) = value.filter(|v| is_truthy(v)) {
                hasher.update(format!("{}_{}={}", component, field, js_string(value)));
            }
        }

        let mut entries: Vec<String> = Vec::new();
        let named = self.components().map(|(name, spec)| (name.as_str(), spec));
        for (name, spec) in named.chain(self.unknown_components()) {
            collect_entries(name, spec, &mut entries);
        }
        entries.sort();
        for entry in &entries {
            hasher.update(entry);
        }

        let digest = format!("{:x}", hasher.finalize());
        digest[..ID_LEN].to_string()
    }
}

fn collect_entries(component: &str, spec: &ComponentSpec, entries: &mut Vec<String>) {
    for (field, value) in spec.fields() {
        let is_legacy = LEGACY_FIELDS
            .iter()
            .any(|(c, f)| c.as_str() == component && *f == field);
        if is_legacy {
            continue;
        }
        entries.push(format!("{}_{}={}", component, field, js_string(value)));
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String form of a value as installers have always hashed and flagged it:
/// integral numbers without a fraction, arrays comma-joined, objects as
/// `[object Object]` wherever they appear.
pub(crate) fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
