//! Installer flag string
//!
//! Only fields present in the spec produce flags, walked in component order
//! and then in field-table order. Strings and numbers render as
//! `flag=value`, booleans as `flag=1` or `flag=0`. Array fields and fields
//! without a flag produce nothing.

use crate::fields::{FieldKind, FieldSpec};
use crate::hash::js_string;
use crate::spec::{ComponentSpec, InstallerSpec};
use serde_json::Value;

impl InstallerSpec {
    /// Space-separated `key=value` flags for the shell installers
    pub fn flags(&self) -> String {
        self.components()
            .flat_map(|(name, spec)| component_flags(name.fields(), spec))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn component_flags(fields: &'static [FieldSpec], spec: &ComponentSpec) -> Vec<String> {
    let mut flags = Vec::new();
    for field in fields {
        let Some(flag) = field.flag else {
            continue;
        };
        let Some(value) = spec.get(field.name).filter(|v| !v.is_null()) else {
            continue;
        };
        match field.kind {
            FieldKind::String | FieldKind::Number => {
                flags.push(format!("{}={}", flag, js_string(value)));
            }
            FieldKind::Boolean => {
                let on = match value {
                    Value::Bool(b) => *b,
                    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                    Value::String(s) => !s.is_empty(),
                    Value::Array(_) | Value::Object(_) => true,
                    Value::Null => false,
                };
                flags.push(format!("{}={}", flag, u8::from(on)));
            }
            FieldKind::Array | FieldKind::Object => {}
        }
    }
    flags
}
