//! JSON Schema validation for installer specs
//!
//! Schemas are data, not code: they live under `schemas/` at the workspace
//! root and are embedded at compile time. Violations are reported in the
//! `<path> must ...` form the public API has always returned, so a message
//! such as `spec/kotsadm must have required property 'version'` stays stable
//! regardless of the validator library's own wording.

use crate::error::{Error, Result};
use jsonschema::Validator;
use regex::Regex;
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, OnceLock};
use tracing::debug;

/// Embedded schema files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../schemas/"]
#[prefix = ""]
struct EmbeddedSchemas;

/// Name of the installer spec schema
pub const INSTALLER_SCHEMA: &str = "installer";

static REQUIRED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"?([^"]+)"? is a required property$"#).expect("required regex is valid")
});
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"is not of types? "?([^"]+)"?$"#).expect("type regex is valid")
});

/// A single schema violation, addressed by JSON pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer of the offending value (empty for the document root)
    pub instance_path: String,

    /// Normalized message (`must have required property 'version'`)
    pub message: String,
}

impl SchemaViolation {
    /// Render with a root label in front of the pointer, e.g. `spec/kubernetes ...`
    pub fn render(&self, root: &str) -> String {
        format!("{}{} {}", root, self.instance_path, self.message)
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Map a validator message onto the stable public wording
fn normalize_message(raw: &str) -> String {
    if let Some(caps) = REQUIRED_RE.captures(raw) {
        return format!("must have required property '{}'", &caps[1]);
    }
    if raw.starts_with("Additional properties are not allowed")
        || raw.contains("do not match any of the regexes")
    {
        return "must NOT have additional properties".to_string();
    }
    if let Some(caps) = TYPE_RE.captures(raw) {
        return format!("must be {}", &caps[1]);
    }
    if raw.contains("is not one of") {
        return "must be equal to one of the allowed values".to_string();
    }
    raw.to_string()
}

/// Schema validator with pre-compiled schemas
#[derive(Debug)]
pub struct SchemaValidator {
    /// Compiled schemas by name
    schemas: HashMap<String, Validator>,
}

/// Global schema validator instance
static VALIDATOR: OnceLock<SchemaValidator> = OnceLock::new();

impl SchemaValidator {
    /// Create a new schema validator with embedded schemas
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();

        for file in EmbeddedSchemas::iter() {
            if !file.ends_with(".schema.json") {
                continue;
            }
            let name = file.trim_end_matches(".schema.json").to_string();
            debug!("Loading embedded schema: {}", name);

            if let Some(content) = EmbeddedSchemas::get(&file) {
                let json_str = std::str::from_utf8(&content.data).map_err(|_| {
                    Error::invalid_config(format!("Invalid UTF-8 in schema: {}", file))
                })?;
                let schema_value: Value = serde_json::from_str(json_str)?;
                schemas.insert(name.clone(), Self::compile(&name, &schema_value)?);
            }
        }

        if schemas.is_empty() {
            return Err(Error::schema_not_found("no embedded schemas"));
        }

        Ok(Self { schemas })
    }

    /// Load from an external schema directory (for development)
    pub fn from_directory(path: &std::path::Path) -> Result<Self> {
        let mut schemas = HashMap::new();

        if path.is_dir() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if !file_path.extension().is_some_and(|e| e == "json") {
                    continue;
                }
                if let Some(stem) = file_path.file_stem() {
                    let name = stem.to_string_lossy().trim_end_matches(".schema").to_string();
                    debug!("Loading schema from file: {:?}", file_path);

                    let content = std::fs::read_to_string(&file_path)?;
                    let schema_value: Value = serde_json::from_str(&content)?;
                    schemas.insert(name.clone(), Self::compile(&name, &schema_value)?);
                }
            }
        }

        if schemas.is_empty() {
            return Err(Error::schema_not_found(format!(
                "No schemas found in {:?}",
                path
            )));
        }

        Ok(Self { schemas })
    }

    fn compile(name: &str, schema: &Value) -> Result<Validator> {
        jsonschema::validator_for(schema).map_err(|e| {
            Error::invalid_config(format!("Failed to compile schema {}: {}", name, e))
        })
    }

    /// Get the global validator instance
    pub fn global() -> Result<&'static SchemaValidator> {
        if let Some(validator) = VALIDATOR.get() {
            return Ok(validator);
        }
        let validator = SchemaValidator::new()?;
        Ok(VALIDATOR.get_or_init(|| validator))
    }

    /// All violations of `value` against the named schema, in validator order
    pub fn violations(&self, value: &Value, schema_name: &str) -> Result<Vec<SchemaViolation>> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| Error::schema_not_found(schema_name))?;

        Ok(schema
            .iter_errors(value)
            .map(|e| SchemaViolation {
                instance_path: e.instance_path().to_string(),
                message: normalize_message(&e.to_string()),
            })
            .collect())
    }

    /// Validate JSON value against a schema
    pub fn validate(&self, value: &Value, schema_name: &str) -> Result<()> {
        let errors: Vec<String> = self
            .violations(value, schema_name)?
            .iter()
            .map(|v| format!("  - {}", v))
            .collect();

        if !errors.is_empty() {
            return Err(Error::schema_validation(errors));
        }

        Ok(())
    }

    /// Validate YAML string against a schema
    pub fn validate_yaml(&self, yaml: &str, schema_name: &str) -> Result<()> {
        let value: Value = serde_yaml_ng::from_str(yaml)?;
        self.validate(&value, schema_name)
    }

    /// Check if a schema exists
    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// List available schemas
    pub fn list_schemas(&self) -> Vec<&str> {
        self.schemas.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn first(value: Value) -> Option<String> {
        let validator = SchemaValidator::global().unwrap();
        validator
            .violations(&value, INSTALLER_SCHEMA)
            .unwrap()
            .first()
            .map(|v| v.render("spec"))
    }

    #[test]
    fn test_installer_schema_embedded() {
        let validator = SchemaValidator::new().unwrap();
        assert!(validator.has_schema(INSTALLER_SCHEMA));
        assert!(validator.list_schemas().contains(&INSTALLER_SCHEMA));
    }

    #[test]
    fn test_minimal_spec_is_valid() {
        let validator = SchemaValidator::global().unwrap();
        let spec = json!({ "kubernetes": { "version": "1.19.16" } });
        assert!(validator.validate(&spec, INSTALLER_SCHEMA).is_ok());
    }

    #[test]
    fn test_missing_required_version() {
        assert_eq!(
            first(json!({ "kotsadm": { "applicationSlug": "sentry" } })).as_deref(),
            Some("spec/kotsadm must have required property 'version'")
        );
    }

    #[test]
    fn test_missing_helmfile_spec() {
        assert_eq!(
            first(json!({ "helm": { "additionalImages": ["nginx"] } })).as_deref(),
            Some("spec/helm must have required property 'helmfileSpec'")
        );
    }

    #[test]
    fn test_additional_properties_rejected() {
        assert_eq!(
            first(json!({ "kubernetes": { "version": "1.19.16", "unknownField": true } }))
                .as_deref(),
            Some("spec/kubernetes must NOT have additional properties")
        );
    }

    #[test]
    fn test_wrong_type() {
        let message = first(json!({ "kubernetes": { "version": "1.19.16", "HACluster": "yes" } }))
            .unwrap();
        assert_eq!(message, "spec/kubernetes/HACluster must be boolean");
    }

    #[test]
    fn test_ekco_allows_extra_fields() {
        assert!(first(json!({ "ekco": { "version": "0.26.3", "futureOption": 1 } })).is_none());
    }

    #[test]
    fn test_validate_yaml_invalid_syntax() {
        let validator = SchemaValidator::global().unwrap();
        let result = validator.validate_yaml(":::\n  invalid: [[[yaml", INSTALLER_SCHEMA);
        assert!(matches!(result, Err(Error::YamlParse(_))));
    }

    #[test]
    fn test_validate_nonexistent_schema() {
        let validator = SchemaValidator::global().unwrap();
        let err = validator
            .validate(&json!({}), "nonexistent-schema")
            .unwrap_err();
        assert!(matches!(err, Error::SchemaNotFound { .. }));
        assert!(err.to_string().contains("nonexistent-schema"));
    }

    #[test]
    fn test_from_directory_empty_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        match SchemaValidator::from_directory(temp_dir.path()) {
            Err(Error::SchemaNotFound { .. }) => {}
            Err(other) => panic!("Expected SchemaNotFound, got: {:?}", other),
            Ok(_) => panic!("Expected error, got Ok"),
        }
    }

    #[test]
    fn test_from_directory_loads_schema() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("mini.schema.json"),
            r#"{"type":"object","required":["name"]}"#,
        )
        .unwrap();
        let validator = SchemaValidator::from_directory(temp_dir.path()).unwrap();
        assert!(validator.has_schema("mini"));
        assert!(validator.validate(&json!({}), "mini").is_err());
    }

    #[test]
    fn test_normalize_passthrough() {
        assert_eq!(normalize_message("something odd"), "something odd");
    }
}
