//! Canonical YAML rendering
//!
//! Output layout is fixed: `apiVersion`, `kind`, `metadata`, `spec`;
//! components in [`ComponentName`] order followed by undeclared components
//! by name; within a component `version` first, then declared fields in table
//! order, then anything else by name. Versions are always double-quoted.
//! Rendering the parse of a rendered spec yields the same text.

use crate::component::ComponentName;
use crate::fields::VERSION;
use crate::spec::{ComponentSpec, InstallerSpec, API_VERSION, KIND};
use serde_json::{Map, Value};

const INDENT: &str = "  ";

impl InstallerSpec {
    /// Canonical YAML document, as stored and served
    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("apiVersion: {}\n", API_VERSION));
        out.push_str(&format!("kind: {}\n", KIND));
        out.push_str("metadata:\n");
        push_field(&mut out, 1, "name", &Value::String(self.id.clone()));

        if self.is_empty() {
            out.push_str("spec: {}\n");
            return out;
        }

        out.push_str("spec:\n");
        for (name, spec) in self.components() {
            push_component(&mut out, name.as_str(), spec, Some(name));
        }
        for (name, spec) in self.unknown_components() {
            push_component(&mut out, name, spec, None);
        }
        out
    }

    /// The same document as a JSON value
    pub fn to_json(&self) -> Value {
        let mut spec = Map::new();
        let named = self.components().map(|(name, c)| (name.as_str(), c));
        for (name, component) in named.chain(self.unknown_components()) {
            spec.insert(name.to_string(), Value::Object(component.fields().clone()));
        }
        serde_json::json!({
            "apiVersion": API_VERSION,
            "kind": KIND,
            "metadata": { "name": self.id },
            "spec": spec,
        })
    }
}

/// Field names of a component in canonical order
fn ordered_fields<'a>(spec: &'a ComponentSpec, declared: Option<ComponentName>) -> Vec<&'a str> {
    let mut ordered: Vec<&str> = Vec::with_capacity(spec.fields().len());
    if spec.contains(VERSION) {
        ordered.push(VERSION);
    }
    if let Some(component) = declared {
        for field in component.fields() {
            if field.name != VERSION {
                if let Some((key, _)) = spec.fields().get_key_value(field.name) {
                    ordered.push(key.as_str());
                }
            }
        }
    }
    for key in spec.fields().keys() {
        if !ordered.contains(&key.as_str()) {
            ordered.push(key.as_str());
        }
    }
    ordered
}

fn push_component(out: &mut String, name: &str, spec: &ComponentSpec, declared: Option<ComponentName>) {
    let key = scalar(&Value::String(name.to_string()));
    if spec.is_empty() {
        out.push_str(&format!("{}{}: {{}}\n", INDENT, key));
        return;
    }
    out.push_str(&format!("{}{}:\n", INDENT, key));
    for field in ordered_fields(spec, declared) {
        let Some(value) = spec.get(field) else {
            continue;
        };
        if field == VERSION {
            if let Value::String(version) = value {
                out.push_str(&format!("{}{}: {}\n", INDENT.repeat(2), VERSION, quoted(version)));
                continue;
            }
        }
        push_field(out, 2, field, value);
    }
}

fn push_field(out: &mut String, depth: usize, key: &str, value: &Value) {
    let indent = INDENT.repeat(depth);
    let key = scalar(&Value::String(key.to_string()));
    match value {
        Value::Array(items) if items.is_empty() => {
            out.push_str(&format!("{}{}: []\n", indent, key));
        }
        Value::Object(map) if map.is_empty() => {
            out.push_str(&format!("{}{}: {{}}\n", indent, key));
        }
        Value::Array(_) | Value::Object(_) => {
            out.push_str(&format!("{}{}:\n", indent, key));
            let nested = format!("{}{}", indent, INDENT);
            push_lines(out, &nested, &block(value));
        }
        scalar_value => {
            let rendered = scalar(scalar_value);
            let (first, rest) = rendered.split_once('\n').unwrap_or((&rendered, ""));
            out.push_str(&format!("{}{}: {}\n", indent, key, first));
            if !rest.is_empty() {
                push_lines(out, &indent, &format!("{}\n", rest));
            }
        }
    }
}

/// Append newline-terminated `text` with every non-empty line indented
fn push_lines(out: &mut String, indent: &str, text: &str) {
    let text = text.strip_suffix('\n').unwrap_or(text);
    for line in text.split('\n') {
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
        out.push('\n');
    }
}

/// YAML for a single scalar, quoted only where plain style would change its type
fn scalar(value: &Value) -> String {
    serde_yaml_ng::to_string(value)
        .map(|s| s.strip_suffix('\n').map(str::to_string).unwrap_or(s))
        .unwrap_or_else(|_| value.to_string())
}

/// Block YAML for a sequence or mapping, unindented
fn block(value: &Value) -> String {
    serde_yaml_ng::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Double-quoted YAML scalar; JSON string escaping is valid YAML
fn quoted(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> InstallerSpec {
        InstallerSpec::parse(yaml, None).unwrap()
    }

    #[test]
    fn test_minimal_document() {
        let spec = parse("spec:\n  kubernetes:\n    version: 1.15.1\n");
        let yaml = spec.to_yaml();
        assert!(yaml.starts_with("apiVersion: cluster.kurl.sh/v1beta1\nkind: Installer\nmetadata:\n  name: "));
        assert!(yaml.ends_with("\nspec:\n  kubernetes:\n    version: \"1.15.1\"\n"));
    }

    #[test]
    fn test_component_order_is_fixed() {
        let spec = parse(
            "spec:\n  weave:\n    version: latest\n  kotsadm:\n    version: latest\n  kubernetes:\n    version: latest\n",
        );
        let yaml = spec.to_yaml();
        let k = yaml.find("kubernetes:").unwrap();
        let w = yaml.find("weave:").unwrap();
        let o = yaml.find("kotsadm:").unwrap();
        assert!(k < w && w < o);
    }

    #[test]
    fn test_field_order() {
        let spec = parse(
            "spec:\n  contour:\n    httpsPort: 3443\n    httpPort: 3080\n    version: 1.24.1\n",
        );
        let yaml = spec.to_yaml();
        assert!(yaml.contains(
            "  contour:\n    version: \"1.24.1\"\n    httpPort: 3080\n    httpsPort: 3443\n"
        ));
    }

    #[test]
    fn test_generated_id_is_quoted() {
        let mut spec = parse("spec:\n  kubernetes:\n    version: \"1.15.1\"\n");
        spec.id = spec.hash();
        let yaml = spec.to_yaml();
        let reparsed = parse(&yaml);
        assert_eq!(reparsed.id, "6898644");
    }

    #[test]
    fn test_empty_spec() {
        let spec = InstallerSpec::new(None);
        assert!(spec.to_yaml().ends_with("spec: {}\n"));
    }

    #[test]
    fn test_round_trip_rich_fields() {
        let yaml = r#"
metadata:
  name: my-app
spec:
  kubernetes:
    version: 1.19.x
    HACluster: true
  ekco:
    version: latest
    podImageOverrides:
      - quay.io/a=registry.local/a
      - quay.io/b=registry.local/b
  kurl:
    hostPreflights:
      apiVersion: troubleshoot.sh/v1beta2
      kind: HostPreflight
      spec:
        collectors: []
    additionalNoProxyAddresses: []
  helm:
    helmfileSpec: |
      repositories:
        - name: nginx-stable
          url: https://helm.nginx.com/stable
      releases:
        - name: test-nginx-ingress
  flannel:
    version: 0.20.2
"#;
        let spec = parse(yaml);
        let rendered = spec.to_yaml();
        let reparsed = parse(&rendered);
        assert!(reparsed.spec_is_equal(&spec));
        assert_eq!(reparsed.id, "my-app");
        assert_eq!(reparsed.to_yaml(), rendered);
    }

    #[test]
    fn test_to_json() {
        let mut spec = parse("spec:\n  kubernetes:\n    version: \"1.19.16\"\n");
        spec.id = "abc1234".to_string();
        let json = spec.to_json();
        assert_eq!(json["metadata"]["name"], "abc1234");
        assert_eq!(json["spec"]["kubernetes"]["version"], "1.19.16");
    }
}
