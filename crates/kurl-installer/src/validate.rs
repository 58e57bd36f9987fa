//! Installer validation
//!
//! Checks run in four buckets, in order:
//! 1. distribution: a Kubernetes distribution is declared, and only one
//! 2. resolution: every declared version resolves against the catalog
//! 3. schema: structure and field types, against the embedded JSON schema
//! 4. business rules: cross-field and cross-component constraints, evaluated
//!    on resolved versions
//!
//! With [`ValidationPolicy::FirstError`] the walk stops at the first failure,
//! which is what the public API has always reported.

use crate::component::ComponentName;
use crate::error::Result;
use crate::ids::is_valid_cidr_range;
use crate::spec::{ComponentSpec, InstallerSpec};
use kurl_core::schema::INSTALLER_SCHEMA;
use kurl_core::{SchemaValidator, SchemaViolation};
use kurl_versions::{ResolutionError, VersionCatalog, VersionKey, VersionResolver};
use std::fmt;
use tracing::debug;

const DEFAULT_UI_BIND_PORT: u64 = 8800;
const NODE_PORT_RANGE: std::ops::RangeInclusive<u64> = 30000..=32767;

/// CRI, CNI and ingress add-ons that k3s and rke2 ship themselves
const BUNDLED_BY_DISTRO: [ComponentName; 6] = [
    ComponentName::Docker,
    ComponentName::Containerd,
    ComponentName::Weave,
    ComponentName::Antrea,
    ComponentName::Calico,
    ComponentName::Contour,
];

const PROMETHEUS_SERVICE_TYPES: [&str; 3] = ["", "ClusterIP", "NodePort"];
const PROMETHEUS_SERVICE_TYPE_SINCE: &str = "0.48.1-16.10.0";
const PROMETHEUS_LAST_BEFORE_K8S_122: &str = "0.49.0-17.1.3";
const OPENEBS_K8S_122_SINCE: &str = "2.12.9";

/// Which family of check produced an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Distribution,
    Resolution(ResolutionError),
    Schema,
    BusinessRule,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distribution => "distribution",
            Self::Resolution(_) => "resolution",
            Self::Schema => "schema",
            Self::BusinessRule => "business-rule",
        }
    }
}

/// A single field-addressed validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Dotted path of the offending value, e.g. `spec.weave.podCidrRange`
    pub field: String,
    /// User-facing message
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    fn rule(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::BusinessRule, field, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// How many errors a validation run reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Stop at the first failing check
    #[default]
    FirstError,
    /// Run every check and report every failure
    CollectAll,
}

/// Everything validation reads besides the spec itself
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub catalog: &'a VersionCatalog,
    pub resolver: &'a VersionResolver,
    pub schema: &'a SchemaValidator,
    pub policy: ValidationPolicy,
}

impl<'a> ValidationContext<'a> {
    pub fn new(catalog: &'a VersionCatalog, resolver: &'a VersionResolver, schema: &'a SchemaValidator) -> Self {
        Self {
            catalog,
            resolver,
            schema,
            policy: ValidationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Marker for "first error recorded, stop walking"
struct Stop;

type Flow = std::result::Result<(), Stop>;

struct Collector {
    policy: ValidationPolicy,
    errors: Vec<ValidationError>,
}

impl Collector {
    fn push(&mut self, error: ValidationError) -> Flow {
        debug!("Validation failed at {}: {}", error.field, error.message);
        self.errors.push(error);
        match self.policy {
            ValidationPolicy::FirstError => Err(Stop),
            ValidationPolicy::CollectAll => Ok(()),
        }
    }
}

impl InstallerSpec {
    /// Validate the spec. An empty list means it is valid.
    ///
    /// `Err` is reserved for failures of the validator itself, such as a
    /// missing embedded schema.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<ValidationError>> {
        let spec_json = self.to_json()["spec"].clone();
        let violations = ctx.schema.violations(&spec_json, INSTALLER_SCHEMA)?;

        let mut collector = Collector {
            policy: ctx.policy,
            errors: Vec::new(),
        };
        let mut resolved = self.clone();

        let walk = check_distribution(self, &mut collector)
            .and_then(|_| check_resolution(self, ctx, &mut resolved, &mut collector))
            .and_then(|_| check_schema(&violations, &mut collector))
            .and_then(|_| check_business_rules(&resolved, ctx, &mut collector));
        if walk.is_err() {
            debug!("Stopped validation of {:?} at the first error", self.id);
        }

        Ok(collector.errors)
    }
}

fn check_distribution(spec: &InstallerSpec, out: &mut Collector) -> Flow {
    let distros = [ComponentName::Kubernetes, ComponentName::Rke2, ComponentName::K3s];

    if distros.iter().all(|d| spec.version(*d).is_none()) {
        out.push(ValidationError::new(
            ValidationErrorKind::Distribution,
            "spec.kubernetes.version",
            "Kubernetes version is required",
        ))?;
    }

    let declared: Vec<ComponentName> = distros.into_iter().filter(|d| spec.has(*d)).collect();
    for (i, first) in declared.iter().enumerate() {
        for second in &declared[i + 1..] {
            out.push(ValidationError::new(
                ValidationErrorKind::Distribution,
                "spec",
                format!(
                    "This spec contains both {} and {}, please specifiy only one Kubernetes distribution",
                    distro_word(*first),
                    distro_word(*second)
                ),
            ))?;
        }
    }
    Ok(())
}

/// How conflict messages name a distribution
fn distro_word(name: ComponentName) -> &'static str {
    match name {
        ComponentName::Kubernetes => "kubeadm",
        other => other.as_str(),
    }
}

fn check_resolution(
    spec: &InstallerSpec,
    ctx: &ValidationContext<'_>,
    resolved: &mut InstallerSpec,
    out: &mut Collector,
) -> Flow {
    for (name, component) in spec.components() {
        if !name.is_versioned() {
            continue;
        }
        let Some(token) = component.version().filter(|v| !v.is_empty()) else {
            continue;
        };
        if !name.is_distribution() && !ctx.catalog.has_addon(name.as_str()) {
            debug!("{} is not in the catalog, not checking {:?}", name, token);
            continue;
        }

        let trust = component.has_s3_override();
        match ctx.resolver.resolve(name.as_str(), token, ctx.catalog, trust) {
            Ok(Some(version)) => {
                if let Some(target) = resolved.component_mut(name) {
                    target.set(crate::fields::VERSION, version);
                }
            }
            Ok(None) => {}
            Err(err) => {
                match &err {
                    ResolutionError::VersionNotFound { .. } => {
                        debug!("No {} version in the catalog matches {:?}", name, token)
                    }
                    ResolutionError::UnsupportedVersion { .. } => {
                        debug!("{} {:?} is not a catalog version", name, token)
                    }
                }
                let message = unsupported_message(name, token, spec.installer_version());
                out.push(ValidationError::new(
                    ValidationErrorKind::Resolution(err),
                    format!("spec.{}.version", name),
                    message,
                ))?;
            }
        }
    }
    Ok(())
}

fn unsupported_message(name: ComponentName, token: &str, installer_version: Option<&str>) -> String {
    let mut message = if name.is_distribution() {
        format!("{} version {} is not supported", name.label(), token)
    } else {
        format!("{} version \"{}\" is not supported", name.label(), token)
    };
    if let Some(version) = installer_version {
        message.push_str(&format!(" for installer version {}", version));
    }
    message
}

fn check_schema(violations: &[SchemaViolation], out: &mut Collector) -> Flow {
    for violation in violations {
        let field = format!("spec{}", violation.instance_path.replace('/', "."));
        out.push(ValidationError::new(
            ValidationErrorKind::Schema,
            field,
            violation.render("spec"),
        ))?;
    }
    Ok(())
}

fn check_business_rules(spec: &InstallerSpec, ctx: &ValidationContext<'_>, out: &mut Collector) -> Flow {
    check_cidr_ranges(spec, out)?;

    if spec.has(ComponentName::Docker) && spec.has(ComponentName::Containerd) {
        out.push(ValidationError::rule(
            "spec",
            "This spec contains both docker and containerd, please specifiy only one CRI",
        ))?;
    }

    check_bundled_distro(spec, out)?;
    check_kubernetes_compatibility(spec, ctx, out)?;
    check_prometheus_service_type(spec, ctx, out)?;
    Ok(())
}

fn check_cidr_ranges(spec: &InstallerSpec, out: &mut Collector) -> Flow {
    let checks = [
        (ComponentName::Kubernetes, "serviceCidrRange"),
        (ComponentName::Weave, "podCidrRange"),
        (ComponentName::Antrea, "podCidrRange"),
    ];
    for (name, field) in checks {
        let Some(range) = spec.component(name).and_then(|c| c.get_str(field)) else {
            continue;
        };
        if !range.is_empty() && !is_valid_cidr_range(range) {
            out.push(ValidationError::rule(
                format!("spec.{}.{}", name, field),
                format!("{} {} \"{}\" is invalid", name.label(), field, range),
            ))?;
        }
    }
    Ok(())
}

/// k3s and rke2 ship their own CRI, CNI and ingress, and only expose NodePorts
fn check_bundled_distro(spec: &InstallerSpec, out: &mut Collector) -> Flow {
    let Some(distro) = [ComponentName::Rke2, ComponentName::K3s]
        .into_iter()
        .find(|d| spec.has(*d))
    else {
        return Ok(());
    };

    let bundled: Vec<&str> = spec
        .components()
        .map(|(name, _)| name)
        .filter(|name| BUNDLED_BY_DISTRO.contains(name))
        .map(ComponentName::as_str)
        .collect();
    if !bundled.is_empty() {
        out.push(ValidationError::rule(
            "spec",
            format!(
                "The following add-ons are not compatible with {}: {}",
                distro,
                bundled.join(", ")
            ),
        ))?;
    }

    if let Some(kotsadm) = spec.component(ComponentName::Kotsadm) {
        let port = ui_bind_port(kotsadm);
        if !port.is_some_and(|p| NODE_PORT_RANGE.contains(&p)) {
            out.push(ValidationError::rule(
                "spec.kotsadm.uiBindPort",
                "Nodeports for this distro must use a NodePort between 30000-32767",
            ))?;
        }
    }
    Ok(())
}

/// `None` when the port is set to something that is not a whole number
fn ui_bind_port(kotsadm: &ComponentSpec) -> Option<u64> {
    match kotsadm.get("uiBindPort") {
        None | Some(serde_json::Value::Null) => Some(DEFAULT_UI_BIND_PORT),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
    }
}

/// Add-on versions that kubeadm clusters of a given Kubernetes version reject
fn check_kubernetes_compatibility(spec: &InstallerSpec, ctx: &ValidationContext<'_>, out: &mut Collector) -> Flow {
    let strategies = ctx.resolver.strategies();
    let key_of = |name: ComponentName| {
        spec.version(name)
            .and_then(|v| strategies.key(name.as_str(), v))
    };
    let Some(kubernetes) = key_of(ComponentName::Kubernetes) else {
        return Ok(());
    };

    if spec.has(ComponentName::Docker) && kubernetes >= VersionKey::release(1, 24, 0) {
        out.push(ValidationError::rule(
            "spec.docker",
            "Docker is not supported with Kubernetes versions 1.24+, please choose Containerd",
        ))?;
    }

    if spec.version(ComponentName::Rook) == Some("1.0.4") && kubernetes >= VersionKey::release(1, 20, 0) {
        out.push(ValidationError::rule(
            "spec.rook.version",
            "Rook 1.0.4 is not compatible with Kubernetes 1.20+",
        ))?;
    }

    if let (Some(openebs), Some(version)) = (key_of(ComponentName::Openebs), spec.version(ComponentName::Openebs)) {
        let since = strategies.key(ComponentName::Openebs.as_str(), OPENEBS_K8S_122_SINCE);
        if kubernetes >= VersionKey::release(1, 22, 0) && since.as_ref().is_some_and(|s| &openebs < s) {
            out.push(ValidationError::rule(
                "spec.openebs.version",
                format!("Openebs version \"{}\" is not compatible with Kubernetes versions 1.22+", version),
            ))?;
        }
        let cstor = spec
            .component(ComponentName::Openebs)
            .and_then(|c| c.get("isCstorEnabled"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if cstor && since.as_ref().is_some_and(|s| &openebs >= s) {
            out.push(ValidationError::rule(
                "spec.openebs.isCstorEnabled",
                format!("Openebs version \"{}\" does not support cstor in kURL", version),
            ))?;
        }
    }

    if let Some(prometheus) = key_of(ComponentName::Prometheus) {
        let last = strategies.key(ComponentName::Prometheus.as_str(), PROMETHEUS_LAST_BEFORE_K8S_122);
        if kubernetes >= VersionKey::release(1, 22, 0) && last.is_some_and(|l| prometheus <= l) {
            out.push(ValidationError::rule(
                "spec.prometheus.version",
                format!(
                    "Prometheus versions less than or equal to {} are not compatible with Kubernetes 1.22+",
                    PROMETHEUS_LAST_BEFORE_K8S_122
                ),
            ))?;
        }
    }
    Ok(())
}

fn check_prometheus_service_type(spec: &InstallerSpec, ctx: &ValidationContext<'_>, out: &mut Collector) -> Flow {
    let Some(prometheus) = spec.component(ComponentName::Prometheus) else {
        return Ok(());
    };
    let (Some(version), Some(service_type)) = (
        spec.version(ComponentName::Prometheus),
        prometheus.get_str("serviceType").filter(|t| !t.is_empty()),
    ) else {
        return Ok(());
    };

    if !PROMETHEUS_SERVICE_TYPES.contains(&service_type) {
        out.push(ValidationError::rule(
            "spec.prometheus.serviceType",
            format!(
                "Supported Prometheus service types are \"NodePort\" and \"ClusterIP\", not \"{}\"",
                service_type
            ),
        ))?;
    }

    let strategies = ctx.resolver.strategies();
    let addon = ComponentName::Prometheus.as_str();
    if let (Some(current), Some(since)) = (
        strategies.key(addon, version),
        strategies.key(addon, PROMETHEUS_SERVICE_TYPE_SINCE),
    ) {
        if current < since {
            out.push(ValidationError::rule(
                "spec.prometheus.serviceType",
                format!(
                    "Prometheus service types are supported for version \"{}\" and later, not \"{}\"",
                    PROMETHEUS_SERVICE_TYPE_SINCE, version
                ),
            ))?;
        }
    }
    Ok(())
}
