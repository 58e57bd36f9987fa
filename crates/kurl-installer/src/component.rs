//! Installer components
//!
//! The closed set of top-level keys an installer spec may carry. Declaration
//! order is the render order used by canonical YAML and flag derivation.

use crate::fields::{self, FieldSpec};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentName {
    Kubernetes,
    Rke2,
    K3s,
    Docker,
    Weave,
    Antrea,
    Calico,
    Rook,
    Openebs,
    Minio,
    Contour,
    Registry,
    Prometheus,
    Fluentd,
    Kotsadm,
    Velero,
    Ekco,
    Kurl,
    Containerd,
    Collectd,
    CertManager,
    MetricsServer,
    FirewalldConfig,
    IptablesConfig,
    SelinuxConfig,
    Helm,
    Longhorn,
    Sonobuoy,
    Ufw,
    Goldpinger,
}

impl ComponentName {
    /// Every component, in render order
    pub const ALL: [ComponentName; 30] = [
        Self::Kubernetes,
        Self::Rke2,
        Self::K3s,
        Self::Docker,
        Self::Weave,
        Self::Antrea,
        Self::Calico,
        Self::Rook,
        Self::Openebs,
        Self::Minio,
        Self::Contour,
        Self::Registry,
        Self::Prometheus,
        Self::Fluentd,
        Self::Kotsadm,
        Self::Velero,
        Self::Ekco,
        Self::Kurl,
        Self::Containerd,
        Self::Collectd,
        Self::CertManager,
        Self::MetricsServer,
        Self::FirewalldConfig,
        Self::IptablesConfig,
        Self::SelinuxConfig,
        Self::Helm,
        Self::Longhorn,
        Self::Sonobuoy,
        Self::Ufw,
        Self::Goldpinger,
    ];

    /// Key in the spec document, also the catalog add-on name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::Rke2 => "rke2",
            Self::K3s => "k3s",
            Self::Docker => "docker",
            Self::Weave => "weave",
            Self::Antrea => "antrea",
            Self::Calico => "calico",
            Self::Rook => "rook",
            Self::Openebs => "openebs",
            Self::Minio => "minio",
            Self::Contour => "contour",
            Self::Registry => "registry",
            Self::Prometheus => "prometheus",
            Self::Fluentd => "fluentd",
            Self::Kotsadm => "kotsadm",
            Self::Velero => "velero",
            Self::Ekco => "ekco",
            Self::Kurl => "kurl",
            Self::Containerd => "containerd",
            Self::Collectd => "collectd",
            Self::CertManager => "certManager",
            Self::MetricsServer => "metricsServer",
            Self::FirewalldConfig => "firewalldConfig",
            Self::IptablesConfig => "iptablesConfig",
            Self::SelinuxConfig => "selinuxConfig",
            Self::Helm => "helm",
            Self::Longhorn => "longhorn",
            Self::Sonobuoy => "sonobuoy",
            Self::Ufw => "ufw",
            Self::Goldpinger => "goldpinger",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }

    /// Name used in user-facing messages
    pub fn label(self) -> &'static str {
        match self {
            Self::Kubernetes => "Kubernetes",
            Self::Rke2 => "RKE2",
            Self::K3s => "K3S",
            Self::Docker => "Docker",
            Self::Weave => "Weave",
            Self::Antrea => "Antrea",
            Self::Calico => "Calico",
            Self::Rook => "Rook",
            Self::Openebs => "OpenEBS",
            Self::Minio => "Minio",
            Self::Contour => "Contour",
            Self::Registry => "Registry",
            Self::Prometheus => "Prometheus",
            Self::Fluentd => "Fluentd",
            Self::Kotsadm => "Kotsadm",
            Self::Velero => "Velero",
            Self::Ekco => "Ekco",
            Self::Kurl => "kURL",
            Self::Containerd => "Containerd",
            Self::Collectd => "Collectd",
            Self::CertManager => "CertManager",
            Self::MetricsServer => "MetricsServer",
            Self::FirewalldConfig => "Firewalld",
            Self::IptablesConfig => "Iptables",
            Self::SelinuxConfig => "SELinux",
            Self::Helm => "Helm",
            Self::Longhorn => "Longhorn",
            Self::Sonobuoy => "Sonobuoy",
            Self::Ufw => "UFW",
            Self::Goldpinger => "Goldpinger",
        }
    }

    /// Kubernetes distributions; at most one may be declared
    pub fn is_distribution(self) -> bool {
        matches!(self, Self::Kubernetes | Self::Rke2 | Self::K3s)
    }

    /// Whether the component carries a `version` field
    pub fn is_versioned(self) -> bool {
        self.fields().iter().any(|f| f.name == fields::VERSION)
    }

    /// Declared option fields, in flag derivation order
    pub fn fields(self) -> &'static [FieldSpec] {
        fields::for_component(self)
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
