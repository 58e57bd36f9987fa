//! Declared option fields per component
//!
//! Each entry names a spec field, its JSON type and the installer flag it
//! maps to. The flag names are consumed verbatim by the shell installers,
//! including historical spellings, and must not be derived from field names.

use crate::component::ComponentName;

pub const VERSION: &str = "version";
pub const S3_OVERRIDE: &str = "s3Override";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub flag: Option<&'static str>,
}

const fn text(name: &'static str, flag: Option<&'static str>) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::String, flag }
}

const fn number(name: &'static str, flag: Option<&'static str>) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Number, flag }
}

const fn boolean(name: &'static str, flag: Option<&'static str>) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Boolean, flag }
}

const fn list(name: &'static str, flag: Option<&'static str>) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Array, flag }
}

const fn object(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Object, flag: None }
}

const V: FieldSpec = text(VERSION, None);
const S3: FieldSpec = text(S3_OVERRIDE, Some("s3-override"));

static KUBERNETES: [FieldSpec; 15] = [
    V,
    S3,
    text("serviceCidrRange", Some("service-cidr-range")),
    text("serviceCIDR", Some("service-cidr")),
    boolean("HACluster", Some("ha")),
    text("masterAddress", Some("kuberenetes-master-address")),
    text("loadBalancerAddress", Some("load-balancer-address")),
    text("containerLogMaxSize", Some("container-log-max-size")),
    number("containerLogMaxFiles", Some("container-log-max-files")),
    text("bootstrapToken", Some("bootstrap-token")),
    text("bootstrapTokenTTL", Some("bootstrap-token-ttl")),
    text("kubeadmTokenCAHash", Some("kubeadm-token-ca-hash")),
    boolean("useStandardNodePortRange", None),
    boolean("controlPlane", Some("control-plane")),
    text("certKey", Some("cert-key")),
];

static VERSION_ONLY: [FieldSpec; 1] = [V];

static VERSION_AND_OVERRIDE: [FieldSpec; 2] = [V, S3];

static DOCKER: [FieldSpec; 8] = [
    V,
    S3,
    boolean("bypassStorageDriverWarnings", Some("bypass-storagedriver-warnings")),
    boolean("hardFailOnLoopback", Some("hard-fail-on-loopback")),
    boolean("noCEOnEE", Some("no-ce-on-ee")),
    text("dockerRegistryIP", Some("docker-registry-ip")),
    text("additionalNoProxy", Some("additional-no-proxy")),
    boolean("noDocker", Some("no-docker")),
];

static WEAVE: [FieldSpec; 5] = [
    V,
    S3,
    text("podCIDR", Some("pod-cidr")),
    text("podCidrRange", Some("pod-cidr-range")),
    boolean("isEncryptionDisabled", Some("disable-weave-encryption")),
];

static ANTREA: [FieldSpec; 5] = [
    V,
    text(S3_OVERRIDE, None),
    text("podCIDR", None),
    text("podCidrRange", None),
    boolean("isEncryptionDisabled", None),
];

static ROOK: [FieldSpec; 9] = [
    V,
    S3,
    text("storageClassName", Some("storage-class-name")),
    number("cephReplicaCount", Some("ceph-replica-count")),
    boolean("isBlockStorageEnabled", Some("rook-block-storage-enabled")),
    boolean("isSharedFilesystemDisabled", Some("rook-shared-filesystem-disabled")),
    text("blockDeviceFilter", Some("rook-block-device-filter")),
    boolean("bypassUpgradeWarning", Some("rook-bypass-upgrade-warning")),
    boolean("hostpathRequiresPrivileged", Some("rook-hostpath-requires-privileged")),
];

static OPENEBS: [FieldSpec; 7] = [
    V,
    S3,
    text("namespace", Some("openebs-namespace")),
    boolean("isLocalPVEnabled", Some("openebs-localpv-enabled")),
    text("localPVStorageClassName", Some("openebs-localpv-storage-class-name")),
    boolean("isCstorEnabled", Some("openebs-cstor-enabled")),
    text("cstorStorageClassName", Some("openebs-cstor-storage-class-name")),
];

static MINIO: [FieldSpec; 5] = [
    V,
    S3,
    text("namespace", Some("minio-namespace")),
    text("hostPath", Some("minio-hostpath")),
    text("claimSize", Some("claim-size")),
];

static CONTOUR: [FieldSpec; 5] = [
    V,
    S3,
    text("tlsMinimumProtocolVersion", Some("contour-tls-minimum-protocol-version")),
    number("httpPort", Some("contour-http-port")),
    number("httpsPort", Some("contour-https-port")),
];

static REGISTRY: [FieldSpec; 3] = [V, S3, number("publishPort", Some("registry-publish-port"))];

static PROMETHEUS: [FieldSpec; 3] = [V, S3, text("serviceType", Some("service-type"))];

static FLUENTD: [FieldSpec; 3] = [V, S3, boolean("fullEFKStack", Some("fluentd-full-efk-stack"))];

static KOTSADM: [FieldSpec; 7] = [
    V,
    S3,
    boolean("disableS3", Some("disable-s3")),
    text("applicationSlug", Some("kotsadm-application-slug")),
    number("uiBindPort", Some("kotsadm-ui-bind-port")),
    text("hostname", Some("kotsadm-hostname")),
    text("applicationNamespace", Some("kotsadm-application-namespaces")),
];

static VELERO: [FieldSpec; 7] = [
    V,
    S3,
    text("namespace", Some("velero-namespace")),
    boolean("disableCLI", Some("velero-disable-cli")),
    boolean("disableRestic", Some("velero-disable-restic")),
    text("localBucket", Some("velero-local-bucket")),
    boolean("resticRequiresPrivileged", Some("velero-restic-requires-privileged")),
];

static EKCO: [FieldSpec; 10] = [
    V,
    S3,
    text("nodeUnreachableToleration", Some("ekco-node-unreachable-toleration-duration")),
    number("minReadyMasterNodeCount", Some("ekco-min-ready-master-node-count")),
    number("minReadyWorkerNodeCount", Some("ekco-min-ready-worker-node-count")),
    boolean("shouldDisableRebootService", Some("ekco-should-disable-reboot-service")),
    boolean("shouldDisableClearNodes", None),
    boolean("shouldEnablePurgeNodes", None),
    boolean("rookShouldUseAllNodes", Some("ekco-rook-should-use-all-nodes")),
    list("podImageOverrides", Some("pod-image-overrides")),
];

static KURL: [FieldSpec; 17] = [
    list("additionalNoProxyAddresses", None),
    boolean("airgap", Some("airgap")),
    text("hostnameCheck", Some("hostname-check")),
    object("hostPreflights"),
    boolean("ignoreRemoteLoadImagesPrompt", Some("ignore-remote-load-images-prompt")),
    boolean("ignoreRemoteUpgradePrompt", Some("ignore-remote-upgrade-prompt")),
    text("licenseURL", None),
    text("nameserver", None),
    boolean("noProxy", Some("no-proxy")),
    boolean("preflightIgnore", Some("preflight-ignore")),
    boolean("preflightIgnoreWarnings", Some("preflight-ignore-warnings")),
    text("privateAddress", Some("private-address")),
    text("proxyAddress", Some("http-proxy")),
    text("publicAddress", Some("public-address")),
    boolean("bypassFirewalldWarning", Some("bypass-firewalld-warning")),
    boolean("hardFailOnFirewalld", Some("hard-fail-on-firewalld")),
    text("installerVersion", None),
];

static CONTAINERD: [FieldSpec; 4] = [
    V,
    text("tomlConfig", None),
    boolean("preserveConfig", None),
    S3,
];

static FIREWALLD: [FieldSpec; 6] = [
    boolean("bypassFirewalldWarning", None),
    boolean("disableFirewalld", None),
    text("firewalld", None),
    list("firewalldCmds", None),
    boolean("hardFailOnFirewalld", None),
    boolean("preserveConfig", None),
];

static IPTABLES: [FieldSpec; 2] = [list("iptablesCmds", None), boolean("preserveConfig", None)];

static SELINUX: [FieldSpec; 5] = [
    list("chconCmds", None),
    boolean("disableSelinux", None),
    boolean("preserveConfig", None),
    text("selinux", None),
    list("semanageCmds", None),
];

static HELM: [FieldSpec; 2] = [
    text("helmfileSpec", Some("helmfile-spec")),
    list("additionalImages", None),
];

static LONGHORN: [FieldSpec; 4] = [
    S3,
    number("uiBindPort", Some("longhorn-ui-bind-port")),
    number("uiReplicaCount", Some("longhorn-ui-replica-count")),
    V,
];

static UFW: [FieldSpec; 3] = [
    boolean("bypassUFWWarning", None),
    boolean("disableUFW", None),
    boolean("hardFailOnUFW", None),
];

pub(crate) fn for_component(component: ComponentName) -> &'static [FieldSpec] {
    use ComponentName::*;
    match component {
        Kubernetes => &KUBERNETES,
        Rke2 | K3s => &VERSION_ONLY,
        Docker => &DOCKER,
        Weave => &WEAVE,
        Antrea => &ANTREA,
        Calico | Collectd | CertManager | MetricsServer | Sonobuoy | Goldpinger => {
            &VERSION_AND_OVERRIDE
        }
        Rook => &ROOK,
        Openebs => &OPENEBS,
        Minio => &MINIO,
        Contour => &CONTOUR,
        Registry => &REGISTRY,
        Prometheus => &PROMETHEUS,
        Fluentd => &FLUENTD,
        Kotsadm => &KOTSADM,
        Velero => &VELERO,
        Ekco => &EKCO,
        Kurl => &KURL,
        Containerd => &CONTAINERD,
        FirewalldConfig => &FIREWALLD,
        IptablesConfig => &IPTABLES,
        SelinuxConfig => &SELINUX,
        Helm => &HELM,
        Longhorn => &LONGHORN,
        Ufw => &UFW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurl_core::SchemaValidator;
    use std::collections::BTreeSet;

    #[test]
    fn test_field_names_unique_per_component() {
        for component in ComponentName::ALL {
            let names: BTreeSet<_> = component.fields().iter().map(|f| f.name).collect();
            assert_eq!(names.len(), component.fields().len(), "{}", component);
        }
    }

    #[test]
    fn test_flags_unique() {
        let mut seen = BTreeSet::new();
        for component in ComponentName::ALL {
            for flag in component.fields().iter().filter_map(|f| f.flag) {
                if flag == "s3-override" {
                    continue;
                }
                assert!(seen.insert(flag), "duplicate flag {}", flag);
            }
        }
    }

    #[test]
    fn test_table_matches_schema() {
        let validator = SchemaValidator::global().unwrap();
        for component in ComponentName::ALL {
            for field in component.fields() {
                let mut doc = serde_json::Map::new();
                let value = match field.kind {
                    FieldKind::String => serde_json::json!("x"),
                    FieldKind::Number => serde_json::json!(1),
                    FieldKind::Boolean => serde_json::json!(true),
                    FieldKind::Array => serde_json::json!([]),
                    FieldKind::Object => serde_json::json!({}),
                };
                let mut inner = serde_json::Map::new();
                inner.insert(field.name.to_string(), value);
                if component.is_versioned() {
                    inner.entry(VERSION).or_insert(serde_json::json!("1.0.0"));
                }
                if component == ComponentName::Helm {
                    inner
                        .entry("helmfileSpec")
                        .or_insert(serde_json::json!("releases: []"));
                }
                doc.insert(component.as_str().to_string(), inner.into());
                let violations = validator
                    .violations(&serde_json::Value::Object(doc), kurl_core::schema::INSTALLER_SCHEMA)
                    .unwrap();
                assert!(
                    violations.is_empty(),
                    "{}.{}: {:?}",
                    component,
                    field.name,
                    violations
                );
            }
        }
    }

    #[test]
    fn test_historical_flag_spellings() {
        let master = ComponentName::Kubernetes.field("masterAddress").unwrap();
        assert_eq!(master.flag, Some("kuberenetes-master-address"));
        let proxy = ComponentName::Kurl.field("proxyAddress").unwrap();
        assert_eq!(proxy.flag, Some("http-proxy"));
    }
}
