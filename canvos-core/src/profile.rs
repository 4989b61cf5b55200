//! Edge cluster profile assembly
//!
//! A profile has three layers, each backed by a pack template that
//! `init` wrote to disk:
//!
//! | Layer      | Pack                 | Values                              |
//! |------------|----------------------|-------------------------------------|
//! | OS         | `edge-native-byoi`   | template with the `system.*` block substituted |
//! | Kubernetes | `edge-<distro>`      | template verbatim                   |
//! | CNI        | `cni-<name>`         | template verbatim                   |
//!
//! Assembly either returns a complete profile or an error; nothing is
//! written on the way.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::catalog::{Layer, TemplateStore};
use crate::error::{CanvosError, Result};
use crate::naming::generate_cluster_profile_name;
use crate::options::{Family, OptionIndex, PackIdentifiers, BYOOS_PACK_NAME};
use crate::selection::SelectionSet;

pub const PROFILE_DESCRIPTION: &str = "CanvOS created Edge cluster profile";
pub const PROFILE_CREATED_BY: &str = "canvos";
pub const PROFILE_TYPE: &str = "edge";
pub const PROFILE_CLOUD_TYPE: &str = "edge-native";
pub const PROFILE_TEMPLATE_TYPE: &str = "cluster";
pub const PROFILE_VERSION: &str = "1.0.0";
pub const PACK_TYPE: &str = "spectro";

pub const BYOOS_LOGO: &str = "https://registry.spectrocloud.com/v1/edge-native-byoi/blobs/sha256:b6081bca439eeb01a8d43b3cb6895df4c088f80af978856ddc0da568e5c09365?type=image/png";

/// Line in the BYOOS template where the `system.*` block begins
pub const SYSTEM_URI_ANCHOR: &str = r#"system.uri: """#;

const OS_LAYER_LABEL: &str = BYOOS_PACK_NAME;
const KUBERNETES_LAYER_LABEL: &str = "kubernetes";
const CNI_LAYER_LABEL: &str = "cni";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub metadata: ProfileMetadata,
    pub spec: ProfileSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub name: String,
    pub annotations: ProfileAnnotations,
    pub labels: ProfileLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAnnotations {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLabels {
    pub created_by: String,
    #[serde(rename = "type")]
    pub profile_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub template: ProfileTemplate,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTemplate {
    pub cloud_type: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub packs: Vec<PackEntry>,
}

/// One layer of the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackEntry {
    pub name: String,
    pub registry_uid: String,
    /// Pack version
    pub tag: String,
    pub values: String,
    pub pack_uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,
    #[serde(rename = "type")]
    pub pack_type: String,
    /// Same as `pack_uid`
    pub uid: String,
    pub template: PackTemplate,
    /// Always present, even when empty
    pub manifests: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackTemplate {
    pub parameters: PackParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackParameters {
    pub input_parameters: Vec<String>,
    pub output_parameters: Vec<String>,
}

impl PackEntry {
    pub fn new(name: &str, ids: &PackIdentifiers, tag: &str, values: String) -> Self {
        Self {
            name: name.to_string(),
            registry_uid: ids.registry_uid.clone(),
            tag: tag.to_string(),
            values,
            pack_uid: ids.catalog_uid.clone(),
            logo: String::new(),
            pack_type: PACK_TYPE.to_string(),
            uid: ids.catalog_uid.clone(),
            template: PackTemplate::default(),
            manifests: Vec::new(),
        }
    }

    pub fn with_logo(mut self, logo: &str) -> Self {
        self.logo = logo.to_string();
        self
    }
}

/// The `system.*` block that replaces the BYOOS anchor.
///
/// Every line starts with exactly two spaces and there is no trailing
/// newline.
pub fn byoos_system_uri_values(selection: &SelectionSet) -> String {
    let mut block = String::from(
        r#"  system.uri: "{{ .spectro.pack.edge-native-byoi.options.system.registry }}/{{ .spectro.pack.edge-native-byoi.options.system.repo }}:{{ .spectro.pack.edge-native-byoi.options.system.k8sDistribution }}-{{ .spectro.system.kubernetes.version }}-{{ .spectro.pack.edge-native-byoi.options.system.peVersion }}-{{ .spectro.pack.edge-native-byoi.options.system.customTag }}""#,
    );

    let fields = [
        ("system.registry", selection.registry.url.clone()),
        ("system.repo", selection.registry.repository.clone()),
        ("system.k8sDistribution", selection.kubernetes.key().to_string()),
        ("system.osName", selection.os.key().to_string()),
        ("system.peVersion", format!("v{}", selection.installer_version)),
        ("system.customTag", selection.custom_tag.clone()),
        ("system.osVersion", selection.os_version.clone()),
    ];

    for (key, value) in fields {
        block.push_str(&format!("\n  {key}: {value}"));
    }

    block
}

/// Replace the anchor line and everything after it with `block`.
///
/// Returns `None` when no line trims to the anchor.
pub fn substitute_system_uri(content: &str, block: &str) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = lines
        .iter()
        .position(|line| line.trim() == SYSTEM_URI_ANCHOR)?;

    let mut kept = lines[..start].to_vec();
    kept.push(block);
    Some(kept.join("\n"))
}

fn byoos_pack_values(store: &TemplateStore, selection: &SelectionSet) -> Result<String> {
    let raw = store.read_pack_values(Layer::Os, BYOOS_PACK_NAME, &selection.byoos_version)?;

    substitute_system_uri(&raw, &byoos_system_uri_values(selection)).ok_or_else(|| {
        CanvosError::AnchorNotFound {
            path: store.template_path(Layer::Os, BYOOS_PACK_NAME, &selection.byoos_version),
        }
    })
}

/// Build the three-layer Edge cluster profile for `selection`.
///
/// Every identifier is resolved before any template is read; the first
/// unresolvable layer aborts assembly.
pub fn assemble_cluster_profile(
    selection: &SelectionSet,
    index: &OptionIndex,
    store: &TemplateStore,
) -> Result<ClusterProfile> {
    let kubernetes = Family::Kubernetes(selection.kubernetes);
    let cni = Family::Cni(selection.cni);

    let byoos_ids = index
        .resolve(Family::Byoos, &selection.byoos_version)
        .map_err(|e| CanvosError::pack_values(OS_LAYER_LABEL, e))?;
    let k8s_ids = index
        .resolve(kubernetes, &selection.kubernetes_version)
        .map_err(|e| CanvosError::pack_values(KUBERNETES_LAYER_LABEL, e))?;
    let cni_ids = index
        .resolve(cni, &selection.cni_version)
        .map_err(|e| CanvosError::pack_values(CNI_LAYER_LABEL, e))?;

    let os_values = byoos_pack_values(store, selection)
        .map_err(|e| CanvosError::pack_values(OS_LAYER_LABEL, e))?;
    let k8s_values = store
        .read_pack_values(Layer::K8s, kubernetes.pack_name(), &selection.kubernetes_version)
        .map_err(|e| CanvosError::pack_values(KUBERNETES_LAYER_LABEL, e))?;
    let cni_values = store
        .read_pack_values(Layer::Cni, cni.pack_name(), &selection.cni_version)
        .map_err(|e| CanvosError::pack_values(CNI_LAYER_LABEL, e))?;

    let name = generate_cluster_profile_name(&selection.cluster_profile_suffix);
    debug!("Assembled cluster profile {}", name);

    Ok(ClusterProfile {
        metadata: ProfileMetadata {
            name,
            annotations: ProfileAnnotations {
                description: PROFILE_DESCRIPTION.to_string(),
            },
            labels: ProfileLabels {
                created_by: PROFILE_CREATED_BY.to_string(),
                profile_type: PROFILE_TYPE.to_string(),
            },
        },
        spec: ProfileSpec {
            template: ProfileTemplate {
                cloud_type: PROFILE_CLOUD_TYPE.to_string(),
                template_type: PROFILE_TEMPLATE_TYPE.to_string(),
                packs: vec![
                    PackEntry::new(BYOOS_PACK_NAME, &byoos_ids, &selection.byoos_version, os_values)
                        .with_logo(BYOOS_LOGO),
                    PackEntry::new(
                        kubernetes.pack_name(),
                        &k8s_ids,
                        &selection.kubernetes_version,
                        k8s_values,
                    ),
                    PackEntry::new(cni.pack_name(), &cni_ids, &selection.cni_version, cni_values),
                ],
            },
            version: PROFILE_VERSION.to_string(),
        },
    })
}

impl ClusterProfile {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the payload as JSON, e.g. for a dry run
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)
            .map_err(|e| CanvosError::io("write cluster profile", path, e))
    }
}
