//! Configuration for non-interactive runs
//!
//! Two sources feed a run:
//!
//! 1. The process environment (`SPECTROCLOUD_APIKEY`, `PALETTE_HOST`,
//!    `PALETTE_PROJECT_ID`) gives a [`CliConfig`]
//! 2. A YAML automation file gives a [`ConfigFile`], whose `palette`
//!    section overrides the environment when set
//!
//! ```yaml
//! config:
//!   software: { osDistro, osVersion, kubernetesDistro, ... }
//!   registryConfig: { registryURL, registryUsername, registryPassword }
//!   palette: { apiKey, projectID, paletteHost }
//!   edgeInstaller: { tenantRegistrationToken, installerVersion, isoImageName }
//!   clusterProfile: { createClusterProfile, suffix }
//!   platform: linux/amd64
//!   customTag: demo
//!   canvosVersion: 4.0.3
//! ```

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::catalog::{PaletteAuth, TemplateStore, DEFAULT_CANVOS_DIR, DEFAULT_PALETTE_HOST};
use crate::error::{CanvosError, Result};
use crate::options::{CniFamily, KubernetesFamily, OsFamily};
use crate::selection::{RegistrySelection, SelectionSet};

pub const ENV_API_KEY: &str = "SPECTROCLOUD_APIKEY";
pub const ENV_PALETTE_HOST: &str = "PALETTE_HOST";
pub const ENV_PROJECT_ID: &str = "PALETTE_PROJECT_ID";

/// Default file name for `example-config`
pub const EXAMPLE_CONFIG_FILE: &str = "config.yml";

/// Process-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub palette: PaletteAuth,
    pub canvos_dir: PathBuf,
    /// CanvOS release the user builds with, empty when unknown
    pub canvos_version: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            palette: PaletteAuth {
                host: DEFAULT_PALETTE_HOST.to_string(),
                ..Default::default()
            },
            canvos_dir: PathBuf::from(DEFAULT_CANVOS_DIR),
            canvos_version: String::new(),
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(api_key) = get(ENV_API_KEY) {
            config.palette.api_key = api_key;
        }
        if let Some(host) = get(ENV_PALETTE_HOST) {
            config.palette.host = host;
        }
        if let Some(project_id) = get(ENV_PROJECT_ID) {
            config.palette.project_id = project_id;
        }

        config
    }

    pub fn with_canvos_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.canvos_dir = dir.into();
        self
    }

    /// Apply the non-empty values of a config file's `palette` section
    pub fn merge_config_file(&mut self, file: &ConfigFile) {
        let palette = &file.config.palette;

        if !palette.api_key.is_empty() {
            self.palette.api_key = palette.api_key.clone();
        }
        if !palette.project_id.is_empty() {
            self.palette.project_id = palette.project_id.clone();
        }
        if !palette.palette_host.is_empty() {
            self.palette.host = palette.palette_host.clone();
        }
        if !file.config.canvos_version.is_empty() {
            self.canvos_version = file.config.canvos_version.clone();
        }
    }

    pub fn template_store(&self) -> TemplateStore {
        TemplateStore::new(&self.canvos_dir)
    }

    pub fn require_api_key(&self) -> Result<()> {
        if self.palette.api_key.is_empty() {
            return Err(CanvosError::Config(format!(
                "a Palette API key is required; set {ENV_API_KEY} or palette.apiKey"
            )));
        }
        Ok(())
    }
}

/// Root of the YAML automation file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub config: ConfigValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigValues {
    pub software: SoftwareConfig,
    pub registry_config: RegistryConfig,
    pub palette: PaletteConfig,
    pub edge_installer: EdgeInstallerConfig,
    pub cluster_profile: ClusterProfileConfig,
    #[serde(deserialize_with = "scalar_string")]
    pub platform: String,
    #[serde(deserialize_with = "scalar_string")]
    pub custom_tag: String,
    #[serde(deserialize_with = "scalar_string")]
    pub canvos_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftwareConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub os_distro: String,
    #[serde(deserialize_with = "scalar_string")]
    pub os_version: String,
    #[serde(deserialize_with = "scalar_string")]
    pub kubernetes_distro: String,
    /// Defaults to the newest catalog version when empty
    #[serde(deserialize_with = "scalar_string", skip_serializing_if = "String::is_empty")]
    pub kubernetes_version: String,
    #[serde(deserialize_with = "scalar_string")]
    pub container_network_interface: String,
    #[serde(deserialize_with = "scalar_string")]
    pub container_network_interface_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    #[serde(rename = "registryURL", deserialize_with = "scalar_string")]
    pub registry_url: String,
    #[serde(deserialize_with = "scalar_string")]
    pub registry_username: String,
    #[serde(deserialize_with = "scalar_string")]
    pub registry_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaletteConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub api_key: String,
    #[serde(rename = "projectID", deserialize_with = "scalar_string")]
    pub project_id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub palette_host: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeInstallerConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub tenant_registration_token: String,
    #[serde(deserialize_with = "scalar_string")]
    pub installer_version: String,
    #[serde(deserialize_with = "scalar_string")]
    pub iso_image_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterProfileConfig {
    pub create_cluster_profile: bool,
    #[serde(deserialize_with = "scalar_string")]
    pub suffix: String,
}

/// Accept any YAML scalar as text.
///
/// Plain scalars keep their source text, so `osVersion: 22.10` stays
/// `22.10` and `apiKey: 1234567890` is a string. `~` and `null` are
/// empty.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarText;

    impl<'de> Visitor<'de> for ScalarText {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a scalar value")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            match v {
                "~" | "null" | "Null" | "NULL" => Ok(String::new()),
                _ => Ok(v.to_string()),
            }
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_str(ScalarText)
}

impl ConfigFile {
    /// Read, parse and validate a `.yaml`/`.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if !is_yaml {
            return Err(CanvosError::Config(format!(
                "invalid file type provided for {}; must be .yaml or .yml",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CanvosError::io("read config file", path, e))?;

        let config = Self::from_yaml(&content)?;
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Reject missing required values and unknown families
    pub fn validate(&self) -> Result<()> {
        let c = &self.config;
        let required = [
            ("software.osDistro", &c.software.os_distro),
            ("software.osVersion", &c.software.os_version),
            ("software.kubernetesDistro", &c.software.kubernetes_distro),
            ("software.containerNetworkInterface", &c.software.container_network_interface),
            ("registryConfig.registryURL", &c.registry_config.registry_url),
            ("edgeInstaller.installerVersion", &c.edge_installer.installer_version),
            ("edgeInstaller.isoImageName", &c.edge_installer.iso_image_name),
            ("platform", &c.platform),
            ("customTag", &c.custom_tag),
        ];

        let mut missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if c.cluster_profile.create_cluster_profile && c.cluster_profile.suffix.trim().is_empty() {
            missing.push("clusterProfile.suffix");
        }

        if !missing.is_empty() {
            return Err(CanvosError::Config(format!(
                "invalid configuration file, missing: {}",
                missing.join(", ")
            )));
        }

        OsFamily::parse(&c.software.os_distro)?;
        KubernetesFamily::parse(&c.software.kubernetes_distro)?;
        CniFamily::parse(&c.software.container_network_interface)?;
        RegistrySelection::from_registry_url(&c.registry_config.registry_url)?;

        Ok(())
    }
}

impl SelectionSet {
    /// Selection described by a validated config file.
    ///
    /// Versions the file leaves out stay empty; see
    /// [`SelectionSet::fill_latest_versions`].
    pub fn from_config(file: &ConfigFile) -> Result<Self> {
        let c = &file.config;

        let mut registry = RegistrySelection::from_registry_url(&c.registry_config.registry_url)?;
        registry.username = c.registry_config.registry_username.clone();
        registry.password = c.registry_config.registry_password.clone();

        Ok(Self {
            os: OsFamily::parse(&c.software.os_distro)?,
            os_version: c.software.os_version.clone(),
            byoos_version: String::new(),
            kubernetes: KubernetesFamily::parse(&c.software.kubernetes_distro)?,
            kubernetes_version: c.software.kubernetes_version.clone(),
            cni: CniFamily::parse(&c.software.container_network_interface)?,
            cni_version: c.software.container_network_interface_version.clone(),
            registry,
            custom_tag: c.custom_tag.clone(),
            installer_version: c.edge_installer.installer_version.trim_start_matches('v').to_string(),
            iso_name: c.edge_installer.iso_image_name.clone(),
            platform: c.platform.clone(),
            create_cluster_profile: c.cluster_profile.create_cluster_profile,
            cluster_profile_suffix: c.cluster_profile.suffix.clone(),
            tenant_registration_token: c.edge_installer.tenant_registration_token.clone(),
        })
    }
}

const EXAMPLE_CONFIG: &str = r#"config:
  # The foundation software distributions and versions to use for the Edge host
  software:
    # Allowed values are: ubuntu, opensuse-leap
    osDistro: ubuntu
    osVersion: "22.04"
    # Allowed values are: k3s, rke2, kubeadm, microk8s
    # kubeadm is Palette eXtended Kubernetes - Edge (PXK-E)
    kubernetesDistro: kubeadm
    # Optional. The newest version in the catalog is used when omitted.
    # kubernetesVersion: "1.27.5"
    # Choose a Container Network Interface (CNI) available in Palette
    containerNetworkInterface: calico
    containerNetworkInterfaceVersion: "3.25.0"
  # Where the provider images are pushed, as <registry>/<namespace>
  registryConfig:
    registryURL: ttl.sh/myrepository
    registryUsername: myUsername
    registryPassword: superSecretPassword
  # Palette credentials. Without a project ID the scope is the tenant.
  palette:
    apiKey: "1234567890"
    projectID: "1234567890"
    paletteHost: https://api.spectrocloud.com
  # Used when creating the Edge Installer ISO
  edgeInstaller:
    tenantRegistrationToken: "1234567890"
    installerVersion: "3.4.3"
    isoImageName: palette-learn
  clusterProfile:
    createClusterProfile: true
    # Profile names look like edge-<suffix>-<YYYY-MM-DD>-<hash>
    suffix: learn
  # Allowed values: linux/amd64
  platform: linux/amd64
  # Provider images are named <kubernetesDistro>-<k8sVersion>-v<installerVersion>-<customTag>_<platform>
  customTag: palette-learn
  canvosVersion: "3.4.3"
"#;

/// Write a commented example configuration file
pub fn generate_example_config(path: &Path) -> Result<()> {
    if path.exists() {
        info!("Overwriting {}", path.display());
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .map_err(|e| CanvosError::io("write example config", path, e))?;

    info!("Example configuration written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_loads_and_validates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(EXAMPLE_CONFIG_FILE);

        generate_example_config(&path).unwrap();
        let config = ConfigFile::load(&path).unwrap();

        assert_eq!(config.config.software.os_version, "22.04");
        assert_eq!(config.config.registry_config.registry_url, "ttl.sh/myrepository");
        assert_eq!(config.config.palette.project_id, "1234567890");
        assert!(config.config.cluster_profile.create_cluster_profile);
    }

    #[test]
    fn test_selection_from_config() {
        let config = ConfigFile::from_yaml(EXAMPLE_CONFIG).unwrap();
        let selection = SelectionSet::from_config(&config).unwrap();

        assert_eq!(selection.os, OsFamily::Ubuntu);
        assert_eq!(selection.kubernetes, KubernetesFamily::Kubeadm);
        assert_eq!(selection.cni, CniFamily::Calico);
        assert_eq!(selection.cni_version, "3.25.0");
        assert_eq!(selection.registry.url, "ttl.sh");
        assert_eq!(selection.registry.repository, "myrepository");
        assert_eq!(selection.registry.username, "myUsername");
        assert_eq!(selection.installer_version, "3.4.3");
        assert_eq!(selection.cluster_profile_suffix, "learn");
        assert_eq!(selection.tenant_registration_token, "1234567890");
        assert!(selection.kubernetes_version.is_empty());
    }

    #[test]
    fn test_unquoted_numbers_become_strings() {
        let yaml = r#"
config:
  software:
    osDistro: opensuse-leap
    osVersion: 15.4
    kubernetesDistro: k3s
    containerNetworkInterface: flannel
  palette:
    apiKey: 1234567890
"#;
        let config = ConfigFile::from_yaml(yaml).unwrap();
        assert_eq!(config.config.software.os_version, "15.4");
        assert_eq!(config.config.palette.api_key, "1234567890");
    }

    #[test]
    fn test_unquoted_versions_keep_trailing_zeros() {
        let yaml = r#"
config:
  software:
    osDistro: ubuntu
    osVersion: 22.10
    kubernetesDistro: k3s
    containerNetworkInterface: calico
    containerNetworkInterfaceVersion: 3.30
  edgeInstaller:
    installerVersion: 4.0
"#;
        let software = ConfigFile::from_yaml(yaml).unwrap().config.software;
        assert_eq!(software.os_version, "22.10");
        assert_eq!(software.container_network_interface_version, "3.30");

        let installer = ConfigFile::from_yaml(yaml).unwrap().config.edge_installer;
        assert_eq!(installer.installer_version, "4.0");
    }

    #[test]
    fn test_validate_lists_missing_values() {
        let yaml = r#"
config:
  software:
    osDistro: ubuntu
    osVersion: "22.04"
    kubernetesDistro: k3s
    containerNetworkInterface: calico
  clusterProfile:
    createClusterProfile: true
"#;
        let err = ConfigFile::from_yaml(yaml).unwrap().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: invalid configuration file, missing: \
             registryConfig.registryURL, edgeInstaller.installerVersion, \
             edgeInstaller.isoImageName, platform, customTag, clusterProfile.suffix"
        );
    }

    #[test]
    fn test_validate_rejects_unknown_family_and_bare_registry() {
        let mut config = ConfigFile::from_yaml(EXAMPLE_CONFIG).unwrap();
        config.config.software.kubernetes_distro = "nomad".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            CanvosError::UnknownFamily { .. }
        ));

        let mut config = ConfigFile::from_yaml(EXAMPLE_CONFIG).unwrap();
        config.config.registry_config.registry_url = "ttl.sh".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_other_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("must be .yaml or .yml"));
    }

    #[test]
    fn test_cli_config_from_lookup() {
        let config = CliConfig::from_lookup(|key| match key {
            ENV_API_KEY => Some("key-1".to_string()),
            ENV_PALETTE_HOST => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.palette.api_key, "key-1");
        assert_eq!(config.palette.host, DEFAULT_PALETTE_HOST);
        assert!(config.palette.project_id.is_empty());
        assert_eq!(config.canvos_dir, PathBuf::from(".canvos"));
    }

    #[test]
    fn test_config_file_overrides_environment() {
        let mut cli = CliConfig::from_lookup(|key| match key {
            ENV_API_KEY => Some("from-env".to_string()),
            ENV_PROJECT_ID => Some("env-project".to_string()),
            _ => None,
        });

        let mut file = ConfigFile::default();
        file.config.palette.api_key = "from-file".to_string();
        file.config.canvos_version = "4.0.3".to_string();
        cli.merge_config_file(&file);

        assert_eq!(cli.palette.api_key, "from-file");
        assert_eq!(cli.palette.project_id, "env-project");
        assert_eq!(cli.canvos_version, "4.0.3");
        assert!(cli.require_api_key().is_ok());
    }

    #[test]
    #[serial]
    fn test_cli_config_from_env() {
        std::env::set_var(ENV_API_KEY, "env-key");
        std::env::set_var(ENV_PALETTE_HOST, "https://palette.example.com");
        std::env::remove_var(ENV_PROJECT_ID);

        let config = CliConfig::from_env();

        std::env::remove_var(ENV_API_KEY);
        std::env::remove_var(ENV_PALETTE_HOST);

        assert_eq!(config.palette.api_key, "env-key");
        assert_eq!(config.palette.host, "https://palette.example.com");
        assert!(config.palette.project_id.is_empty());
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        std::env::remove_var(ENV_API_KEY);
        let err = CliConfig::from_env().require_api_key().unwrap_err();
        assert!(err.to_string().contains(ENV_API_KEY));
    }
}
