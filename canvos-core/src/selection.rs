//! The finalized build selection
//!
//! A [`SelectionSet`] is built once, from a config file or an
//! interactive front end, and then drives parameter files, the push
//! and the cluster profile.

use tracing::debug;

use crate::error::{CanvosError, Result};
use crate::options::{CniFamily, Family, KubernetesFamily, OptionIndex, OsFamily};

/// Target registry for the provider images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySelection {
    /// Registry host, e.g. `ttl.sh` or `registry.example.com:5000`
    pub url: String,
    /// Repository (namespace) under the host
    pub repository: String,
    pub username: String,
    pub password: String,
}

impl RegistrySelection {
    /// Split `host/namespace` into its two parts.
    ///
    /// The namespace is the second `/` segment and is required; deeper
    /// segments are ignored.
    pub fn from_registry_url(registry_url: &str) -> Result<Self> {
        let mut segments = registry_url.trim().split('/');

        match (segments.next(), segments.next()) {
            (Some(host), Some(namespace)) if !host.is_empty() && !namespace.is_empty() => Ok(Self {
                url: host.to_string(),
                repository: namespace.to_string(),
                ..Default::default()
            }),
            _ => Err(CanvosError::Config(format!(
                "registry URL '{registry_url}' must include a namespace, e.g. ttl.sh/ubuntu"
            ))),
        }
    }

    /// `<registry>/<repository>`, the prefix every pushed image carries
    pub fn image_prefix(&self) -> String {
        format!("{}/{}", self.url, self.repository)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    pub os: OsFamily,
    pub os_version: String,
    /// Version of the BYOOS pack the OS layer is built from
    pub byoos_version: String,

    pub kubernetes: KubernetesFamily,
    pub kubernetes_version: String,

    pub cni: CniFamily,
    pub cni_version: String,

    pub registry: RegistrySelection,
    pub custom_tag: String,

    /// Palette Edge installer version, without the leading `v`
    pub installer_version: String,
    pub iso_name: String,
    pub platform: String,

    pub create_cluster_profile: bool,
    pub cluster_profile_suffix: String,

    pub tenant_registration_token: String,
}

impl SelectionSet {
    /// OS release major version, e.g. `22` for `22.04`
    pub fn os_major_version(&self) -> &str {
        self.os_version
            .split_once('.')
            .map(|(major, _)| major)
            .unwrap_or(&self.os_version)
    }

    /// Fill unset versions with the newest the index offers.
    ///
    /// Fails if a family has no versions at all.
    pub fn fill_latest_versions(&mut self, index: &OptionIndex) -> Result<()> {
        let slots = [
            (Family::Byoos, &mut self.byoos_version),
            (Family::Kubernetes(self.kubernetes), &mut self.kubernetes_version),
            (Family::Cni(self.cni), &mut self.cni_version),
        ];

        for (family, slot) in slots {
            if !slot.is_empty() {
                continue;
            }

            let latest = index
                .latest_version(family)
                .ok_or_else(|| CanvosError::Lookup {
                    family: family.pack_name().to_string(),
                    version: "latest".to_string(),
                })?;

            debug!("Defaulting {} to latest version {}", family, latest);
            *slot = latest.to_string();
        }

        Ok(())
    }
}
