//! Option index built from the fetched catalog
//!
//! Folds every fetched pack into a per-family list of versions. Built
//! once, after all catalog queries have joined, then persisted as
//! `options.json` so later commands can resolve selections offline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::{Family, FamilyKind, INSTALLER_VERSIONS};
use crate::catalog::Pack;
use crate::error::{CanvosError, Result};

/// One version of a family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackVersion {
    pub version: String,
    /// Catalog UID of this exact version
    pub uid: String,
}

/// All known versions of one family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyOptions {
    /// Shared by every version of the family
    pub registry_uid: String,
    /// In catalog order, newest first
    pub versions: Vec<PackVersion>,
}

/// Identifiers needed to reference a pack in a cluster profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackIdentifiers {
    pub catalog_uid: String,
    pub registry_uid: String,
}

impl PackIdentifiers {
    /// An empty catalog UID means the lookup found nothing
    pub fn is_resolved(&self) -> bool {
        !self.catalog_uid.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionIndex {
    /// Keyed by canonical pack name
    #[serde(default)]
    pub families: BTreeMap<String, FamilyOptions>,

    #[serde(default)]
    pub installer_versions: Vec<String>,
}

impl OptionIndex {
    pub fn new() -> Self {
        Self {
            families: BTreeMap::new(),
            installer_versions: INSTALLER_VERSIONS.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Fold a deduplicated pack list into an index.
    ///
    /// Packs whose name is not a tracked family are skipped.
    pub fn from_packs(packs: &[Pack]) -> Self {
        let mut index = Self::new();

        for pack in packs {
            match Family::from_pack_name(pack.name()) {
                Some(family) => {
                    index.insert(family, pack.version(), pack.uid(), &pack.spec.registry_uid)
                }
                None => debug!("Skipping untracked pack {} {}", pack.name(), pack.version()),
            }
        }

        info!(
            "Indexed {} packs across {} families",
            packs.len(),
            index.families.len()
        );
        index
    }

    /// Record one version of a family.
    ///
    /// The first non-empty registry UID seen for a family is kept, and a
    /// version already present is not added twice.
    pub fn insert(&mut self, family: Family, version: &str, uid: &str, registry_uid: &str) {
        let entry = self
            .families
            .entry(family.pack_name().to_string())
            .or_default();

        if entry.registry_uid.is_empty() {
            entry.registry_uid = registry_uid.to_string();
        }

        if entry.versions.iter().any(|v| v.version == version) {
            return;
        }

        entry.versions.push(PackVersion {
            version: version.to_string(),
            uid: uid.to_string(),
        });
    }

    pub fn family(&self, family: Family) -> Option<&FamilyOptions> {
        self.families.get(family.pack_name())
    }

    /// Display names of every family of `kind` that has at least one version
    pub fn get_family_options(&self, kind: FamilyKind) -> Vec<&'static str> {
        Family::of_kind(kind)
            .into_iter()
            .filter(|f| self.family(*f).is_some_and(|o| !o.versions.is_empty()))
            .map(|f| f.display_name())
            .collect()
    }

    /// Versions of a family, newest first; empty when the family has none
    pub fn versions(&self, family: Family) -> Vec<&str> {
        self.family(family)
            .map(|o| o.versions.iter().map(|v| v.version.as_str()).collect())
            .unwrap_or_default()
    }

    /// Versions for a family given by any accepted spelling
    pub fn get_versions(&self, family_key: &str) -> Vec<String> {
        match Family::parse(family_key) {
            Ok(family) => self.versions(family).into_iter().map(String::from).collect(),
            Err(e) => {
                debug!("{}", e);
                Vec::new()
            }
        }
    }

    pub fn latest_version(&self, family: Family) -> Option<&str> {
        self.family(family)
            .and_then(|o| o.versions.first())
            .map(|v| v.version.as_str())
    }

    pub fn byoos_versions(&self) -> Vec<&str> {
        self.versions(Family::Byoos)
    }

    pub fn installer_versions(&self) -> &[String] {
        &self.installer_versions
    }

    /// Identifiers for an exact family and version.
    ///
    /// Returns empty identifiers when there is no exact match. Use
    /// [`OptionIndex::resolve`] to get an error instead.
    pub fn resolve_identifiers(&self, family_key: &str, version: &str) -> PackIdentifiers {
        Family::parse(family_key)
            .ok()
            .and_then(|family| self.lookup(family, version))
            .unwrap_or_default()
    }

    /// Identifiers for an exact family and version, or a lookup error
    pub fn resolve(&self, family: Family, version: &str) -> Result<PackIdentifiers> {
        self.lookup(family, version)
            .filter(PackIdentifiers::is_resolved)
            .ok_or_else(|| CanvosError::Lookup {
                family: family.pack_name().to_string(),
                version: version.to_string(),
            })
    }

    fn lookup(&self, family: Family, version: &str) -> Option<PackIdentifiers> {
        let options = self.family(family)?;
        options
            .versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| PackIdentifiers {
                catalog_uid: v.uid.clone(),
                registry_uid: options.registry_uid.clone(),
            })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| CanvosError::io("write options", path, e))?;
        debug!("Saved option index to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CanvosError::io("read options", path, e))?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Layer, PackMetadata, PackSpec};
    use crate::options::{CniFamily, KubernetesFamily, OsFamily};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn pack(uid: &str, name: &str, version: &str, layer: Layer, registry_uid: &str) -> Pack {
        Pack {
            metadata: PackMetadata {
                uid: uid.to_string(),
                name: name.to_string(),
            },
            spec: PackSpec {
                name: name.to_string(),
                version: version.to_string(),
                layer,
                registry_uid: registry_uid.to_string(),
                values: String::new(),
                display_name: String::new(),
                cloud_types: vec!["edge-native".to_string()],
            },
        }
    }

    fn sample_index() -> OptionIndex {
        OptionIndex::from_packs(&[
            pack("byoi-1", "edge-native-byoi", "1.0.0", Layer::Os, "reg-public"),
            pack("k3s-128", "edge-k3s", "1.28.2", Layer::K8s, "reg-public"),
            pack("k3s-127", "edge-k3s", "1.27.5", Layer::K8s, "reg-public"),
            pack("k8s-127", "edge-k8s", "1.27.2", Layer::K8s, "reg-edge"),
            pack("calico-326", "cni-calico", "3.26.1", Layer::Cni, "reg-public"),
            pack("ubuntu-22", "edge-native-ubuntu", "22.04", Layer::Os, "reg-os"),
            pack("mystery", "edge-something-else", "0.1.0", Layer::K8s, "reg-x"),
        ])
    }

    #[test]
    fn test_resolve_returns_inserted_identifiers() {
        let index = sample_index();

        for (key, version, uid, registry) in [
            ("k3s", "1.28.2", "k3s-128", "reg-public"),
            ("k3s", "1.27.5", "k3s-127", "reg-public"),
            ("kubeadm", "1.27.2", "k8s-127", "reg-edge"),
            ("Palette eXtended Kubernetes - Edge (PXK-E)", "1.27.2", "k8s-127", "reg-edge"),
            ("calico", "3.26.1", "calico-326", "reg-public"),
            ("edge-native-byoi", "1.0.0", "byoi-1", "reg-public"),
        ] {
            assert_eq!(
                index.resolve_identifiers(key, version),
                PackIdentifiers {
                    catalog_uid: uid.to_string(),
                    registry_uid: registry.to_string(),
                },
                "{key} {version}"
            );
        }
    }

    #[test]
    fn test_absent_pairs_resolve_to_empty() {
        let index = sample_index();

        for (key, version) in [
            ("k3s", "9.9.9"),
            ("rke2", "1.26.4"),
            ("flannel", "0.22.0"),
            ("not-a-family", "1.0.0"),
        ] {
            let ids = index.resolve_identifiers(key, version);
            assert!(!ids.is_resolved());
            assert_eq!(ids, PackIdentifiers::default());
        }

        let err = index
            .resolve(Family::Kubernetes(KubernetesFamily::Rke2), "1.26.4")
            .unwrap_err();
        assert_eq!(err.to_string(), "no edge-rke2 pack found for version '1.26.4'");
    }

    #[test]
    fn test_family_options_only_list_populated_families() {
        let index = sample_index();

        assert_eq!(
            index.get_family_options(FamilyKind::Kubernetes),
            vec!["Palette eXtended Kubernetes - Edge (PXK-E)", "K3s"]
        );
        assert_eq!(index.get_family_options(FamilyKind::Cni), vec!["Calico"]);
        assert_eq!(index.get_family_options(FamilyKind::OperatingSystem), vec!["ubuntu"]);

        // Empty families are still legal lookups
        assert!(index.get_versions("microk8s").is_empty());
    }

    #[test]
    fn test_versions_keep_catalog_order() {
        let index = sample_index();

        assert_eq!(index.get_versions("K3S"), vec!["1.28.2", "1.27.5"]);
        assert_eq!(index.get_versions("k8s"), index.get_versions("kubeadm"));
        assert_eq!(
            index.latest_version(Family::Kubernetes(KubernetesFamily::K3s)),
            Some("1.28.2")
        );
        assert_eq!(index.byoos_versions(), vec!["1.0.0"]);
        assert_eq!(index.latest_version(Family::Cni(CniFamily::Cilium)), None);
    }

    #[test]
    fn test_duplicate_versions_keep_first() {
        let mut index = OptionIndex::new();
        let family = Family::Os(OsFamily::OpenSuse);
        index.insert(family, "15.4", "first", "");
        index.insert(family, "15.4", "second", "reg-late");

        let options = index.family(family).unwrap();
        assert_eq!(options.versions.len(), 1);
        assert_eq!(options.versions[0].uid, "first");
        assert_eq!(options.registry_uid, "reg-late");
    }

    #[test]
    fn test_installer_versions_present() {
        let index = OptionIndex::from_packs(&[]);
        assert_eq!(index.installer_versions().first().map(String::as_str), Some("3.4.3"));
        assert!(index.families.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.json");

        let index = sample_index();
        index.save(&path).unwrap();

        let loaded = OptionIndex::load(&path).unwrap();
        assert_eq!(loaded, index);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"registryUid\": \"reg-edge\""));
        assert!(raw.contains("\"installerVersions\""));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = OptionIndex::load(&temp_dir.path().join("options.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read options"));
    }
}
