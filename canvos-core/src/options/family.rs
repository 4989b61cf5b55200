//! Component families and their name synonyms
//!
//! Every place that turns a human-entered or catalog-provided family
//! name into a family goes through the `parse` functions here. The
//! synonym table lives in one spot:
//!
//! | Input (case-insensitive)                                   | Family            |
//! |------------------------------------------------------------|-------------------|
//! | `k8s`, `kubeadm`, `pxk-e`, `Palette eXtended Kubernetes - Edge (PXK-E)` | Kubeadm |
//! | `opensuse`, `opensuse-leap`                                | openSUSE Leap     |
//! | `edge-native-byoi`, `byoos`, `byoi`                        | BYOOS             |
//!
//! Canonical pack names (`edge-k3s`, `cni-calico`, ...) are accepted too.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::FamilyKind;
use crate::catalog::Layer;
use crate::error::{CanvosError, Result};

/// Kubernetes distributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KubernetesFamily {
    /// Palette eXtended Kubernetes - Edge
    Kubeadm,
    #[default]
    K3s,
    Rke2,
    #[serde(rename = "microk8s")]
    MicroK8s,
}

impl KubernetesFamily {
    /// Selection order
    pub const ALL: [KubernetesFamily; 4] = [
        KubernetesFamily::Kubeadm,
        KubernetesFamily::K3s,
        KubernetesFamily::Rke2,
        KubernetesFamily::MicroK8s,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        match normalize(name).as_str() {
            "k8s" | "kubeadm" | "pxk-e" | "edge-k8s"
            | "palette extended kubernetes - edge (pxk-e)" => Ok(KubernetesFamily::Kubeadm),
            "k3s" | "edge-k3s" => Ok(KubernetesFamily::K3s),
            "rke2" | "edge-rke2" => Ok(KubernetesFamily::Rke2),
            "microk8s" | "edge-microk8s" => Ok(KubernetesFamily::MicroK8s),
            _ => Err(unknown("kubernetes", name)),
        }
    }

    /// Short key used in generated values and logs
    pub fn key(&self) -> &'static str {
        match self {
            KubernetesFamily::Kubeadm => "k8s",
            KubernetesFamily::K3s => "k3s",
            KubernetesFamily::Rke2 => "rke2",
            KubernetesFamily::MicroK8s => "microk8s",
        }
    }

    /// Value the image build expects for `K8S_DISTRIBUTION`
    pub fn build_arg(&self) -> &'static str {
        match self {
            KubernetesFamily::Kubeadm => "kubeadm",
            other => other.key(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            KubernetesFamily::Kubeadm => "Palette eXtended Kubernetes - Edge (PXK-E)",
            KubernetesFamily::K3s => "K3s",
            KubernetesFamily::Rke2 => "RKE2",
            KubernetesFamily::MicroK8s => "MicroK8s",
        }
    }

    pub fn pack_name(&self) -> &'static str {
        match self {
            KubernetesFamily::Kubeadm => "edge-k8s",
            KubernetesFamily::K3s => "edge-k3s",
            KubernetesFamily::Rke2 => "edge-rke2",
            KubernetesFamily::MicroK8s => "edge-microk8s",
        }
    }
}

/// Operating system distributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    #[default]
    Ubuntu,
    #[serde(rename = "opensuse")]
    OpenSuse,
}

impl OsFamily {
    pub const ALL: [OsFamily; 2] = [OsFamily::Ubuntu, OsFamily::OpenSuse];

    pub fn parse(name: &str) -> Result<Self> {
        match normalize(name).as_str() {
            "ubuntu" | "edge-native-ubuntu" => Ok(OsFamily::Ubuntu),
            "opensuse" | "opensuse-leap" | "suse" | "edge-native-opensuse" => {
                Ok(OsFamily::OpenSuse)
            }
            _ => Err(unknown("operating system", name)),
        }
    }

    /// Raw family key, used in generated values
    pub fn key(&self) -> &'static str {
        match self {
            OsFamily::Ubuntu => "ubuntu",
            OsFamily::OpenSuse => "opensuse",
        }
    }

    /// Name shown to users and written as `OS_DISTRIBUTION`
    pub fn display_name(&self) -> &'static str {
        match self {
            OsFamily::Ubuntu => "ubuntu",
            OsFamily::OpenSuse => "opensuse-leap",
        }
    }

    pub fn build_arg(&self) -> &'static str {
        self.display_name()
    }

    pub fn pack_name(&self) -> &'static str {
        match self {
            OsFamily::Ubuntu => "edge-native-ubuntu",
            OsFamily::OpenSuse => "edge-native-opensuse",
        }
    }
}

/// Container network interfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CniFamily {
    #[default]
    Calico,
    Flannel,
    Cilium,
    Custom,
}

impl CniFamily {
    pub const ALL: [CniFamily; 4] = [
        CniFamily::Calico,
        CniFamily::Flannel,
        CniFamily::Cilium,
        CniFamily::Custom,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        match normalize(name).as_str() {
            "calico" | "cni-calico" => Ok(CniFamily::Calico),
            "flannel" | "cni-flannel" => Ok(CniFamily::Flannel),
            "cilium" | "cni-cilium" => Ok(CniFamily::Cilium),
            "custom" | "cni-custom" => Ok(CniFamily::Custom),
            _ => Err(unknown("cni", name)),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CniFamily::Calico => "calico",
            CniFamily::Flannel => "flannel",
            CniFamily::Cilium => "cilium",
            CniFamily::Custom => "custom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CniFamily::Calico => "Calico",
            CniFamily::Flannel => "Flannel",
            CniFamily::Cilium => "Cilium",
            CniFamily::Custom => "Custom",
        }
    }

    pub fn pack_name(&self) -> &'static str {
        match self {
            CniFamily::Calico => "cni-calico",
            CniFamily::Flannel => "cni-flannel",
            CniFamily::Cilium => "cni-cilium",
            CniFamily::Custom => "cni-custom",
        }
    }
}

/// Any family the option index tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// Bring-your-own-OS pack that carries the provider image reference
    Byoos,
    Os(OsFamily),
    Kubernetes(KubernetesFamily),
    Cni(CniFamily),
}

/// Canonical pack name of the BYOOS family
pub const BYOOS_PACK_NAME: &str = "edge-native-byoi";

impl Family {
    /// Parse a family key from any of the accepted spellings
    pub fn parse(name: &str) -> Result<Self> {
        if matches!(normalize(name).as_str(), "byoos" | "byoi" | BYOOS_PACK_NAME) {
            return Ok(Family::Byoos);
        }

        KubernetesFamily::parse(name)
            .map(Family::Kubernetes)
            .or_else(|_| OsFamily::parse(name).map(Family::Os))
            .or_else(|_| CniFamily::parse(name).map(Family::Cni))
            .map_err(|_| unknown("component", name))
    }

    /// Family for a catalog pack name, if it is one the index tracks
    pub fn from_pack_name(pack_name: &str) -> Option<Self> {
        if pack_name == BYOOS_PACK_NAME {
            return Some(Family::Byoos);
        }
        Self::all().find(|f| f.pack_name() == pack_name)
    }

    pub fn all() -> impl Iterator<Item = Family> {
        std::iter::once(Family::Byoos)
            .chain(OsFamily::ALL.into_iter().map(Family::Os))
            .chain(KubernetesFamily::ALL.into_iter().map(Family::Kubernetes))
            .chain(CniFamily::ALL.into_iter().map(Family::Cni))
    }

    pub fn of_kind(kind: FamilyKind) -> Vec<Family> {
        match kind {
            FamilyKind::OperatingSystem => OsFamily::ALL.into_iter().map(Family::Os).collect(),
            FamilyKind::Kubernetes => KubernetesFamily::ALL
                .into_iter()
                .map(Family::Kubernetes)
                .collect(),
            FamilyKind::Cni => CniFamily::ALL.into_iter().map(Family::Cni).collect(),
        }
    }

    pub fn pack_name(&self) -> &'static str {
        match self {
            Family::Byoos => BYOOS_PACK_NAME,
            Family::Os(f) => f.pack_name(),
            Family::Kubernetes(f) => f.pack_name(),
            Family::Cni(f) => f.pack_name(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Family::Byoos => BYOOS_PACK_NAME,
            Family::Os(f) => f.display_name(),
            Family::Kubernetes(f) => f.display_name(),
            Family::Cni(f) => f.display_name(),
        }
    }

    pub fn layer(&self) -> Layer {
        match self {
            Family::Byoos | Family::Os(_) => Layer::Os,
            Family::Kubernetes(_) => Layer::K8s,
            Family::Cni(_) => Layer::Cni,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pack_name())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn unknown(kind: &'static str, name: &str) -> CanvosError {
    CanvosError::UnknownFamily {
        kind,
        name: name.to_string(),
    }
}
