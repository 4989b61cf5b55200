//! Catalog response types
//!
//! Mirrors the subset of the Palette `/v1/packs` response the build
//! needs. Identifiers are opaque strings and are never parsed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CanvosError;

/// Cluster profile layer a pack belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Layer {
    Os,
    K8s,
    Cni,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Os, Layer::K8s, Layer::Cni];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Os => "os",
            Layer::K8s => "k8s",
            Layer::Cni => "cni",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = CanvosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "os" => Ok(Layer::Os),
            "k8s" => Ok(Layer::K8s),
            "cni" => Ok(Layer::Cni),
            other => Err(CanvosError::InvalidLayer(other.to_string())),
        }
    }
}

impl TryFrom<String> for Layer {
    type Error = CanvosError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Layer> for String {
    fn from(layer: Layer) -> Self {
        layer.as_str().to_string()
    }
}

/// One page of catalog results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackList {
    #[serde(default)]
    pub items: Vec<Pack>,

    #[serde(default)]
    pub listmeta: ListMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default, rename = "continue")]
    pub continue_token: String,
}

/// A single versioned component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub metadata: PackMetadata,
    pub spec: PackSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackMetadata {
    /// Catalog identifier of this pack version
    pub uid: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSpec {
    /// Canonical pack name, e.g. `edge-k3s` or `cni-calico`
    pub name: String,

    pub version: String,

    pub layer: Layer,

    /// Registry identifier shared by every version of the pack
    #[serde(default)]
    pub registry_uid: String,

    /// Raw templated values
    #[serde(default)]
    pub values: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub cloud_types: Vec<String>,
}

impl Pack {
    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn version(&self) -> &str {
        &self.spec.version
    }

    pub fn layer(&self) -> Layer {
        self.spec.layer
    }

    /// File name used when the pack's values are written to disk
    pub fn template_file_name(&self) -> String {
        template_file_name(&self.spec.name, &self.spec.version)
    }
}

pub fn template_file_name(name: &str, version: &str) -> String {
    format!("{name}-{version}.yaml")
}

/// Drop packs whose catalog UID was already seen on this or an earlier page.
///
/// Page boundaries and list metadata are kept; only items are filtered.
pub fn dedupe_packs(pages: Vec<PackList>) -> Vec<PackList> {
    let mut seen = HashSet::new();

    pages
        .into_iter()
        .map(|page| PackList {
            items: page
                .items
                .into_iter()
                .filter(|pack| seen.insert(pack.metadata.uid.clone()))
                .collect(),
            listmeta: page.listmeta,
        })
        .collect()
}

/// Flatten pages into a single ordered list of packs
pub fn flatten_pages(pages: &[PackList]) -> Vec<Pack> {
    pages.iter().flat_map(|p| p.items.iter().cloned()).collect()
}
