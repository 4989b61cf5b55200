//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use canvos_core::catalog::{Layer, Pack, PackList, PackMetadata, PackSource, PackSpec};
use canvos_core::{CanvosError, Result};
use std::collections::HashMap;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const BYOI_VALUES: &str = "pack:
  content:
    images:
      - image: \"{{.spectro.pack.edge-native-byoi.options.system.uri}}\"
options:
  system.uri: \"\"
";

pub fn pack(uid: &str, name: &str, version: &str, layer: Layer, values: &str) -> Pack {
    Pack {
        metadata: PackMetadata {
            uid: uid.to_string(),
            name: name.to_string(),
        },
        spec: PackSpec {
            name: name.to_string(),
            version: version.to_string(),
            layer,
            registry_uid: format!("registry-{}", layer),
            values: values.to_string(),
            display_name: String::new(),
            cloud_types: vec!["edge-native".to_string()],
        },
    }
}

/// Catalog that answers by query key; unknown keys fail
pub struct StaticCatalog {
    pub pages: HashMap<String, Vec<Pack>>,
}

impl StaticCatalog {
    /// A small catalog covering every layer. The `cnis` and `k3s`
    /// pages overlap on one pack.
    pub fn sample() -> Self {
        let calico = pack("calico-3261", "cni-calico", "3.26.1", Layer::Cni, "manifests:\n  calico: {}\n");
        let k3s_new = pack("k3s-1275", "edge-k3s", "1.27.5", Layer::K8s, "cluster:\n  config: new\n");

        let mut pages = HashMap::new();
        pages.insert(
            "byoos".to_string(),
            vec![pack("byoi-100", "edge-native-byoi", "1.0.0", Layer::Os, BYOI_VALUES)],
        );
        pages.insert(
            "cnis".to_string(),
            vec![
                calico.clone(),
                pack("flannel-0220", "cni-flannel", "0.22.0", Layer::Cni, "manifests: {}\n"),
            ],
        );
        pages.insert(
            "k3s".to_string(),
            vec![
                k3s_new,
                pack("k3s-1268", "edge-k3s", "1.26.8", Layer::K8s, "cluster:\n  config: old\n"),
                calico,
            ],
        );
        pages.insert(
            "pxk-e".to_string(),
            vec![pack("k8s-1275", "edge-k8s", "1.27.5", Layer::K8s, "cluster: {}\n")],
        );
        pages.insert("rke2".to_string(), vec![]);
        pages.insert("microk8s".to_string(), vec![]);
        pages.insert(
            "os".to_string(),
            vec![pack("ubuntu-2204", "edge-native-ubuntu", "22.04", Layer::Os, "os: {}\n")],
        );

        Self { pages }
    }
}

#[async_trait]
impl PackSource for StaticCatalog {
    async fn get_packs(&self, query: &str) -> Result<PackList> {
        self.pages
            .get(query)
            .map(|items| PackList {
                items: items.clone(),
                ..Default::default()
            })
            .ok_or_else(|| CanvosError::Api {
                status: 500,
                code: "InternalError".to_string(),
                message: format!("no page for {query}"),
                reference: String::new(),
            })
    }
}

/// Queries whose key doubles as the query string
pub fn keyed_queries(keys: &[&'static str]) -> Vec<(&'static str, &'static str)> {
    keys.iter().map(|k| (*k, *k)).collect()
}
