//! Concurrent catalog download
//!
//! Each catalog query runs as its own future and hands its page back to
//! a single collector, so no shared map is written from several tasks.
//! All queries run to completion; failures are gathered, not raced.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{dedupe_packs, flatten_pages, Pack, PackList, PaletteClient};
use crate::error::{CanvosError, Result};

/// The fixed set of catalog queries an `init` run issues, keyed by a
/// short name used in logs.
pub const DEFAULT_PACK_QUERIES: [(&str, &str); 7] = [
    (
        "byoos",
        "filters=spec.cloudTypes=edge-nativeANDspec.name=edge-native-byoi&limit=1&orderBy=spec.version=-1",
    ),
    (
        "cnis",
        "filters=spec.cloudTypes=edge-nativeANDspec.layer=cni&limit=50&orderBy=spec.version=-1",
    ),
    (
        "k3s",
        "filters=spec.cloudTypes=edge-nativeANDspec.layer=k8sANDspec.name=edge-k3s&limit=50&orderBy=spec.version=-1",
    ),
    (
        "pxk-e",
        "filters=spec.cloudTypes=edge-nativeANDspec.layer=k8sANDspec.name=edge-k8s&limit=50&orderBy=spec.version=-1",
    ),
    (
        "rke2",
        "filters=spec.cloudTypes=edge-nativeANDspec.layer=k8sANDspec.name=edge-rke2&limit=50&orderBy=spec.version=-1",
    ),
    (
        "microk8s",
        "filters=spec.cloudTypes=edge-nativeANDspec.layer=k8sANDspec.name=edge-microk8s&limit=50&orderBy=spec.version=-1",
    ),
    (
        "os",
        "filters=spec.cloudTypes=edge-nativeANDspec.layer=os&limit=50&orderBy=spec.version=-1",
    ),
];

/// Anything that can answer a catalog query
#[async_trait]
pub trait PackSource: Send + Sync {
    async fn get_packs(&self, query: &str) -> Result<PackList>;
}

#[async_trait]
impl PackSource for PaletteClient {
    async fn get_packs(&self, query: &str) -> Result<PackList> {
        PaletteClient::get_packs(self, query).await
    }
}

/// Outcome of a concurrent catalog download
#[derive(Debug, Default)]
pub struct CatalogFetch {
    /// Successful pages in query order
    pub pages: Vec<(String, PackList)>,
    /// Failed queries in query order
    pub failures: Vec<(String, CanvosError)>,
}

impl CatalogFetch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Deduplicated packs from every successful page.
    ///
    /// On a partial fetch this is an incomplete but still correct view.
    pub fn packs(&self) -> Vec<Pack> {
        let pages: Vec<PackList> = self.pages.iter().map(|(_, p)| p.clone()).collect();
        flatten_pages(&dedupe_packs(pages))
    }

    /// Require every query to have succeeded
    pub fn into_packs(self) -> Result<Vec<Pack>> {
        let total = self.pages.len() + self.failures.len();
        let failed = self.failures.len();

        if let Some((_, first)) = self.failures.into_iter().next() {
            return Err(CanvosError::BatchFailed {
                failed,
                total,
                first: Box::new(first),
            });
        }

        let pages: Vec<PackList> = self.pages.into_iter().map(|(_, p)| p).collect();
        Ok(flatten_pages(&dedupe_packs(pages)))
    }
}

/// Run every query concurrently and collect the results
pub async fn fetch_catalog<S>(source: &S, queries: &[(&str, &str)]) -> CatalogFetch
where
    S: PackSource + ?Sized,
{
    info!("Downloading pack templates ({} queries)", queries.len());

    let futures: Vec<_> = queries
        .iter()
        .map(|(key, query)| async move {
            let result = source.get_packs(query).await;
            (key.to_string(), result)
        })
        .collect();

    let results = join_all(futures).await;

    let mut fetch = CatalogFetch::default();
    for (key, result) in results {
        match result {
            Ok(page) => {
                debug!("Query '{}' returned {} packs", key, page.items.len());
                fetch.pages.push((key, page));
            }
            Err(e) => {
                warn!("Query '{}' failed: {}", key, e);
                fetch.failures.push((key, e));
            }
        }
    }

    fetch
}
