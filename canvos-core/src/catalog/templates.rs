//! On-disk pack templates
//!
//! Each fetched pack's raw values are written under the CanvOS working
//! directory, one directory per layer:
//!
//! ```text
//! .canvos/
//! ├── os/   edge-native-byoi-1.0.0.yaml
//! ├── k8s/  edge-k3s-1.27.5.yaml
//! ├── cni/  cni-calico-3.26.1.yaml
//! └── options.json
//! ```

use std::path::{Path, PathBuf};
use tracing::debug;

use super::{template_file_name, Layer, Pack};
use crate::error::{CanvosError, Result};

/// Default CanvOS working directory name
pub const DEFAULT_CANVOS_DIR: &str = ".canvos";

/// File name of the persisted option index
pub const OPTIONS_FILE_NAME: &str = "options.json";

/// Reader and writer for the per-layer template files
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layer_dir(&self, layer: Layer) -> PathBuf {
        self.root.join(layer.as_str())
    }

    pub fn template_path(&self, layer: Layer, name: &str, version: &str) -> PathBuf {
        self.layer_dir(layer).join(template_file_name(name, version))
    }

    /// `template_path` for names that come from the catalog.
    ///
    /// Names and versions must be plain file name components.
    fn checked_template_path(&self, layer: Layer, name: &str, version: &str) -> Result<PathBuf> {
        if !is_file_component(name) || !is_file_component(version) {
            return Err(CanvosError::UnsafePackName {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        Ok(self.template_path(layer, name, version))
    }

    pub fn options_path(&self) -> PathBuf {
        self.root.join(OPTIONS_FILE_NAME)
    }

    /// Recreate the working directory from scratch
    pub fn prepare(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)
                .map_err(|e| CanvosError::io("remove", &self.root, e))?;
        }

        std::fs::create_dir_all(&self.root)
            .map_err(|e| CanvosError::io("create directory", &self.root, e))?;

        Ok(())
    }

    /// Write every pack's values to its layer directory
    pub fn write_pack_templates(&self, packs: &[Pack]) -> Result<usize> {
        for layer in Layer::ALL {
            let dir = self.layer_dir(layer);
            std::fs::create_dir_all(&dir)
                .map_err(|e| CanvosError::io("create directory", &dir, e))?;
        }

        for pack in packs {
            let path = self.checked_template_path(pack.layer(), pack.name(), pack.version())?;
            std::fs::write(&path, &pack.spec.values)
                .map_err(|e| CanvosError::io("write template", &path, e))?;
            debug!("Wrote template {}", path.display());
        }

        Ok(packs.len())
    }

    /// Read one template back verbatim
    pub fn read_pack_values(&self, layer: Layer, name: &str, version: &str) -> Result<String> {
        let path = self.checked_template_path(layer, name, version)?;
        std::fs::read_to_string(&path).map_err(|e| CanvosError::io("read template", &path, e))
    }
}

fn is_file_component(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(DEFAULT_CANVOS_DIR)
    }
}
