//! Error types for catalog resolution and artifact assembly
//!
//! Every fallible operation in the core returns [`CanvosError`]. The
//! variants follow the failure classes callers have to tell apart:
//! lookups, template contracts, I/O, partial batches and validation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanvosError {
    /// No catalog entry matches the requested family and version
    #[error("no {family} pack found for version '{version}'")]
    Lookup { family: String, version: String },

    /// A family name that is not part of the known set
    #[error("unknown {kind} family '{name}'")]
    UnknownFamily { kind: &'static str, name: String },

    /// A cluster profile layer could not be resolved or rendered
    #[error("error getting the {layer} pack values")]
    PackValues {
        layer: &'static str,
        #[source]
        source: Box<CanvosError>,
    },

    /// The OS template is missing its `system.uri: ""` anchor line
    #[error("unable to find system.uri in {}", path.display())]
    AnchorNotFound { path: PathBuf },

    /// A catalog item declared a layer outside os/k8s/cni
    #[error("invalid pack layer '{0}'")]
    InvalidLayer(String),

    /// A pack name or version that cannot be used as a file name
    #[error("pack '{name}' version '{version}' is not a valid template file name")]
    UnsafePackName { name: String, version: String },

    /// A push progress line was not a JSON object
    #[error("malformed push progress line '{line}'")]
    ProgressStream {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {operation} {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single image upload failed
    #[error("error pushing the image {image} to the registry: {message}")]
    PushFailed { image: String, message: String },

    /// At least one task of a concurrent batch failed
    #[error("{failed} of {total} tasks failed; first error: {first}")]
    BatchFailed {
        failed: usize,
        total: usize,
        #[source]
        first: Box<CanvosError>,
    },

    #[error("no Edge provider images found matching {filter}. Try to issue the build command again")]
    NoImagesFound { filter: String },

    /// Structured error returned by the Palette API
    #[error("Palette API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        reference: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CanvosError {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        CanvosError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn pack_values(layer: &'static str, source: CanvosError) -> Self {
        CanvosError::PackValues {
            layer,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, CanvosError>;
