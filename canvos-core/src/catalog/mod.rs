//! CanvOS catalog - pack discovery from the Palette API
//!
//! # Overview
//!
//! The catalog layer:
//! - Fetches versioned packs (OS, Kubernetes, CNI) from Palette
//! - Deduplicates packs that appear on more than one result page
//! - Writes each pack's raw values to `.canvos/<layer>/`
//! - Submits assembled cluster profiles back to Palette
//!
//! # Architecture
//!
//! ```text
//! Palette API (/v1/packs)
//!     │
//!     ├── fetch_catalog   ← one future per query, joined
//!     │        │
//!     │        ▼
//!     │   dedupe_packs    ← first UID wins
//!     │        │
//!     │        ├──► TemplateStore (.canvos/<layer>/*.yaml)
//!     │        └──► OptionIndex  (.canvos/options.json)
//!     │
//!     └── /v1/clusterprofiles ← create + publish
//! ```

mod client;
mod fetch;
mod model;
mod templates;

pub use client::{user_agent, PaletteAuth, PaletteClient, DEFAULT_PALETTE_HOST, DEFAULT_USER_AGENT};
pub use fetch::{fetch_catalog, CatalogFetch, PackSource, DEFAULT_PACK_QUERIES};
pub use model::{
    dedupe_packs, flatten_pages, template_file_name, Layer, ListMeta, Pack, PackList,
    PackMetadata, PackSpec,
};
pub use templates::{TemplateStore, DEFAULT_CANVOS_DIR, OPTIONS_FILE_NAME};
