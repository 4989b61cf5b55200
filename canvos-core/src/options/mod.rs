//! Selectable component options
//!
//! [`Family`] names what can be chosen (OS, Kubernetes distribution,
//! CNI, BYOOS), [`OptionIndex`] records which versions of each family
//! the catalog actually offers.

use std::fmt;

mod family;
mod index;

pub use family::{CniFamily, Family, KubernetesFamily, OsFamily, BYOOS_PACK_NAME};
pub use index::{FamilyOptions, OptionIndex, PackIdentifiers, PackVersion};

/// Palette Edge installer releases offered for selection, newest first
pub const INSTALLER_VERSIONS: [&str; 8] = [
    "3.4.3", "3.4.2", "3.4.1", "3.4.0", "3.3.3", "3.3.2", "3.3.1", "3.3.0",
];

/// The user-facing component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyKind {
    OperatingSystem,
    Kubernetes,
    Cni,
}

impl FamilyKind {
    pub const ALL: [FamilyKind; 3] = [
        FamilyKind::OperatingSystem,
        FamilyKind::Kubernetes,
        FamilyKind::Cni,
    ];
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FamilyKind::OperatingSystem => "operating system",
            FamilyKind::Kubernetes => "kubernetes",
            FamilyKind::Cni => "cni",
        })
    }
}
