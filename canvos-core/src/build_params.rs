//! Files handed to the image build
//!
//! - `.arg`: flat `KEY=value` build parameters. Key names and their
//!   order are read positionally by the build, so both are fixed.
//! - `user-data`: cloud-config for the Edge installer, carrying the
//!   tenant registration token.

use std::path::Path;
use tracing::info;

use crate::error::{CanvosError, Result};
use crate::selection::SelectionSet;

/// Default build-parameter file name
pub const DEFAULT_ARG_FILE: &str = ".arg";

/// Default installer user-data file name
pub const DEFAULT_USER_DATA_FILE: &str = "user-data";

/// Build-parameter keys, in file order
pub const BUILD_PARAMETER_KEYS: [&str; 9] = [
    "CUSTOM_TAG",
    "IMAGE_REGISTRY",
    "OS_DISTRIBUTION",
    "IMAGE_REPO",
    "OS_VERSION",
    "K8S_DISTRIBUTION",
    "ISO_NAME",
    "PE_VERSION",
    "platform",
];

/// Key/value pairs for the build, normalized for the build tool
pub fn build_parameters(selection: &SelectionSet) -> Vec<(&'static str, String)> {
    let values = [
        selection.custom_tag.clone(),
        selection.registry.url.clone(),
        selection.os.build_arg().to_string(),
        selection.registry.repository.clone(),
        selection.os_major_version().to_string(),
        selection.kubernetes.build_arg().to_string(),
        selection.iso_name.clone(),
        format!("v{}", selection.installer_version),
        selection.platform.clone(),
    ];

    BUILD_PARAMETER_KEYS.into_iter().zip(values).collect()
}

/// Render the build-parameter file: one `KEY=value` per line, no blank lines
pub fn render_build_parameters(selection: &SelectionSet) -> String {
    build_parameters(selection)
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}

pub fn write_build_parameters(path: &Path, selection: &SelectionSet) -> Result<()> {
    std::fs::write(path, render_build_parameters(selection))
        .map_err(|e| CanvosError::io("write build parameters", path, e))?;

    info!("Build parameters written to {}", path.display());
    Ok(())
}

/// Render installer user-data. Indentation is parsed structurally by
/// the installer and must not change.
pub fn render_installer_user_data(token: &str) -> String {
    format!(
        "#cloud-config
stylus:
  site:
    edgeHostToken: {token}
install:
  poweroff: true
users:
  - name: kairos
    passwd: kairos
"
    )
}

pub fn write_installer_user_data(path: &Path, token: &str) -> Result<()> {
    std::fs::write(path, render_installer_user_data(token))
        .map_err(|e| CanvosError::io("write user data", path, e))?;

    info!("Installer user data written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{KubernetesFamily, OsFamily};
    use crate::selection::RegistrySelection;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn demo_selection() -> SelectionSet {
        SelectionSet {
            custom_tag: "demo".to_string(),
            registry: RegistrySelection {
                url: "ttl.sh".to_string(),
                repository: "ubuntu".to_string(),
                ..Default::default()
            },
            os: OsFamily::parse("ubuntu").unwrap(),
            os_version: "22.04".to_string(),
            kubernetes: KubernetesFamily::parse("k3s").unwrap(),
            iso_name: "palette-edge-installer".to_string(),
            installer_version: "3.4.3".to_string(),
            platform: "linux/amd64".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_build_parameters() {
        assert_eq!(
            render_build_parameters(&demo_selection()),
            "CUSTOM_TAG=demo
IMAGE_REGISTRY=ttl.sh
OS_DISTRIBUTION=ubuntu
IMAGE_REPO=ubuntu
OS_VERSION=22
K8S_DISTRIBUTION=k3s
ISO_NAME=palette-edge-installer
PE_VERSION=v3.4.3
platform=linux/amd64
"
        );
    }

    #[test]
    fn test_build_parameter_aliases() {
        let mut selection = demo_selection();
        selection.kubernetes = KubernetesFamily::parse("k8s").unwrap();
        selection.os = OsFamily::parse("opensuse").unwrap();
        selection.os_version = "15.4".to_string();

        let rendered = render_build_parameters(&selection);
        assert!(rendered.contains("\nK8S_DISTRIBUTION=kubeadm\n"));
        assert!(rendered.contains("\nOS_DISTRIBUTION=opensuse-leap\n"));
        assert!(rendered.contains("\nOS_VERSION=15\n"));
    }

    #[test]
    fn test_build_parameters_have_no_blank_lines() {
        let rendered = render_build_parameters(&demo_selection());
        let keys: Vec<&str> = rendered
            .lines()
            .map(|line| line.split_once('=').unwrap().0)
            .collect();

        assert_eq!(keys, BUILD_PARAMETER_KEYS);
        assert!(!rendered.lines().any(|l| l.trim().is_empty()));
    }

    #[test]
    fn test_write_build_parameters() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_ARG_FILE);

        write_build_parameters(&path, &demo_selection()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            render_build_parameters(&demo_selection())
        );
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join(DEFAULT_ARG_FILE);

        let err = write_build_parameters(&path, &demo_selection()).unwrap_err();
        assert!(err.to_string().starts_with("failed to write build parameters"));
    }

    #[test]
    fn test_installer_user_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_USER_DATA_FILE);

        write_installer_user_data(&path, "token-123").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "#cloud-config
stylus:
  site:
    edgeHostToken: token-123
install:
  poweroff: true
users:
  - name: kairos
    passwd: kairos
"
        );
    }
}
