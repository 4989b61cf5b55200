//! Command implementations

use anyhow::{bail, Context, Result};
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{info, warn};

use canvos_core::build_params::{write_build_parameters, write_installer_user_data};
use canvos_core::catalog::{fetch_catalog, PaletteClient, TemplateStore, DEFAULT_PACK_QUERIES};
use canvos_core::config::{generate_example_config, CliConfig, ConfigFile};
use canvos_core::options::{Family, FamilyKind, OptionIndex};
use canvos_core::profile::assemble_cluster_profile;
use canvos_core::push::{push_artifacts, DockerEngine, RegistryAuth};
use canvos_core::SelectionSet;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn load_config(path: &Path) -> Result<(ConfigFile, SelectionSet)> {
    let config = ConfigFile::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    let selection = SelectionSet::from_config(&config)?;
    Ok((config, selection))
}

fn load_index(store: &TemplateStore) -> Result<OptionIndex> {
    OptionIndex::load(&store.options_path()).context("No option index found. Run `canvos init` first")
}

fn palette_client(cli_config: &CliConfig) -> Result<PaletteClient> {
    cli_config.require_api_key()?;
    Ok(PaletteClient::with_version(cli_config.palette.clone(), VERSION)?)
}

pub async fn execute_init(canvos_dir: &Path, config: Option<&Path>, strict: bool) -> Result<()> {
    let mut cli_config = CliConfig::from_env().with_canvos_dir(canvos_dir);
    if let Some(path) = config {
        let (file, _) = load_config(path)?;
        cli_config.merge_config_file(&file);
    }

    let client = palette_client(&cli_config)?;
    let store = cli_config.template_store();
    store.prepare()?;

    let fetch = fetch_catalog(&client, &DEFAULT_PACK_QUERIES).await;
    let packs = if strict || fetch.is_complete() {
        fetch
            .into_packs()
            .context("Failed to download the pack catalog")?
    } else {
        warn!(
            "{} of {} catalog queries failed; continuing with a partial option index",
            fetch.failures.len(),
            fetch.failures.len() + fetch.pages.len()
        );
        fetch.packs()
    };

    let written = store.write_pack_templates(&packs)?;
    let index = OptionIndex::from_packs(&packs);
    index.save(&store.options_path())?;

    info!(
        "Wrote {} pack templates to {}",
        written,
        store.root().display()
    );
    Ok(())
}

/// Table row for available options
#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Versions")]
    versions: String,
}

fn option_rows(index: &OptionIndex) -> Vec<OptionRow> {
    let mut rows: Vec<OptionRow> = FamilyKind::ALL
        .into_iter()
        .flat_map(|kind| {
            Family::of_kind(kind)
                .into_iter()
                .filter(move |family| !index.versions(*family).is_empty())
                .map(move |family| OptionRow {
                    kind: kind.to_string(),
                    family: family.display_name().to_string(),
                    versions: index.versions(family).join(", "),
                })
        })
        .collect();

    rows.push(OptionRow {
        kind: "byoos".to_string(),
        family: Family::Byoos.display_name().to_string(),
        versions: index.byoos_versions().join(", "),
    });
    rows.push(OptionRow {
        kind: "installer".to_string(),
        family: "palette-edge-installer".to_string(),
        versions: index.installer_versions().join(", "),
    });

    rows
}

pub fn execute_options(canvos_dir: &Path, json_output: bool) -> Result<()> {
    let store = TemplateStore::new(canvos_dir);
    let index = load_index(&store)?;

    if json_output {
        println!("{}", index.to_json()?);
        return Ok(());
    }

    let table = Table::new(option_rows(&index))
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
    Ok(())
}

pub fn execute_generate(config: &Path, arg_file: &Path, user_data: &Path) -> Result<()> {
    let (_, selection) = load_config(config)?;

    write_build_parameters(arg_file, &selection).context("Error creating the args file")?;

    if selection.tenant_registration_token.is_empty() {
        warn!("No tenant registration token configured; skipping {}", user_data.display());
    } else {
        write_installer_user_data(user_data, &selection.tenant_registration_token)
            .context("Error creating the user-data file")?;
    }

    Ok(())
}

pub async fn execute_push(config: &Path) -> Result<()> {
    let (_, selection) = load_config(config)?;

    let auth = RegistryAuth::new(&selection.registry.username, &selection.registry.password)
        .encode()?;
    let engine = DockerEngine::from_env()?;
    info!("Using image engine at {}", engine.endpoint());

    let mut stdout = std::io::stdout();
    let pushed = push_artifacts(&engine, &auth, &selection, &mut stdout)
        .await
        .context("Error pushing the images to the registry")?;

    for image in pushed {
        println!("{image}");
    }
    Ok(())
}

pub async fn execute_profile(
    canvos_dir: &Path,
    config: &Path,
    dry_run: bool,
    output: Option<&Path>,
) -> Result<()> {
    let (file, mut selection) = load_config(config)?;

    if !selection.create_cluster_profile && !dry_run {
        info!("clusterProfile.createClusterProfile is false; nothing to do");
        return Ok(());
    }

    let mut cli_config = CliConfig::from_env().with_canvos_dir(canvos_dir);
    cli_config.merge_config_file(&file);

    let store = cli_config.template_store();
    let index = load_index(&store)?;
    selection.fill_latest_versions(&index)?;

    let profile = assemble_cluster_profile(&selection, &index, &store)
        .context("Error creating the cluster profile payload")?;

    if let Some(path) = output {
        profile.save(path)?;
        info!("Cluster profile payload written to {}", path.display());
    }

    if dry_run {
        println!("{}", profile.to_json_pretty()?);
        return Ok(());
    }

    let client = palette_client(&cli_config)?;
    let uid = client
        .create_cluster_profile(&profile)
        .await
        .context("Error creating the cluster profile")?;

    if uid.is_empty() {
        bail!("Palette returned an empty cluster profile UID");
    }

    client
        .publish_cluster_profile(&uid)
        .await
        .context("Error publishing the cluster profile")?;

    info!("Created and published cluster profile {}", profile.metadata.name);
    println!("{uid}");
    Ok(())
}

pub fn execute_example_config(output: &Path) -> Result<()> {
    generate_example_config(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvos_core::options::KubernetesFamily;
    use tempfile::TempDir;

    #[test]
    fn test_option_rows_skip_empty_families() {
        let mut index = OptionIndex::new();
        index.insert(Family::Kubernetes(KubernetesFamily::K3s), "1.27.5", "a", "r");
        index.insert(Family::Kubernetes(KubernetesFamily::K3s), "1.26.8", "b", "r");
        index.insert(Family::Byoos, "1.0.0", "c", "r");

        let rows = option_rows(&index);
        let families: Vec<&str> = rows.iter().map(|r| r.family.as_str()).collect();
        assert_eq!(families, vec!["K3s", "edge-native-byoi", "palette-edge-installer"]);
        assert_eq!(rows[0].kind, "kubernetes");
        assert_eq!(rows[0].versions, "1.27.5, 1.26.8");
    }

    #[test]
    fn test_generate_writes_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("config.yml");
        generate_example_config(&config).unwrap();

        let arg_file = temp_dir.path().join(".arg");
        let user_data = temp_dir.path().join("user-data");
        execute_generate(&config, &arg_file, &user_data).unwrap();

        let args = std::fs::read_to_string(&arg_file).unwrap();
        assert!(args.starts_with("CUSTOM_TAG=palette-learn\n"));
        assert!(args.contains("K8S_DISTRIBUTION=kubeadm\n"));
        assert!(std::fs::read_to_string(&user_data)
            .unwrap()
            .contains("edgeHostToken: 1234567890"));
    }

    #[test]
    fn test_options_without_init() {
        let temp_dir = TempDir::new().unwrap();
        let err = execute_options(temp_dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("canvos init"));
    }
}
