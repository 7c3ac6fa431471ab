//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use metamenu_index::store::FsVault;
use metamenu_index::{FieldIndex, IndexContext, IndexOutcome, IndexReport, IndexSettings};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{Commands, OutputFormat};

/// Settings file looked up in the vault root when `--config` is absent.
pub const VAULT_SETTINGS_FILE: &str = ".metamenu.yaml";

/// Settings path to load, if any.
pub fn settings_path(vault: &Path, config: Option<&Path>) -> Option<PathBuf> {
    if let Some(config) = config {
        return Some(config.to_path_buf());
    }
    let candidate = vault.join(VAULT_SETTINGS_FILE);
    candidate.is_file().then_some(candidate)
}

/// Load settings and run one full pass over the vault.
pub async fn open_index(vault: &Path, config: Option<&Path>) -> Result<(FieldIndex, IndexReport)> {
    if !vault.is_dir() {
        bail!("{} is not a directory", vault.display());
    }
    let path = settings_path(vault, config);
    debug!(settings = ?path, "loading settings");
    let settings = IndexSettings::load(path.as_deref())
        .with_context(|| format!("failed to load settings for {}", vault.display()))?;

    let store = Arc::new(FsVault::new(vault));
    let index = FieldIndex::new(IndexContext::new(settings, store.clone(), store));
    match index.full_index("cli", false, false).await {
        IndexOutcome::Completed(report) => Ok((index, report)),
        IndexOutcome::Deferred => bail!("query engine not ready for {}", vault.display()),
    }
}

pub async fn run(command: &Commands, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let (index, report) = open_index(command.vault(), config).await?;
    for issue in &report.issues {
        tracing::warn!("{issue}");
    }
    let snapshot = index.snapshot().await;

    match command {
        Commands::Index { .. } => {
            info!(generation = report.generation, "index complete");
            emit(format, &report, || {
                format!(
                    "classes: {}\ndocuments: {}\nwith computed values: {}\nissues: {}",
                    report.classes,
                    report.documents,
                    report.documents_with_computed_values,
                    report.issues.len()
                )
            })
        }
        Commands::Fields { document, .. } => {
            let Some(fields) = snapshot.documents.get(document) else {
                bail!("{document} is not an indexed document");
            };
            let existing = index.existence_for(document).await;
            let view = DocumentView {
                path: document,
                fields,
                existing: existing.iter().map(|f| f.id.as_str()).collect(),
            };
            emit(format, &view, || {
                let mut lines = vec![format!(
                    "{document} ({:?}: {})",
                    fields.source,
                    fields.classes.join(", ")
                )];
                for field in &fields.resolved {
                    let marker = if view.existing.contains(&field.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    lines.push(format!(
                        "{marker} {:<24} {:<12} {}",
                        field.name,
                        format!("{:?}", field.type_),
                        field.file_class_name.as_deref().unwrap_or("-")
                    ));
                }
                lines.join("\n")
            })
        }
        Commands::Classes { .. } => emit(format, &snapshot.classes, || {
            snapshot
                .classes
                .values()
                .map(|class| {
                    let names: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
                    format!("{} [{}]: {}", class.name, class.path, names.join(", "))
                })
                .collect::<Vec<_>>()
                .join("\n")
        }),
        Commands::NewId { .. } => {
            let id = index.new_field_id().await;
            emit(format, &id, || id.clone())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentView<'a> {
    path: &'a str,
    fields: &'a metamenu_index::DocumentFields,
    existing: Vec<&'a str>,
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, table: impl FnOnce() -> String) -> Result<()> {
    let output = match format {
        OutputFormat::Table => table(),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}
