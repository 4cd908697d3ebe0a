use crate::algorithms::TwoTowerModel;
use crate::config::ExportConfig;
use crate::models::ModelArtifact;
use crate::services::ingest::IdIndex;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Assembles the exportable artifact: embedding tables plus the id
/// vocabularies, in index order, that give the weights meaning.
pub fn build_artifact(
    model: &TwoTowerModel,
    user_index: &IdIndex,
    home_index: &IdIndex,
) -> ModelArtifact {
    let now = Utc::now();
    ModelArtifact {
        version: format!("v{}", now.timestamp()),
        created_at: now,
        embedding_dim: model.embedding_dim(),
        user_ids: user_index.ids().to_vec(),
        home_ids: home_index.ids().to_vec(),
        user_embedding_weights: model.user_weights(),
        home_embedding_weights: model.home_weights(),
    }
}

/// Writes the artifact to the configured path, overwriting any previous
/// export. Downstream conversion to a browser-loadable format is a
/// separate step outside this crate.
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let path = Path::new(&self.config.model_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(artifact)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write model artifact to {}", path.display()))?;

        info!(
            "Model artifact {} saved to {}",
            artifact.version,
            path.display()
        );
        Ok(path.to_path_buf())
    }
}
