pub mod algorithms;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::*;

use algorithms::TwoTowerModel;
use anyhow::{anyhow, Result};
use services::dataset::BatchedDataset;
use services::export::{build_artifact, Exporter};
use services::firestore::{DocumentSource, FirestoreClient};
use services::ingest::{build_training_frame, SwipeNormalizer, TrainingFrame};
use services::training::{Trainer, TrainingReport};
use tracing::info;

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Runs the whole pipeline against live Firestore collections.
pub async fn run_training(config: Config) -> Result<TrainingReport> {
    let client = FirestoreClient::connect(&config.firestore).await?;
    train_from_source(&client, &config).await
}

/// Fetch, normalize, index, batch, train and export from any document
/// source. Everything is rebuilt from scratch per run; only the exported
/// artifact survives.
pub async fn train_from_source(
    source: &dyn DocumentSource,
    config: &Config,
) -> Result<TrainingReport> {
    let swipe_docs = source
        .list_documents(&config.firestore.swipes_collection)
        .await?;
    let mut normalizer = SwipeNormalizer::new();
    for doc in &swipe_docs {
        normalizer.push(doc);
    }
    let (records, skipped) = normalizer.finish();
    info!("Loaded {} swipes ({} skipped)", records.len(), skipped);

    let home_docs = source
        .list_documents(&config.firestore.homes_collection)
        .await?;
    let home_ids: Vec<String> = home_docs.into_iter().map(|doc| doc.id).collect();
    info!("Loaded {} homes", home_ids.len());

    let TrainingFrame {
        triples,
        user_index,
        home_index,
    } = build_training_frame(&records, &home_ids);
    info!(
        "Built {} training triples over {} users and {} homes",
        triples.len(),
        user_index.len(),
        home_index.len()
    );

    let dataset = BatchedDataset::new(
        triples,
        config.training.batch_size,
        config.training.shuffle_buffer,
    );
    let model = TwoTowerModel::new(
        user_index.len(),
        home_index.len(),
        config.model.embedding_dim,
    );

    let mut trainer = Trainer::new(config.training.clone());
    trainer.compile(model)?;
    let report = trainer.fit(&dataset)?;

    let model = trainer
        .into_model()
        .ok_or_else(|| anyhow!("trainer finished without a model"))?;
    let artifact = build_artifact(&model, &user_index, &home_index);
    Exporter::new(config.export.clone()).save(&artifact)?;

    Ok(report)
}
