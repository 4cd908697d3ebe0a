use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub firestore: FirestoreConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub credentials_path: String,
    /// Overrides the project id from the service account key when set.
    #[serde(default)]
    pub project_id: Option<String>,
    pub swipes_collection: String,
    pub homes_collection: String,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub embedding_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub shuffle_buffer: usize,
    pub epochs: usize,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub model_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firestore: FirestoreConfig {
                credentials_path: "config/service-account.json".to_string(),
                project_id: None,
                swipes_collection: "swipes".to_string(),
                homes_collection: "homes".to_string(),
                page_size: 300,
            },
            model: ModelConfig { embedding_dim: 32 },
            training: TrainingConfig {
                batch_size: 512,
                shuffle_buffer: 10_000,
                epochs: 5,
                learning_rate: 0.001,
            },
            export: ExportConfig {
                model_path: "models/cf_model.json".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SWIPETRAIN"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hyperparameters() {
        let config = Config::default();
        assert_eq!(config.model.embedding_dim, 32);
        assert_eq!(config.training.batch_size, 512);
        assert_eq!(config.training.shuffle_buffer, 10_000);
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.firestore.swipes_collection, "swipes");
        assert_eq!(config.firestore.homes_collection, "homes");
    }

    #[test]
    fn test_from_file_missing() {
        assert!(Config::from_file("config/does-not-exist").is_err());
    }
}
