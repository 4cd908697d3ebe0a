use crate::algorithms::optimizer::Adam;
use crate::algorithms::TwoTowerModel;
use crate::config::TrainingConfig;
use crate::services::dataset::BatchedDataset;
use crate::utils::metrics::AucMetric;
use anyhow::{bail, Result};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Uninitialized,
    Compiled,
    Training,
    Done,
}

#[derive(Debug, Clone)]
pub struct EpochReport {
    pub epoch: usize,
    pub loss: f64,
    pub auc: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs: Vec<EpochReport>,
    pub examples: usize,
}

/// Fixed-epoch trainer over a batched dataset. `compile` binds the model,
/// the Adam optimizer and the loss/AUC tracking; `fit` then runs every
/// epoch to completion or fails the whole run. No early stopping, no
/// validation split, no mid-run checkpoints.
pub struct Trainer {
    config: TrainingConfig,
    state: TrainerState,
    model: Option<TwoTowerModel>,
    optimizer: Option<Adam>,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            state: TrainerState::Uninitialized,
            model: None,
            optimizer: None,
        }
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn compile(&mut self, model: TwoTowerModel) -> Result<()> {
        if self.state != TrainerState::Uninitialized {
            bail!("trainer is already compiled");
        }
        self.optimizer = Some(Adam::with_learning_rate(self.config.learning_rate));
        self.model = Some(model);
        self.state = TrainerState::Compiled;
        Ok(())
    }

    pub fn fit(&mut self, dataset: &BatchedDataset) -> Result<TrainingReport> {
        if self.state != TrainerState::Compiled {
            bail!("trainer must be compiled before fit");
        }
        self.state = TrainerState::Training;

        let model = self.model.as_mut().ok_or_else(|| anyhow::anyhow!("no model bound"))?;
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no optimizer bound"))?;

        let mut rng = rand::thread_rng();
        let mut reports = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            let mut auc = AucMetric::default();
            let mut loss_sum = 0.0f64;
            let mut examples = 0usize;

            for batch in dataset.epoch_batches(&mut rng) {
                let (loss, predictions) = model.train_batch(&batch, optimizer);
                if !loss.is_finite() {
                    bail!("non-finite loss at epoch {epoch}, aborting without saving");
                }
                auc.update(&predictions, &batch.ratings);
                loss_sum += loss as f64 * batch.len() as f64;
                examples += batch.len();
            }

            let mean_loss = if examples > 0 {
                loss_sum / examples as f64
            } else {
                0.0
            };
            let auc_value = auc.value();
            let auc_display = auc_value
                .map(|a| format!("{a:.4}"))
                .unwrap_or_else(|| "n/a".to_string());
            info!(
                "Epoch {}/{}: loss {:.4}, AUC {}",
                epoch, self.config.epochs, mean_loss, auc_display
            );

            reports.push(EpochReport {
                epoch,
                loss: mean_loss,
                auc: auc_value,
            });
        }

        self.state = TrainerState::Done;
        Ok(TrainingReport {
            epochs: reports,
            examples: dataset.len(),
        })
    }

    /// Hands back the trained model once fitting is done.
    pub fn into_model(self) -> Option<TwoTowerModel> {
        match self.state {
            TrainerState::Done => self.model,
            _ => None,
        }
    }
}
