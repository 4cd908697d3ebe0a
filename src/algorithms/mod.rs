pub mod initializer;
pub mod optimizer;

use crate::services::dataset::Batch;
use crate::utils::{binary_cross_entropy, sigmoid};
use nalgebra::DVector;
use optimizer::Adam;
use rand::Rng;
use std::collections::HashMap;

/// Matrix-factorization recommender: one embedding table per entity type,
/// combined by inner product and squashed through a sigmoid. No biases and
/// no layers beyond the two tables.
#[derive(Debug, Clone)]
pub struct TwoTowerModel {
    user_embeddings: Vec<DVector<f32>>,
    home_embeddings: Vec<DVector<f32>>,
    embedding_dim: usize,
}

impl TwoTowerModel {
    pub fn new(num_users: usize, num_homes: usize, embedding_dim: usize) -> Self {
        Self::with_rng(num_users, num_homes, embedding_dim, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng>(
        num_users: usize,
        num_homes: usize,
        embedding_dim: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            user_embeddings: initializer::xavier_table(num_users, embedding_dim, rng),
            home_embeddings: initializer::xavier_table(num_homes, embedding_dim, rng),
            embedding_dim,
        }
    }

    pub fn num_users(&self) -> usize {
        self.user_embeddings.len()
    }

    pub fn num_homes(&self) -> usize {
        self.home_embeddings.len()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Like-probability for a single (user, home) pair.
    pub fn score(&self, user_idx: usize, home_idx: usize) -> f32 {
        sigmoid(self.user_embeddings[user_idx].dot(&self.home_embeddings[home_idx]))
    }

    /// Per-example like-probabilities for a batch.
    pub fn forward(&self, batch: &Batch) -> Vec<f32> {
        batch
            .user_idx
            .iter()
            .zip(batch.home_idx.iter())
            .map(|(&u, &h)| self.score(u, h))
            .collect()
    }

    /// One gradient step on a batch, minimizing binary cross-entropy.
    /// Gradients are averaged per touched row and applied through the keyed
    /// Adam state. Returns the mean batch loss and the pre-step predictions.
    pub fn train_batch(&mut self, batch: &Batch, optimizer: &mut Adam) -> (f32, Vec<f32>) {
        if batch.is_empty() {
            return (0.0, Vec::new());
        }

        let predictions = self.forward(batch);

        let mut user_grads: HashMap<usize, (DVector<f32>, f32)> = HashMap::new();
        let mut home_grads: HashMap<usize, (DVector<f32>, f32)> = HashMap::new();
        let mut loss_sum = 0.0f32;

        for i in 0..batch.len() {
            let u = batch.user_idx[i];
            let h = batch.home_idx[i];
            let y = batch.ratings[i];
            let p = predictions[i];

            loss_sum += binary_cross_entropy(p, y);

            // dL/dlogit for sigmoid + BCE
            let g = p - y;

            let (user_grad, user_count) = user_grads
                .entry(u)
                .or_insert_with(|| (DVector::zeros(self.embedding_dim), 0.0));
            *user_grad += &self.home_embeddings[h] * g;
            *user_count += 1.0;

            let (home_grad, home_count) = home_grads
                .entry(h)
                .or_insert_with(|| (DVector::zeros(self.embedding_dim), 0.0));
            *home_grad += &self.user_embeddings[u] * g;
            *home_count += 1.0;
        }

        optimizer.step();
        for (u, (mut grad, count)) in user_grads {
            grad /= count;
            optimizer.update_with_key(&format!("user/{u}"), &mut self.user_embeddings[u], &grad);
        }
        for (h, (mut grad, count)) in home_grads {
            grad /= count;
            optimizer.update_with_key(&format!("home/{h}"), &mut self.home_embeddings[h], &grad);
        }

        (loss_sum / batch.len() as f32, predictions)
    }

    pub fn user_weights(&self) -> Vec<Vec<f32>> {
        self.user_embeddings
            .iter()
            .map(|row| row.as_slice().to_vec())
            .collect()
    }

    pub fn home_weights(&self) -> Vec<Vec<f32>> {
        self.home_embeddings
            .iter()
            .map(|row| row.as_slice().to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainingTriple;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn batch_of(triples: &[(usize, usize, f32)]) -> Batch {
        Batch::from_triples(
            &triples
                .iter()
                .map(|&(user_idx, home_idx, rating)| TrainingTriple {
                    user_idx,
                    home_idx,
                    rating,
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_model_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = TwoTowerModel::with_rng(3, 5, 32, &mut rng);
        assert_eq!(model.num_users(), 3);
        assert_eq!(model.num_homes(), 5);
        assert_eq!(model.user_weights().len(), 3);
        assert_eq!(model.home_weights().len(), 5);
        assert_eq!(model.user_weights()[0].len(), 32);
    }

    #[test]
    fn test_forward_is_a_probability() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = TwoTowerModel::with_rng(2, 2, 32, &mut rng);
        let batch = batch_of(&[(0, 0, 1.0), (1, 1, 0.0)]);

        let predictions = model.forward(&batch);
        assert_eq!(predictions.len(), 2);
        for p in predictions {
            assert!(p > 0.0 && p < 1.0);
        }
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = TwoTowerModel::with_rng(2, 2, 8, &mut rng);
        let mut optimizer = Adam::with_learning_rate(0.05);
        let batch = batch_of(&[(0, 0, 1.0), (0, 1, 0.0), (1, 0, 1.0)]);

        let (first_loss, _) = model.train_batch(&batch, &mut optimizer);
        let mut last_loss = first_loss;
        for _ in 0..50 {
            let (loss, _) = model.train_batch(&batch, &mut optimizer);
            last_loss = loss;
        }

        assert!(last_loss < first_loss);
        assert!(model.score(0, 0) > 0.5);
        assert!(model.score(0, 1) < 0.5);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut model = TwoTowerModel::with_rng(1, 1, 8, &mut rng);
        let before = model.user_weights();

        let (loss, predictions) = model.train_batch(&Batch::default(), &mut Adam::default());
        assert_eq!(loss, 0.0);
        assert!(predictions.is_empty());
        assert_eq!(model.user_weights(), before);
    }
}
