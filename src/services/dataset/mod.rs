use crate::models::TrainingTriple;
use rand::Rng;

/// One training batch in column layout.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub user_idx: Vec<usize>,
    pub home_idx: Vec<usize>,
    pub ratings: Vec<f32>,
}

impl Batch {
    pub fn from_triples(triples: &[TrainingTriple]) -> Self {
        let mut batch = Self {
            user_idx: Vec::with_capacity(triples.len()),
            home_idx: Vec::with_capacity(triples.len()),
            ratings: Vec::with_capacity(triples.len()),
        };
        for triple in triples {
            batch.user_idx.push(triple.user_idx);
            batch.home_idx.push(triple.home_idx);
            batch.ratings.push(triple.rating);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

/// Shuffled, fixed-size batches over the triples table. Each call to
/// [`epoch_batches`](Self::epoch_batches) is a fresh pass, so the sequence
/// restarts per epoch with a new shuffle.
#[derive(Debug, Clone)]
pub struct BatchedDataset {
    triples: Vec<TrainingTriple>,
    batch_size: usize,
    shuffle_buffer: usize,
}

impl BatchedDataset {
    pub fn new(triples: Vec<TrainingTriple>, batch_size: usize, shuffle_buffer: usize) -> Self {
        Self {
            triples,
            batch_size: batch_size.max(1),
            shuffle_buffer: shuffle_buffer.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn epoch_batches<R: Rng>(&self, rng: &mut R) -> Vec<Batch> {
        let shuffled = bounded_shuffle(&self.triples, self.shuffle_buffer, rng);
        shuffled
            .chunks(self.batch_size)
            .map(Batch::from_triples)
            .collect()
    }
}

/// Approximate shuffle through a bounded buffer: fill the buffer, then emit
/// a uniformly random slot and refill it from the source, draining the
/// remainder in random order. Not a full permutation when the buffer is
/// smaller than the data.
fn bounded_shuffle<R: Rng>(
    triples: &[TrainingTriple],
    capacity: usize,
    rng: &mut R,
) -> Vec<TrainingTriple> {
    let mut buffer: Vec<TrainingTriple> = Vec::with_capacity(capacity.min(triples.len()));
    let mut out = Vec::with_capacity(triples.len());

    for &triple in triples {
        if buffer.len() < capacity {
            buffer.push(triple);
            continue;
        }
        let slot = rng.gen_range(0..buffer.len());
        out.push(std::mem::replace(&mut buffer[slot], triple));
    }

    while !buffer.is_empty() {
        let slot = rng.gen_range(0..buffer.len());
        out.push(buffer.swap_remove(slot));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn triples(n: usize) -> Vec<TrainingTriple> {
        (0..n)
            .map(|i| TrainingTriple {
                user_idx: i,
                home_idx: i % 7,
                rating: (i % 2) as f32,
            })
            .collect()
    }

    fn sorted_user_ids(batches: &[Batch]) -> Vec<usize> {
        let mut ids: Vec<usize> = batches.iter().flat_map(|b| b.user_idx.clone()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_batching_is_size_preserving() {
        let data = triples(1000);
        let dataset = BatchedDataset::new(data, 512, 100);
        let mut rng = StdRng::seed_from_u64(11);

        let batches = dataset.epoch_batches(&mut rng);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 512);
        assert_eq!(batches[1].len(), 488);

        // every triple appears exactly once
        assert_eq!(sorted_user_ids(&batches), (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_epochs_restart_with_full_data() {
        let dataset = BatchedDataset::new(triples(50), 16, 10);
        let mut rng = StdRng::seed_from_u64(12);

        let first = dataset.epoch_batches(&mut rng);
        let second = dataset.epoch_batches(&mut rng);
        assert_eq!(sorted_user_ids(&first), sorted_user_ids(&second));
    }

    #[test]
    fn test_capacity_one_buffer_preserves_order() {
        let data = triples(20);
        let dataset = BatchedDataset::new(data.clone(), 20, 1);
        let mut rng = StdRng::seed_from_u64(13);

        let batches = dataset.epoch_batches(&mut rng);
        assert_eq!(batches[0].user_idx, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_large_buffer_shuffles() {
        let data = triples(200);
        let dataset = BatchedDataset::new(data, 200, 10_000);
        let mut rng = StdRng::seed_from_u64(14);

        let batches = dataset.epoch_batches(&mut rng);
        assert_ne!(batches[0].user_idx, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = BatchedDataset::new(Vec::new(), 512, 10_000);
        let mut rng = StdRng::seed_from_u64(15);
        assert!(dataset.epoch_batches(&mut rng).is_empty());
    }
}
