use nalgebra::DVector;
use rand::Rng;

/// Xavier-uniform rows for an embedding table with `rows` entries of
/// dimension `dim`.
pub fn xavier_table<R: Rng>(rows: usize, dim: usize, rng: &mut R) -> Vec<DVector<f32>> {
    let limit = (6.0 / dim.max(1) as f32).sqrt();
    (0..rows)
        .map(|_| DVector::from_fn(dim, |_, _| rng.gen_range(-limit..limit)))
        .collect()
}
