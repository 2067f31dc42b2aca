//! Embedding providers that turn text into fixed-length vectors.
//!
//! Scoring, dedup and eviction only see `Vec<f32>`, so a dense model can be
//! dropped in behind [`EmbeddingProvider`] without touching them.

pub mod factory;
pub mod providers;

pub use factory::EmbeddingProviderFactory;
pub use providers::{EmbeddingProvider, HashedEmbeddings, LexicalEmbeddings};

/// Scale a vector to unit L2 norm in place. Zero vectors stay zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0; 4];
        l2_normalize(&mut zero);
        assert!(zero.iter().all(|x| *x == 0.0));
    }
}
