//! Deterministic pseudo-embedding for dev/test use without an external
//! model call, ported from `summarizer-py/app/services/embedder.py`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// SHA-256-seeded PRNG feeding a Box-Muller transform, then L2-normalized.
/// Same text + dims always yields the same vector.
pub fn deterministic_embed(text: &str, dims: usize) -> Vec<f64> {
    if text.is_empty() {
        return vec![0.0; dims];
    }

    let digest = Sha256::digest(text.as_bytes());
    let seed = u64::from_be_bytes(digest[..8].try_into().unwrap());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut vec = Vec::with_capacity(dims);
    for _ in 0..dims / 2 {
        let u1: f64 = rng.gen_range(1e-12..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        vec.push(r * theta.cos());
        vec.push(r * theta.sin());
    }
    if vec.len() < dims {
        vec.push(rng.gen_range(-1.0..1.0));
    }

    let norm = vec.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    vec.truncate(dims);
    vec.into_iter().map(|x| x / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_is_deterministic() {
        let a = deterministic_embed("hello world", 8);
        let b = deterministic_embed("hello world", 8);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        assert_eq!(deterministic_embed("", 4), vec![0.0; 4]);
    }

    #[test]
    fn vector_is_l2_normalized() {
        let v = deterministic_embed("some article text", 16);
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn different_text_yields_different_vector() {
        let a = deterministic_embed("article one", 8);
        let b = deterministic_embed("article two", 8);
        assert_ne!(a, b);
    }
}
