//! Vector similarity and ranking utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - Thresholded, stable top-k ranking over a set of stored vectors

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector has zero norm, is empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank stored vectors against a query.
///
/// Returns `(position, score)` pairs for the `top_k` best vectors scoring
/// strictly above `min_score`, highest first. Equal scores keep their
/// original order.
pub fn rank(query: &[f32], vectors: &[Vec<f32>], top_k: usize, min_score: f32) -> Vec<(usize, f32)> {
    if top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(query, v)))
        .filter(|(_, score)| *score > min_score)
        .collect();

    // `sort_by` is stable, which is what keeps ties in insertion order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}
