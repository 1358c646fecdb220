//! Cosine similarity.

/// Cosine similarity between two vectors, -1.0 to 1.0.
///
/// Mismatched dimensions or zero-norm vectors score 0.0 so they can never
/// clear a match threshold.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Index and score of the best candidate for `query`.
pub fn best_match<'a, I>(candidates: I, query: &[f32]) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| (i, cosine_similarity(candidate, query)))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}
