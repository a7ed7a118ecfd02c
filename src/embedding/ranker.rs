//! Exact cosine-similarity ranking over a full candidate scan.

use std::cmp::Ordering;

/// Number of results returned when the caller does not pick a limit.
pub const DEFAULT_LIMIT: i64 = 10;

/// A candidate id with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<I> {
    /// Candidate identifier.
    pub id: I,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// Cosine of the angle between two vectors.
///
/// Defined as 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Scores every candidate against `query` and keeps the best `limit`.
///
/// Results are sorted by similarity in descending order; candidates with
/// equal scores keep their scan order. A `limit` of zero or less returns
/// nothing.
pub fn rank<I, V, C>(query: &[f32], candidates: C, limit: i64) -> Vec<Ranked<I>>
where
    C: IntoIterator<Item = (I, V)>,
    V: AsRef<[f32]>,
{
    let Ok(limit) = usize::try_from(limit) else {
        return Vec::new();
    };
    if limit == 0 {
        return Vec::new();
    }

    let mut scores: Vec<Ranked<I>> = candidates
        .into_iter()
        .map(|(id, vector)| Ranked {
            score: cosine_similarity(query, vector.as_ref()),
            id,
        })
        .collect();

    // sort_by is stable, which keeps ties in scan order
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    scores.truncate(limit);
    scores
}
