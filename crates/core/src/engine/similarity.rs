/// Euclidean norm of a vector.
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors of equal length.
///
/// Returns a value in [-1, 1]. If either vector has zero norm the similarity
/// is 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}

/// Same as [`cosine_similarity`] with norms supplied by the caller, so catalog
/// norms can be computed once at load time.
pub fn cosine_with_norms(a: &[f64], norm_a: f64, b: &[f64], norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let a = vec![0.5, 0.25, 0.2, 2.0, 3.0, 1.0, 0.0, 0.0, 1.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = vec![0.3, 0.9, 0.1, 1.0];
        let b = vec![0.7, 0.2, 0.4, 3.0];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn zero_vector_scores_exactly_zero() {
        let zero = vec![0.0; 4];
        let b = vec![1.0, 2.0, 3.0, 4.0];
        let sim = cosine_similarity(&zero, &b);
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn scale_does_not_change_similarity() {
        let a = vec![1.0, 2.0, 0.5];
        let b: Vec<f64> = a.iter().map(|x| x * 10.0).collect();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn precomputed_norms_match_direct_computation() {
        let a = vec![0.2, 0.4, 0.6];
        let b = vec![0.9, 0.1, 0.3];
        let direct = cosine_similarity(&a, &b);
        let cached = cosine_with_norms(&a, l2_norm(&a), &b, l2_norm(&b));
        assert_eq!(direct, cached);
    }
}
