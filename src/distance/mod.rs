//! Vector math: distances, similarities and elementwise arithmetic.
//!
//! The functions re-exported at this level validate operand dimensions and
//! fail with [`AdcError::DimensionMismatch`]. The [`scalar`] kernels skip the
//! check and are meant for inner loops whose dimensions were validated once.

pub mod scalar;

pub use scalar::squared_distance;

use crate::error::{AdcError, Result};

#[inline]
fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(AdcError::dimension_mismatch(a.len(), b.len()));
    }
    Ok(())
}

/// Squared Euclidean distance with dimension validation.
pub fn squared_distance_checked(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    Ok(scalar::squared_distance(a, b))
}

/// Cosine similarity: `(a·b) / (‖a‖·‖b‖)`.
///
/// # Errors
/// [`AdcError::DimensionMismatch`] on unequal lengths, [`AdcError::ZeroNorm`]
/// if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    scalar::cosine_similarity(a, b).ok_or(AdcError::ZeroNorm)
}

/// Cosine similarity of two vectors already normalized to unit length.
///
/// This is just the dot product. The unit-length precondition is not
/// checked; passing unnormalized vectors yields a wrong similarity.
pub fn cosine_similarity_normalized(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    Ok(scalar::dot_product(a, b))
}

/// Elementwise `a + b`.
pub fn vector_add(a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
    check_dims(a, b)?;
    let mut out = vec![0.0f32; a.len()];
    scalar::add_into(a, b, &mut out);
    Ok(out)
}

/// Elementwise `a - b`.
pub fn vector_subtract(a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
    check_dims(a, b)?;
    let mut out = vec![0.0f32; a.len()];
    scalar::subtract_into(a, b, &mut out);
    Ok(out)
}

/// Scale `v` to unit length in place.
///
/// # Errors
/// [`AdcError::ZeroNorm`] if `v` has zero norm; `v` is left untouched.
pub fn normalize(v: &mut [f32]) -> Result<()> {
    let n = scalar::norm(v);
    if n == 0.0 {
        return Err(AdcError::ZeroNorm);
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_scaled() {
        let a = vec![1.0, 2.0, 2.0];
        let b = vec![2.0, 4.0, 4.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_errors() {
        assert!(matches!(
            cosine_similarity(&[1.0, 0.0], &[1.0]),
            Err(AdcError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(AdcError::ZeroNorm)
        ));
    }

    #[test]
    fn test_cosine_normalized_matches_general() {
        let mut a = vec![3.0, 4.0, 0.0];
        let mut b = vec![1.0, 1.0, 1.0];
        normalize(&mut a).unwrap();
        normalize(&mut b).unwrap();

        let fast = cosine_similarity_normalized(&a, &b).unwrap();
        let general = cosine_similarity(&a, &b).unwrap();
        assert!((fast - general).abs() < 1e-6);
    }

    #[test]
    fn test_vector_add_subtract() {
        let a = vec![1.0, -2.0, 3.0];
        let b = vec![0.5, 0.5, 0.5];
        assert_eq!(vector_add(&a, &b).unwrap(), vec![1.5, -1.5, 3.5]);
        assert_eq!(vector_subtract(&a, &b).unwrap(), vec![0.5, -2.5, 2.5]);
    }

    #[test]
    fn test_vector_arithmetic_dimension_mismatch() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0];
        assert!(matches!(
            vector_add(&a, &b),
            Err(AdcError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            vector_subtract(&b, &a),
            Err(AdcError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        assert!(matches!(normalize(&mut zero), Err(AdcError::ZeroNorm)));
    }

    #[test]
    fn test_squared_distance_checked() {
        assert_eq!(squared_distance_checked(&[1.0, 1.0], &[0.0, 0.0]).unwrap(), 2.0);
        assert!(squared_distance_checked(&[1.0], &[0.0, 0.0]).is_err());
    }
}
