use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::CodecError;

/// A fixed-length face signature.
///
/// The values are shared behind an `Arc<[f32]>`, so cloning is cheap and
/// there is no way to mutate a signature after construction. Two signatures
/// are only comparable when their [`Signature::dimension`] agrees.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f32>", try_from = "Vec<f32>")]
pub struct Signature {
    values: Arc<[f32]>,
}

impl Signature {
    /// Creates a signature and checks it against the expected dimension.
    pub fn new(values: Vec<f32>, dim: usize) -> Result<Self, CodecError> {
        if values.len() != dim {
            return Err(CodecError::DimensionMismatch {
                expected: dim,
                got: values.len(),
            });
        }
        Self::try_from(values)
    }

    /// Returns the number of components.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Returns a copy scaled to unit L2 norm.
    /// A zero vector is returned unchanged.
    ///
    /// The result is validated again, so a vector that cannot be scaled
    /// to finite values is a [`CodecError::NonFinite`].
    pub fn normalized(&self) -> Result<Self, CodecError> {
        let mut v = self.values.to_vec();
        l2_normalize(&mut v);
        Self::try_from(v)
    }
}

impl TryFrom<Vec<f32>> for Signature {
    type Error = CodecError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if values.is_empty() {
            return Err(CodecError::DimensionMismatch {
                expected: 1,
                got: 0,
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(CodecError::NonFinite { index });
        }
        Ok(Self {
            values: values.into(),
        })
    }
}

impl From<Signature> for Vec<f32> {
    fn from(sig: Signature) -> Self {
        sig.values.to_vec()
    }
}

impl AsRef<[f32]> for Signature {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("dim", &self.values.len())
            .finish()
    }
}

/// L2-normalizes a vector in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_dimension() {
        let err = Signature::new(vec![1.0, 2.0], 3).unwrap_err();
        assert!(matches!(
            err,
            CodecError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));

        let sig = Signature::new(vec![1.0, 2.0, 3.0], 3).unwrap();
        assert_eq!(sig.dimension(), 3);
        assert_eq!(sig.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_non_finite() {
        let err = Signature::new(vec![0.0, f32::NAN, 1.0], 3).unwrap_err();
        assert!(matches!(err, CodecError::NonFinite { index: 1 }));

        let err = Signature::try_from(vec![f32::INFINITY]).unwrap_err();
        assert!(matches!(err, CodecError::NonFinite { index: 0 }));
    }

    #[test]
    fn rejects_empty() {
        assert!(Signature::try_from(Vec::new()).is_err());
    }

    #[test]
    fn normalized_has_unit_norm() {
        let sig = Signature::new(vec![3.0, 4.0], 2).unwrap();
        let n = sig.normalized().unwrap();
        assert!((n.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((n.as_slice()[1] - 0.8).abs() < 1e-6);
        // Original is untouched.
        assert_eq!(sig.as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn normalized_tiny_vector_stays_finite() {
        // 1/norm overflows f32 for subnormal inputs.
        let sig = Signature::new(vec![1e-45, 0.0], 2).unwrap();
        let n = sig.normalized().unwrap();
        assert_eq!(n.as_slice(), &[1.0, 0.0]);

        let mut v = vec![1e-45_f32, 1e-45];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| x.is_finite()));
        assert!((v[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn serde_as_plain_array() {
        let sig = Signature::new(vec![0.5, -1.0], 2).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "[0.5,-1.0]");

        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);

        assert!(serde_json::from_str::<Signature>("[]").is_err());
    }

    #[test]
    fn debug_hides_values() {
        let sig = Signature::new(vec![0.25; 4], 4).unwrap();
        assert_eq!(format!("{sig:?}"), "Signature { dim: 4 }");
    }
}
