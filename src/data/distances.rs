use faer::{Mat, MatRef};
use num_traits::Float;

use crate::data::structures::*;
use crate::error::*;
use crate::utils::math::*;

/// Check that every vector has the same length as the first and only holds
/// finite values
///
/// ### Params
///
/// * `vectors` - Feature vectors
///
/// ### Returns
///
/// The shared dimensionality (`0` for empty input) or an `InputError`
pub fn validate_vectors<T>(vectors: &[&[T]]) -> Result<usize, InputError>
where
    T: Float,
{
    let Some(first) = vectors.first() else {
        return Ok(0);
    };
    let expected = first.len();

    for (index, v) in vectors.iter().enumerate() {
        if v.len() != expected {
            return Err(InputError::DimensionMismatch {
                index,
                expected,
                actual: v.len(),
            });
        }
        if let Some(feature) = v.iter().position(|x| !x.is_finite()) {
            return Err(InputError::NonFiniteFeature { index, feature });
        }
    }

    Ok(expected)
}

/// Pairwise Euclidean distances between feature vectors
///
/// Exact O(n² · D). Each unordered pair is computed once and mirrored, so the
/// result is symmetric bit for bit.
///
/// ### Params
///
/// * `vectors` - Feature vectors, all of the same length
///
/// ### Returns
///
/// The `DistanceMatrix` or `TsneError::InvalidInput` on a dimension mismatch
/// or a non-finite feature.
pub fn pairwise_distances<T>(vectors: &[&[T]]) -> TsneResult<DistanceMatrix<T>>
where
    T: Float,
{
    validate_vectors(vectors)?;

    let n = vectors.len();
    let mut flat = vec![T::zero(); n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean_dist_sq(vectors[i], vectors[j]).sqrt();
            flat[i * n + j] = d;
            flat[j * n + i] = d;
        }
    }

    Ok(DistanceMatrix::from_mat(Mat::from_fn(n, n, |i, j| flat[i * n + j])))
}

/// Split a row-major `faer` matrix into per-sample rows
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features)
///
/// ### Returns
///
/// One owned vector per sample
pub fn matrix_rows<T>(data: MatRef<T>) -> Vec<Vec<T>>
where
    T: Float,
{
    (0..data.nrows())
        .map(|i| (0..data.ncols()).map(|j| data[(i, j)]).collect())
        .collect()
}

///////////
// Tests //
///////////
