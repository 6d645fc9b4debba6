use faer::{Mat, MatRef};
use num_traits::Float;

/////////////////////
// Data structures //
/////////////////////

//////////////
// Distance //
//////////////

/// Dense pairwise Euclidean distances
///
/// n × n, symmetric, non-negative, zero diagonal. Built once per run by
/// `pairwise_distances()` and never modified afterwards.
#[derive(Clone)]
pub struct DistanceMatrix<T> {
    dist: Mat<T>,
}

impl<T> DistanceMatrix<T>
where
    T: Float,
{
    pub(crate) fn from_mat(dist: Mat<T>) -> Self {
        debug_assert_eq!(dist.nrows(), dist.ncols());
        Self { dist }
    }

    /// Number of samples (rows and columns)
    pub fn n_samples(&self) -> usize {
        self.dist.nrows()
    }

    /// Distance between sample `i` and sample `j`
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.dist[(i, j)]
    }

    /// Borrow the underlying matrix
    pub fn as_mat(&self) -> MatRef<'_, T> {
        self.dist.as_ref()
    }
}

///////////////////
// Probabilities //
///////////////////

/// Conditional probabilities p_{j|i}
///
/// Row `i` holds the calibrated neighbour distribution of anchor `i`: the
/// entries for `j != i` sum to 1 and the diagonal is 0. Only consumed by the
/// symmetrisation step.
#[derive(Clone)]
pub struct ConditionalProbabilities<T> {
    probs: Mat<T>,
}

impl<T> ConditionalProbabilities<T>
where
    T: Float,
{
    /// Build from a function of `(i, j)`
    ///
    /// ### Params
    ///
    /// * `n` - Number of samples
    /// * `f` - Returns p_{j|i} for row `i`, column `j`
    pub fn from_fn(n: usize, f: impl FnMut(usize, usize) -> T) -> Self {
        Self {
            probs: Mat::from_fn(n, n, f),
        }
    }

    /// Number of samples (rows and columns)
    pub fn n_samples(&self) -> usize {
        self.probs.nrows()
    }

    /// p_{j|i}
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.probs[(i, j)]
    }

    /// Sum of row `i`
    pub fn row_sum(&self, i: usize) -> T {
        (0..self.n_samples()).fold(T::zero(), |acc, j| acc + self.get(i, j))
    }
}

/// Symmetric joint probabilities P_ij
///
/// The fixed optimisation target. Every entry, including the diagonal, is at
/// least `1e-12`. Produced by `symmetrise_affinities_tsne()`.
#[derive(Clone)]
pub struct JointProbabilities<T> {
    probs: Mat<T>,
}

impl<T> JointProbabilities<T>
where
    T: Float,
{
    pub(crate) fn from_mat(probs: Mat<T>) -> Self {
        debug_assert_eq!(probs.nrows(), probs.ncols());
        Self { probs }
    }

    /// Number of samples (rows and columns)
    pub fn n_samples(&self) -> usize {
        self.probs.nrows()
    }

    /// P_ij
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.probs[(i, j)]
    }

    /// Smallest entry of the matrix (`None` if empty)
    pub fn min_value(&self) -> Option<T> {
        let n = self.n_samples();
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .reduce(T::min)
    }

    /// Sum over all ordered pairs `i != j`
    pub fn off_diagonal_sum(&self) -> T {
        let n = self.n_samples();
        let mut sum = T::zero();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    sum = sum + self.get(i, j);
                }
            }
        }
        sum
    }

    /// Returns `true` if `P_ij == P_ji` for every pair
    pub fn is_symmetric(&self) -> bool {
        let n = self.n_samples();
        (0..n).all(|i| ((i + 1)..n).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Borrow the underlying matrix
    pub fn as_mat(&self) -> MatRef<'_, T> {
        self.probs.as_ref()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_structures {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_conditional_row_sum() {
        let cond = ConditionalProbabilities::from_fn(3, |i, j| {
            if i == j {
                0.0
            } else if j == (i + 1) % 3 {
                0.75
            } else {
                0.25
            }
        });

        assert_eq!(cond.n_samples(), 3);
        for i in 0..3 {
            assert_relative_eq!(cond.row_sum(i), 1.0);
            assert_relative_eq!(cond.get(i, i), 0.0);
        }
    }

    #[test]
    fn test_joint_helpers() {
        let probs = Mat::from_fn(3, 3, |i, j| if i == j { 1e-12 } else { 1.0 / 6.0 });
        let joint = JointProbabilities::from_mat(probs);

        assert!(joint.is_symmetric());
        assert_relative_eq!(joint.min_value().unwrap(), 1e-12);
        assert_relative_eq!(joint.off_diagonal_sum(), 1.0, epsilon = 1e-12);
        assert_eq!(joint.as_mat().nrows(), 3);
    }

    #[test]
    fn test_joint_asymmetry_detected() {
        let probs = Mat::from_fn(2, 2, |i, j| if i == 0 && j == 1 { 0.3 } else { 0.2 });
        let joint = JointProbabilities::from_mat(probs);
        assert!(!joint.is_symmetric());
    }
}
