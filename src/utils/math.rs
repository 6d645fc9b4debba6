use num_traits::{Float, FromPrimitive};

use crate::data::structures::*;

/// Floor used for every probability-like quantity that could underflow
pub const PROB_FLOOR: f64 = 1e-12;

/// Squared Euclidean distance between two vectors of the same length
///
/// ### Params
///
/// * `a` - Vector a
/// * `b` - Vector b
///
/// ### Returns
///
/// `sum_d (a_d - b_d)^2`
#[inline(always)]
pub fn euclidean_dist_sq<T>(a: &[T], b: &[T]) -> T
where
    T: Float,
{
    debug_assert_eq!(a.len(), b.len());
    let mut sum = T::zero();
    for (&x, &y) in a.iter().zip(b) {
        let diff = x - y;
        sum = sum + diff * diff;
    }
    sum
}

/// Three-valued sign: `-1`, `0` or `1`
///
/// Unlike `Float::signum`, zero maps to `0`, so a zero gradient and a
/// non-zero velocity count as having different signs. NaN maps to `0`.
#[inline(always)]
pub fn sign<T>(x: T) -> i8
where
    T: Float,
{
    if x > T::zero() {
        1
    } else if x < T::zero() {
        -1
    } else {
        0
    }
}

/// Shannon entropy in bits, ignoring probabilities at or below `min_prob`
///
/// ### Params
///
/// * `probs` - Probabilities (expected to sum to 1)
/// * `min_prob` - Entries `<= min_prob` are skipped
///
/// ### Returns
///
/// `-sum p log2(p)` over the retained entries
pub fn entropy_base2<T>(probs: &[T], min_prob: T) -> T
where
    T: Float,
{
    probs
        .iter()
        .filter(|&&p| p > min_prob)
        .fold(T::zero(), |acc, &p| acc - p * p.log2())
}

/// KL divergence KL(P || Q) of the current layout
///
/// Q is built exactly like the optimiser does it: Student-t numerators over
/// all ordered pairs, normalised by their sum and floored at `1e-12`. Only a
/// diagnostic; it is O(n² · n_dim).
///
/// ### Params
///
/// * `p` - Joint probabilities
/// * `embd` - Current embedding (samples × n_dim)
///
/// ### Returns
///
/// `sum_{i != j} P_ij ln(P_ij / Q_ij)`
pub fn kl_divergence<T>(p: &JointProbabilities<T>, embd: &[Vec<T>]) -> T
where
    T: Float + FromPrimitive,
{
    let n = embd.len();
    let eps = T::from_f64(PROB_FLOOR).unwrap();
    let two = T::from_f64(2.0).unwrap();

    let mut q = vec![T::zero(); n * n];
    let mut sum_q = T::zero();
    for i in 0..n {
        for j in (i + 1)..n {
            let q_ij = T::one() / (T::one() + euclidean_dist_sq(&embd[i], &embd[j]));
            q[i * n + j] = q_ij;
            q[j * n + i] = q_ij;
            sum_q = sum_q + two * q_ij;
        }
    }
    let sum_q = if sum_q == T::zero() { eps } else { sum_q };

    let mut kl = T::zero();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let p_ij = p.get(i, j);
            let q_ij = (q[i * n + j] / sum_q).max(eps);
            kl = kl + p_ij * (p_ij / q_ij).ln();
        }
    }
    kl
}

#[cfg(test)]
mod test_math {
    use super::*;
    use crate::data::graph::symmetrise_affinities_tsne;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_dist_sq() {
        let a = [1.0_f64, 2.0, 3.0];
        let b = [4.0_f64, 6.0, 3.0];
        assert_relative_eq!(euclidean_dist_sq(&a, &b), 25.0);
        assert_relative_eq!(euclidean_dist_sq(&b, &a), 25.0);
        assert_relative_eq!(euclidean_dist_sq(&a, &a), 0.0);
    }

    #[test]
    fn test_sign_is_three_valued() {
        assert_eq!(sign(2.5_f64), 1);
        assert_eq!(sign(-0.1_f64), -1);
        assert_eq!(sign(0.0_f64), 0);
        assert_eq!(sign(-0.0_f64), 0);
        assert_eq!(sign(f64::NAN), 0);
    }

    #[test]
    fn test_entropy_uniform() {
        let probs = vec![0.25_f64; 4];
        assert_relative_eq!(entropy_base2(&probs, 1e-7), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_entropy_skips_tiny_probabilities() {
        let probs = [0.5_f64, 0.5, 1e-9];
        assert_relative_eq!(entropy_base2(&probs, 1e-7), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kl_divergence_non_negative_and_finite() {
        let cond = ConditionalProbabilities::from_fn(3, |i, j| if i == j { 0.0 } else { 0.5 });
        let p = symmetrise_affinities_tsne(&cond);
        let embd = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];

        let kl = kl_divergence(&p, &embd);
        assert!(kl.is_finite());
        assert!(kl > -1e-9, "KL should not be negative, got {}", kl);
    }
}
