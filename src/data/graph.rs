use faer::Mat;
use num_traits::{Float, FromPrimitive};

use crate::data::structures::*;
use crate::utils::math::*;

/// Probabilities at or below this value are kept in the normalisation but
/// left out of the entropy sum
pub const TSNE_ENTROPY_MIN_PROB: f64 = 1e-7;

////////////////
// Structures //
////////////////

/// Outcome of the bandwidth search for one anchor point
///
/// ### Fields
///
/// * `beta` - Precision of the Gaussian kernel that produced the final row
///   (beta = 1 / (2 sigma²))
/// * `entropy` - Entropy (bits) of the final row
/// * `n_steps` - Number of kernel evaluations performed
/// * `converged` - Whether `|entropy - log2(perplexity)| < tol` was reached
#[derive(Clone, Debug)]
pub struct RowCalibration<T> {
    pub beta: T,
    pub entropy: T,
    pub n_steps: usize,
    pub converged: bool,
}

/// Conditional probabilities plus the per-anchor search diagnostics
///
/// ### Fields
///
/// * `conditional` - p_{j|i}, rows sum to 1 over `j != i`
/// * `rows` - One `RowCalibration` per anchor
#[derive(Clone)]
pub struct PerplexityCalibration<T> {
    pub conditional: ConditionalProbabilities<T>,
    pub rows: Vec<RowCalibration<T>>,
}

impl<T> PerplexityCalibration<T>
where
    T: Float,
{
    /// Number of anchors whose search ran out of steps
    pub fn n_unconverged(&self) -> usize {
        self.rows.iter().filter(|r| !r.converged).count()
    }

    /// Largest number of search steps any anchor needed
    pub fn max_steps(&self) -> usize {
        self.rows.iter().map(|r| r.n_steps).max().unwrap_or(0)
    }
}

/// Bounds of the beta binary search; `None` means unbounded on that side
#[derive(Clone, Copy, Debug)]
struct BetaBounds<T> {
    lower: Option<T>,
    upper: Option<T>,
}

impl<T> BetaBounds<T>
where
    T: Float,
{
    fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Next beta after an evaluation at `beta`
    ///
    /// Entropy too high → distribution too flat → increase beta (narrow the
    /// kernel). Entropy too low → decrease beta.
    fn next(&mut self, beta: T, entropy_too_high: bool) -> T {
        let two = T::one() + T::one();
        if entropy_too_high {
            self.lower = Some(beta);
            match self.upper {
                None => beta * two,
                Some(upper) => (beta + upper) / two,
            }
        } else {
            self.upper = Some(beta);
            match self.lower {
                None => beta / two,
                Some(lower) => (beta + lower) / two,
            }
        }
    }
}

//////////
// tSNE //
//////////

/// Calibrate the Gaussian kernel of a single anchor
///
/// ### Params
///
/// * `dist` - Pairwise (unsquared) distances
/// * `anchor` - Row to calibrate
/// * `target_entropy` - log2(perplexity)
/// * `tol` - Convergence tolerance on the entropy
/// * `max_iter` - Maximum kernel evaluations (at least one is performed)
///
/// ### Returns
///
/// Tuple of (row of p_{j|anchor} with a zero self entry, diagnostics)
pub fn calibrate_row<T>(
    dist: &DistanceMatrix<T>,
    anchor: usize,
    target_entropy: T,
    tol: T,
    max_iter: usize,
) -> (Vec<T>, RowCalibration<T>)
where
    T: Float + FromPrimitive,
{
    let n = dist.n_samples();
    let eps = T::from_f64(PROB_FLOOR).unwrap();
    let min_prob = T::from_f64(TSNE_ENTROPY_MIN_PROB).unwrap();

    let dist_sq: Vec<T> = (0..n)
        .map(|j| {
            let d = dist.get(anchor, j);
            d * d
        })
        .collect();

    // shift by the nearest neighbour so the kernel sum is >= 1 and cannot
    // underflow; the normalised row is unchanged
    let nearest_sq = (0..n)
        .filter(|&j| j != anchor)
        .map(|j| dist_sq[j])
        .reduce(T::min)
        .unwrap_or(T::zero());

    let mut probs = vec![T::zero(); n];
    let mut weights = vec![T::zero(); n];
    let mut bounds = BetaBounds::unbounded();
    let mut beta = T::one();
    let mut used_beta = beta;
    let mut entropy = T::zero();
    let mut n_steps = 0;
    let mut converged = false;

    for _ in 0..max_iter.max(1) {
        n_steps += 1;
        used_beta = beta;

        // p_{j|i} = exp(-beta * d²) / sum
        let mut sum_w = T::zero();
        for j in 0..n {
            if j == anchor {
                continue;
            }
            let w = (-beta * (dist_sq[j] - nearest_sq)).exp();
            weights[j] = w;
            sum_w = sum_w + w;
        }
        // only a lone point has nothing to normalise
        let sum_w = if sum_w == T::zero() { eps } else { sum_w };

        for (p, &w) in probs.iter_mut().zip(&weights) {
            *p = w / sum_w;
        }

        entropy = entropy_base2(&probs, min_prob);
        let entropy_diff = entropy - target_entropy;
        if entropy_diff.abs() < tol {
            converged = true;
            break;
        }

        beta = bounds.next(beta, entropy_diff > T::zero());
    }

    (
        probs,
        RowCalibration {
            beta: used_beta,
            entropy,
            n_steps,
            converged,
        },
    )
}

/// Compute Gaussian conditional probabilities with perplexity calibration
///
/// For each anchor i, finds beta_i by binary search so that the entropy of
/// p_{.|i} equals log2(perplexity), then keeps the normalised weights of the
/// last evaluated beta.
///
/// ### Params
///
/// * `dist` - Pairwise (unsquared) Euclidean distances
/// * `perplexity` - Target perplexity (already clamped to the data size)
/// * `tol` - Convergence tolerance for entropy (typical: 1e-5)
/// * `max_iter` - Maximum iterations for binary search (typical: 50)
///
/// ### Returns
///
/// The `PerplexityCalibration` holding p_{j|i} and per-row diagnostics
pub fn gaussian_affinities<T>(
    dist: &DistanceMatrix<T>,
    perplexity: T,
    tol: T,
    max_iter: usize,
) -> PerplexityCalibration<T>
where
    T: Float + FromPrimitive,
{
    let n = dist.n_samples();
    let target_entropy = perplexity.log2();

    let mut flat = Vec::with_capacity(n * n);
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let (probs, row) = calibrate_row(dist, i, target_entropy, tol, max_iter);
        flat.extend(probs);
        rows.push(row);
    }

    PerplexityCalibration {
        conditional: ConditionalProbabilities::from_fn(n, |i, j| flat[i * n + j]),
        rows,
    }
}

/// Symmetrise for t-SNE: P_ij = max((p_{j|i} + p_{i|j}) / 2N, 1e-12)
///
/// ### Params
///
/// * `cond` - Conditional probabilities p_{j|i}
///
/// ### Returns
///
/// Symmetric `JointProbabilities`; the diagonal holds the floor value.
pub fn symmetrise_affinities_tsne<T>(cond: &ConditionalProbabilities<T>) -> JointProbabilities<T>
where
    T: Float + FromPrimitive,
{
    let n = cond.n_samples();
    let eps = T::from_f64(PROB_FLOOR).unwrap();
    let normalisation = T::from_usize(2 * n).unwrap();

    let mut flat = vec![eps; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let p_sym = ((cond.get(i, j) + cond.get(j, i)) / normalisation).max(eps);
            flat[i * n + j] = p_sym;
            flat[j * n + i] = p_sym;
        }
    }

    JointProbabilities::from_mat(Mat::from_fn(n, n, |i, j| flat[i * n + j]))
}

///////////
// Tests //
///////////
