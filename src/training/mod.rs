pub mod tsne_optimiser;

use num_traits::{Float, FromPrimitive};

////////////
// Params //
////////////

/// Parameters of the perplexity calibration
///
/// ### Fields
///
/// * `perplexity` - Target effective number of neighbours per point
///   (typically 5-50). Clamped by the caller when it is not smaller than the
///   number of samples.
/// * `tol` - Tolerance on the entropy (in bits) of the binary search
///   (typically 1e-5).
/// * `max_iter` - Maximum number of binary search steps per point (typically
///   50).
#[derive(Clone, Debug)]
pub struct TsneGraphParams<T> {
    pub perplexity: T,
    pub tol: T,
    pub max_iter: usize,
}

impl<T> TsneGraphParams<T>
where
    T: Float + FromPrimitive,
{
    /// Generate new calibration parameters
    ///
    /// ### Params
    ///
    /// * `perplexity` - Target perplexity. Default `30.0`.
    /// * `tol` - Entropy tolerance. Default `1e-5`.
    /// * `max_iter` - Maximum search steps. Default `50`.
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(perplexity: Option<T>, tol: Option<T>, max_iter: Option<usize>) -> Self {
        let defaults = Self::default();
        Self {
            perplexity: perplexity.unwrap_or(defaults.perplexity),
            tol: tol.unwrap_or(defaults.tol),
            max_iter: max_iter.unwrap_or(defaults.max_iter),
        }
    }
}

impl<T> Default for TsneGraphParams<T>
where
    T: Float + FromPrimitive,
{
    /// Returns the defaults
    ///
    /// ### Returns
    ///
    /// * `perplexity = 30.0`
    /// * `tol = 1e-5`
    /// * `max_iter = 50`
    fn default() -> Self {
        Self {
            perplexity: T::from_f64(30.0).unwrap(),
            tol: T::from_f64(1e-5).unwrap(),
            max_iter: 50,
        }
    }
}

/// Clamp a perplexity that is too large for the data set
///
/// A perplexity of at least `n_samples` cannot be matched; it is replaced by
/// `max(1, floor(n_samples / 3))`.
///
/// ### Params
///
/// * `perplexity` - Requested perplexity
/// * `n_samples` - Number of samples
///
/// ### Returns
///
/// `Some(clamped)` if clamping was needed, `None` otherwise
pub fn clamp_perplexity<T>(perplexity: T, n_samples: usize) -> Option<T>
where
    T: Float + FromPrimitive,
{
    let n = T::from_usize(n_samples).unwrap();
    if perplexity >= n {
        Some(T::from_usize((n_samples / 3).max(1)).unwrap())
    } else {
        None
    }
}

///////////
// Tests //
///////////
