use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

// Width of the initial jitter band: coordinates start in [-5e-5, 5e-5)
pub const TSNE_INIT_RANGE: f64 = 1e-4;
pub const TSNE_INIT_STD: f64 = 1e-4;

/////////////
// Helpers //
/////////////

/// Different initialisations of the t-SNE embedding
#[derive(Clone, Debug)]
pub enum TsneInit<T> {
    /// Uniform jitter: `(u - 0.5) * range` with `u ~ U[0, 1)`
    Uniform { range: Option<T> },
    /// Gaussian jitter with the given standard deviation
    Gaussian { std: Option<T> },
}

impl<T> Default for TsneInit<T> {
    fn default() -> Self {
        TsneInit::Uniform { range: None }
    }
}

/// Parse the respective initialisation
///
/// ### Params
///
/// * `s` - `"uniform"` / `"random"` or `"gaussian"` / `"normal"`
/// * `scale` - Optional range (uniform) or standard deviation (Gaussian)
///
/// ### Returns
///
/// The Option of a TsneInit
pub fn parse_initialisation<T>(s: &str, scale: Option<T>) -> Option<TsneInit<T>> {
    match s.to_lowercase().as_str() {
        "uniform" | "random" => Some(TsneInit::Uniform { range: scale }),
        "gaussian" | "normal" => Some(TsneInit::Gaussian { std: scale }),
        _ => None,
    }
}

////////////
// Layout //
////////////

/// Uniform random jitter around the origin
///
/// ### Params
///
/// * `n_samples` - Number of samples
/// * `n_dim` - Embedding dimensions
/// * `rng` - Random source; a seeded one makes the layout reproducible
/// * `range` - Width of the band. Defaults to `1e-4`.
///
/// ### Returns
///
/// Embedding (samples × n_dim)
pub fn random_layout<T, R>(
    n_samples: usize,
    n_dim: usize,
    rng: &mut R,
    range: Option<T>,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + ToPrimitive,
    R: Rng,
{
    let range = range.and_then(|r| r.to_f64()).unwrap_or(TSNE_INIT_RANGE);

    (0..n_samples)
        .map(|_| {
            (0..n_dim)
                .map(|_| T::from_f64((rng.random::<f64>() - 0.5) * range).unwrap())
                .collect()
        })
        .collect()
}

/// Gaussian random jitter around the origin
///
/// ### Params
///
/// * `n_samples` - Number of samples
/// * `n_dim` - Embedding dimensions
/// * `rng` - Random source
/// * `std` - Standard deviation. Defaults to `1e-4`.
///
/// ### Returns
///
/// Embedding (samples × n_dim)
pub fn gaussian_layout<T, R>(
    n_samples: usize,
    n_dim: usize,
    rng: &mut R,
    std: Option<T>,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + ToPrimitive,
    R: Rng,
{
    let std = std.and_then(|s| s.to_f64()).unwrap_or(TSNE_INIT_STD);

    (0..n_samples)
        .map(|_| {
            (0..n_dim)
                .map(|_| {
                    let z: f64 = StandardNormal.sample(&mut *rng);
                    T::from_f64(z * std).unwrap()
                })
                .collect()
        })
        .collect()
}

/// Initialise the embedding
///
/// ### Params
///
/// * `init_method` - Which initialisation to use
/// * `n_samples` - Number of samples
/// * `n_dim` - Embedding dimensions
/// * `rng` - Random source
///
/// ### Returns
///
/// Embedding (samples × n_dim)
pub fn initialise_embedding<T, R>(
    init_method: &TsneInit<T>,
    n_samples: usize,
    n_dim: usize,
    rng: &mut R,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + ToPrimitive,
    R: Rng,
{
    match init_method {
        TsneInit::Uniform { range } => random_layout(n_samples, n_dim, rng, *range),
        TsneInit::Gaussian { std } => gaussian_layout(n_samples, n_dim, rng, *std),
    }
}

///////////
// Tests //
///////////
