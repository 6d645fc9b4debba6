#![allow(clippy::needless_range_loop)] // I like loops ... !

pub mod data;
pub mod error;
pub mod prelude;
pub mod training;
pub mod utils;

use faer::MatRef;
use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use crate::data::distances::*;
use crate::data::graph::*;
use crate::data::init::*;
use crate::error::*;
use crate::training::tsne_optimiser::*;
use crate::training::*;
use crate::utils::observer::*;

/////////////////
// Input types //
/////////////////

/// Anything that carries a high-dimensional feature vector
pub trait FeatureVector<T> {
    /// The feature vector; read, never modified
    fn features(&self) -> &[T];
}

/// A point to embed
///
/// ### Fields
///
/// * `id` - Identifier of the point
/// * `original_value` - The high-dimensional feature vector
/// * `metadata` - Opaque data carried through to the output untouched
#[derive(Clone, Debug, PartialEq)]
pub struct FeaturePoint<T, M = ()> {
    pub id: String,
    pub original_value: Vec<T>,
    pub metadata: M,
}

impl<T, M> FeaturePoint<T, M> {
    /// Generate a new point
    pub fn new(id: impl Into<String>, original_value: Vec<T>, metadata: M) -> Self {
        Self {
            id: id.into(),
            original_value,
            metadata,
        }
    }
}

impl<T, M> FeatureVector<T> for FeaturePoint<T, M> {
    fn features(&self) -> &[T] {
        &self.original_value
    }
}

impl<T> FeatureVector<T> for Vec<T> {
    fn features(&self) -> &[T] {
        self
    }
}

impl<T> FeatureVector<T> for &[T] {
    fn features(&self) -> &[T] {
        self
    }
}

/// A copy of an input item together with its embedding coordinates
///
/// ### Fields
///
/// * `item` - Clone of the input item
/// * `value` - Embedding coordinates (length `n_dim`)
#[derive(Clone, Debug, PartialEq)]
pub struct Embedded<P, T> {
    pub item: P,
    pub value: Vec<T>,
}

////////////
// Params //
////////////

/// Main config structure with all of the possible sub configurations
///
/// ### Fields
///
/// * `n_dim` - How many dimensions to return
/// * `init` - How to initialise the embedding
/// * `graph_params` - Perplexity calibration parameters
/// * `optim_params` - Gradient descent parameters
#[derive(Clone, Debug)]
pub struct TsneParams<T> {
    pub n_dim: usize,
    pub init: TsneInit<T>,
    pub graph_params: TsneGraphParams<T>,
    pub optim_params: TsneOptimParams<T>,
}

impl<T> TsneParams<T>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    /// Generate new t-SNE parameters
    ///
    /// If everything is set to `None`, the defaults are used. The headline
    /// knobs (`perplexity`, `lr`, `n_epochs`) take precedence over the values
    /// inside `graph_params` / `optim_params`.
    ///
    /// ### Params
    ///
    /// * `n_dim` - How many dimensions to return. Default `2`.
    /// * `perplexity` - Target perplexity. Default `30.0`.
    /// * `lr` - Learning rate. Default `100.0`.
    /// * `n_epochs` - Number of gradient descent iterations. Default `500`.
    /// * `init` - Initialisation. Default uniform jitter of width `1e-4`.
    /// * `graph_params` - Further calibration parameters.
    /// * `optim_params` - Further optimiser parameters.
    ///
    /// ### Returns
    ///
    /// Initialised self
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n_dim: Option<usize>,
        perplexity: Option<T>,
        lr: Option<T>,
        n_epochs: Option<usize>,
        init: Option<TsneInit<T>>,
        graph_params: Option<TsneGraphParams<T>>,
        optim_params: Option<TsneOptimParams<T>>,
    ) -> Self {
        let mut graph_params = graph_params.unwrap_or_default();
        let mut optim_params = optim_params.unwrap_or_default();

        if let Some(perplexity) = perplexity {
            graph_params.perplexity = perplexity;
        }
        if let Some(lr) = lr {
            optim_params.lr = lr;
        }
        if let Some(n_epochs) = n_epochs {
            optim_params.n_epochs = n_epochs;
        }

        Self {
            n_dim: n_dim.unwrap_or(2),
            init: init.unwrap_or_default(),
            graph_params,
            optim_params,
        }
    }

    /// Check that all parameters are usable
    ///
    /// ### Returns
    ///
    /// `Ok(())` or the first offending parameter as
    /// `TsneError::InvalidParameter`
    pub fn validate(&self) -> TsneResult<()> {
        check_positive("perplexity", self.graph_params.perplexity)?;
        check_positive("tol", self.graph_params.tol)?;
        check_positive("lr", self.optim_params.lr)?;
        check_positive("early_exag_factor", self.optim_params.early_exag_factor)?;

        if self.n_dim == 0 {
            return Err(TsneError::InvalidParameter {
                name: "n_dim",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.graph_params.max_iter == 0 {
            return Err(TsneError::InvalidParameter {
                name: "max_iter",
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        match self.init {
            TsneInit::Uniform { range: Some(range) } => check_positive("init.range", range),
            TsneInit::Gaussian { std: Some(std) } => check_positive("init.std", std),
            _ => Ok(()),
        }
    }
}

impl<T> Default for TsneParams<T>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    fn default() -> Self {
        Self::new(None, None, None, None, None, None, None)
    }
}

/// Finite and strictly positive
fn check_positive<T>(name: &'static str, value: T) -> TsneResult<()>
where
    T: Float + ToPrimitive,
{
    if value.is_finite() && value > T::zero() {
        Ok(())
    } else {
        Err(TsneError::InvalidParameter {
            name,
            value: value.to_f64().unwrap_or(f64::NAN),
            reason: "must be finite and greater than zero",
        })
    }
}

//////////
// tSNE //
//////////

/// Run exact t-SNE with an injected random source and observer
///
/// 1. Pairwise Euclidean distances
/// 2. Per-point Gaussian bandwidths matched to the perplexity
/// 3. Symmetric joint probabilities P
/// 4. Gradient descent on KL(P || Q) from a small random layout
///
/// A perplexity that is not smaller than the number of points is reduced to
/// `max(1, n / 3)` and reported via `TsneEvent::PerplexityClamped`.
///
/// ### Params
///
/// * `items` - Points to embed; any type implementing `FeatureVector`
/// * `params` - The t-SNE parameters
/// * `rng` - Random source for the initial layout
/// * `observer` - Receives diagnostic events
///
/// ### Returns
///
/// One `Embedded` per input item, in input order. Empty input gives an empty
/// result without any event.
pub fn tsne_with<P, T, R, O>(
    items: &[P],
    params: &TsneParams<T>,
    rng: &mut R,
    observer: &mut O,
) -> TsneResult<Vec<Embedded<P, T>>>
where
    P: FeatureVector<T> + Clone,
    T: Float + FromPrimitive + ToPrimitive,
    R: Rng,
    O: TsneObserver + ?Sized,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    params.validate()?;

    let vectors: Vec<&[T]> = items.iter().map(|item| item.features()).collect();
    let n_features = validate_vectors(&vectors)?;
    let n_samples = vectors.len();
    let requested = params.graph_params.perplexity;

    let start = Instant::now();
    observer.on_event(&TsneEvent::Started {
        n_samples,
        n_features,
        n_dim: params.n_dim,
        perplexity: requested.to_f64().unwrap_or(f64::NAN),
        n_epochs: params.optim_params.n_epochs,
    });

    let perplexity = match clamp_perplexity(requested, n_samples) {
        Some(clamped) => {
            observer.on_event(&TsneEvent::PerplexityClamped {
                requested: requested.to_f64().unwrap_or(f64::NAN),
                clamped: clamped.to_f64().unwrap_or(f64::NAN),
                n_samples,
            });
            clamped
        }
        None => requested,
    };

    let dist = pairwise_distances(&vectors)?;

    let calibration = gaussian_affinities(
        &dist,
        perplexity,
        params.graph_params.tol,
        params.graph_params.max_iter,
    );
    let mean_beta = calibration
        .rows
        .iter()
        .map(|r| r.beta.to_f64().unwrap_or(f64::NAN))
        .sum::<f64>()
        / n_samples as f64;
    observer.on_event(&TsneEvent::AffinitiesCalibrated {
        n_unconverged: calibration.n_unconverged(),
        max_steps: calibration.max_steps(),
        mean_beta,
    });

    let p = symmetrise_affinities_tsne(&calibration.conditional);

    let embd = initialise_embedding(&params.init, n_samples, params.n_dim, rng);
    let embd = optimise_tsne(embd, &p, &params.optim_params, &mut *observer)?;

    observer.on_event(&TsneEvent::Finished {
        n_samples,
        n_epochs: params.optim_params.n_epochs,
        elapsed: start.elapsed(),
    });

    Ok(items
        .iter()
        .zip(embd)
        .map(|(item, value)| Embedded {
            item: item.clone(),
            value,
        })
        .collect())
}

/// Run exact t-SNE
///
/// ### Params
///
/// * `items` - Points to embed
/// * `params` - The t-SNE parameters
/// * `seed` - Seed for reproducibility
/// * `verbose` - Log progress through `tracing`
///
/// ### Returns
///
/// One `Embedded` per input item, in input order
///
/// ### Example
///
/// ```ignore
/// let points = vec![
///     FeaturePoint::new("a", vec![5.0, 5.0, 5.0], ()),
///     FeaturePoint::new("b", vec![-5.0, -5.0, -5.0], ()),
/// ];
/// let embedded = tsne(&points, &TsneParams::default(), 42, false)?;
/// // embedded[0].value holds the 2D coordinates of "a"
/// ```
pub fn tsne<P, T>(
    items: &[P],
    params: &TsneParams<T>,
    seed: u64,
    verbose: bool,
) -> TsneResult<Vec<Embedded<P, T>>>
where
    P: FeatureVector<T> + Clone,
    T: Float + FromPrimitive + ToPrimitive,
{
    let mut rng = StdRng::seed_from_u64(seed);

    if verbose {
        tsne_with(items, params, &mut rng, &mut LogObserver)
    } else {
        tsne_with(items, params, &mut rng, &mut NoopObserver)
    }
}

/// Run exact t-SNE on the rows of a matrix
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features)
/// * `params` - The t-SNE parameters
/// * `seed` - Seed for reproducibility
/// * `verbose` - Log progress through `tracing`
///
/// ### Returns
///
/// Embedding coordinates (samples × n_dim)
pub fn tsne_matrix<T>(
    data: MatRef<T>,
    params: &TsneParams<T>,
    seed: u64,
    verbose: bool,
) -> TsneResult<Vec<Vec<T>>>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    let rows = matrix_rows(data);
    let embedded = tsne(&rows, params, seed, verbose)?;

    Ok(embedded.into_iter().map(|e| e.value).collect())
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_tsne {
    use super::*;
    use approx::assert_relative_eq;

    fn short_params() -> TsneParams<f64> {
        TsneParams::new(None, Some(2.0), None, Some(60), None, None, None)
    }

    fn small_points() -> Vec<FeaturePoint<f64, usize>> {
        vec![
            FeaturePoint::new("a", vec![5.0, 5.0, 5.0], 10),
            FeaturePoint::new("b", vec![5.1, 4.9, 5.0], 11),
            FeaturePoint::new("c", vec![4.9, 5.0, 5.1], 12),
            FeaturePoint::new("d", vec![-5.0, -5.0, -5.0], 13),
            FeaturePoint::new("e", vec![-5.1, -4.9, -5.0], 14),
            FeaturePoint::new("f", vec![-4.9, -5.0, -5.1], 15),
        ]
    }

    #[test]
    fn test_params_defaults_and_overrides() {
        let params = TsneParams::<f64>::default();
        assert_eq!(params.n_dim, 2);
        assert_relative_eq!(params.graph_params.perplexity, 30.0);
        assert_relative_eq!(params.optim_params.lr, 100.0);
        assert_eq!(params.optim_params.n_epochs, 500);
        assert!(matches!(params.init, TsneInit::Uniform { range: None }));
        assert!(params.validate().is_ok());

        let graph = TsneGraphParams::new(Some(10.0), Some(1e-4), None);
        let params = TsneParams::new(Some(3), Some(5.0), None, None, None, Some(graph), None);
        assert_eq!(params.n_dim, 3);
        assert_relative_eq!(params.graph_params.perplexity, 5.0);
        assert_relative_eq!(params.graph_params.tol, 1e-4);
    }

    #[test]
    fn test_params_validation() {
        let bad_perplexity = TsneParams::new(None, Some(-1.0), None, None, None, None, None);
        assert!(matches!(
            bad_perplexity.validate(),
            Err(TsneError::InvalidParameter {
                name: "perplexity",
                ..
            })
        ));

        let bad_lr = TsneParams::new(None, None, Some(f64::NAN), None, None, None, None);
        assert!(matches!(
            bad_lr.validate(),
            Err(TsneError::InvalidParameter { name: "lr", .. })
        ));

        let bad_dim = TsneParams::<f64>::new(Some(0), None, None, None, None, None, None);
        assert!(matches!(
            bad_dim.validate(),
            Err(TsneError::InvalidParameter { name: "n_dim", .. })
        ));

        let mut bad_iter = TsneParams::<f64>::default();
        bad_iter.graph_params.max_iter = 0;
        assert!(bad_iter.validate().is_err());

        let bad_init = TsneParams::new(
            None,
            None,
            None,
            None,
            Some(TsneInit::Gaussian { std: Some(0.0) }),
            None,
            None,
        );
        assert!(bad_init.validate().is_err());
    }

    #[test]
    fn test_empty_input() {
        let points: Vec<FeaturePoint<f64>> = Vec::new();
        let mut seen = 0;
        let mut observer = |_: &TsneEvent| seen += 1;
        let mut rng = StdRng::seed_from_u64(42);

        // even invalid params are not looked at
        let params = TsneParams::<f64>::new(Some(0), None, None, None, None, None, None);
        let res = tsne_with(&points, &params, &mut rng, &mut observer).unwrap();

        assert!(res.is_empty());
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_single_point() {
        let points = vec![vec![1.0_f64, 2.0, 3.0]];
        let res = tsne(&points, &short_params(), 42, false).unwrap();

        assert_eq!(res.len(), 1);
        assert_eq!(res[0].value.len(), 2);
        assert!(res[0].value.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_output_order_and_passthrough() {
        let points = small_points();
        let res = tsne(&points, &short_params(), 7, false).unwrap();

        assert_eq!(res.len(), points.len());
        for (out, input) in res.iter().zip(points.iter()) {
            assert_eq!(&out.item, input);
            assert_eq!(out.value.len(), 2);
            assert!(out.value.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_slice_input_and_three_dims() {
        let a = [0.0_f64, 0.0];
        let b = [1.0_f64, 0.0];
        let c = [0.0_f64, 1.0];
        let d = [1.0_f64, 1.0];
        let points: Vec<&[f64]> = vec![a.as_slice(), b.as_slice(), c.as_slice(), d.as_slice()];
        let params = TsneParams::new(Some(3), Some(2.0), None, Some(20), None, None, None);

        let res = tsne(&points, &params, 1, false).unwrap();
        assert_eq!(res.len(), 4);
        assert_eq!(res[3].item, d.as_slice());
        assert!(res.iter().all(|e| e.value.len() == 3));
    }

    #[test]
    fn test_dimension_mismatch() {
        let points = vec![
            FeaturePoint::new("a", vec![0.0_f64, 0.0, 0.0], ()),
            FeaturePoint::new("b", vec![1.0, 1.0, 1.0], ()),
            FeaturePoint::new("c", vec![1.0, 1.0], ()),
        ];

        let err = tsne(&points, &short_params(), 42, false).unwrap_err();
        assert_eq!(
            err,
            TsneError::InvalidInput(InputError::DimensionMismatch {
                index: 2,
                expected: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_event_sequence_and_clamp() {
        let points = small_points()[..5].to_vec();
        let params = TsneParams::new(None, Some(30.0), None, Some(100), None, None, None);
        let mut recorder = EventRecorder::default();
        let mut rng = StdRng::seed_from_u64(3);

        let res = tsne_with(&points, &params, &mut rng, &mut recorder).unwrap();
        assert!(res.iter().flat_map(|e| e.value.iter()).all(|v| v.is_finite()));

        assert!(matches!(
            recorder.events.first(),
            Some(TsneEvent::Started { n_samples: 5, n_features: 3, .. })
        ));
        assert_eq!(
            recorder.clamp(),
            Some(&TsneEvent::PerplexityClamped {
                requested: 30.0,
                clamped: 1.0,
                n_samples: 5,
            })
        );
        assert!(recorder
            .events
            .iter()
            .any(|e| matches!(e, TsneEvent::AffinitiesCalibrated { .. })));
        assert_eq!(recorder.checkpoint_epochs(), vec![50, 100]);
        assert!(matches!(
            recorder.events.last(),
            Some(TsneEvent::Finished { n_samples: 5, .. })
        ));
    }

    #[test]
    fn test_no_clamp_event_when_perplexity_fits() {
        let points = small_points();
        let mut recorder = EventRecorder::default();
        let mut rng = StdRng::seed_from_u64(3);

        tsne_with(&points, &short_params(), &mut rng, &mut recorder).unwrap();
        assert!(recorder.clamp().is_none());
    }

    #[test]
    fn test_tsne_matrix_shape() {
        // two blocks of four rows, 10 apart
        let data = faer::Mat::from_fn(8, 4, |i, j| {
            ((i * 7 + j * 3) % 5) as f64 + (i / 4) as f64 * 10.0
        });
        let params = TsneParams::new(None, Some(3.0), None, Some(30), None, None, None);

        let embd = tsne_matrix(data.as_ref(), &params, 42, false).unwrap();
        assert_eq!(embd.len(), 8);
        assert!(embd.iter().all(|row| row.len() == 2));
    }
}
