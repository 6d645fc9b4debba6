use num_traits::{Float, FromPrimitive, ToPrimitive};

use crate::data::structures::*;
use crate::error::*;
use crate::utils::math::*;
use crate::utils::observer::*;

/////////////
// Globals //
/////////////

const TSNE_MOMENTUM_SWITCH_ITER: usize = 250;
const TSNE_INITIAL_MOMENTUM: f64 = 0.5;
const TSNE_FINAL_MOMENTUM: f64 = 0.8;
const TSNE_MIN_GAIN: f64 = 0.01;
const TSNE_GAIN_INCREASE: f64 = 0.2;
const TSNE_GAIN_DECAY: f64 = 0.8;

/// Emit a checkpoint every this many epochs (and after the last one)
pub const TSNE_REPORT_EVERY: usize = 50;

////////////////
// Structures //
////////////////

/// t-SNE specific optimization parameters
///
/// ### Fields
///
/// * `n_epochs` - Number of epochs (typically 500-1000)
/// * `lr` - Learning rate
/// * `early_exag_iter` - Early exaggeration iters
/// * `early_exag_factor` - The factor to exaggerate P in the early iterations
#[derive(Clone, Debug)]
pub struct TsneOptimParams<T> {
    pub n_epochs: usize,
    pub lr: T,
    pub early_exag_iter: usize,
    pub early_exag_factor: T,
}

impl<T> TsneOptimParams<T>
where
    T: Float + FromPrimitive,
{
    /// Generate a new instance
    ///
    /// ### Params
    ///
    /// * `n_epochs` - Number of epochs. Default `500`.
    /// * `lr` - Learning rate. Default `100.0`.
    /// * `early_exag_iter` - Early exaggeration iters. Default `100`.
    /// * `early_exag_factor` - Exaggeration factor. Default `4.0`.
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(
        n_epochs: Option<usize>,
        lr: Option<T>,
        early_exag_iter: Option<usize>,
        early_exag_factor: Option<T>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            n_epochs: n_epochs.unwrap_or(defaults.n_epochs),
            lr: lr.unwrap_or(defaults.lr),
            early_exag_iter: early_exag_iter.unwrap_or(defaults.early_exag_iter),
            early_exag_factor: early_exag_factor.unwrap_or(defaults.early_exag_factor),
        }
    }
}

impl<T: Float + FromPrimitive> Default for TsneOptimParams<T> {
    fn default() -> Self {
        Self {
            n_epochs: 500,
            lr: T::from_f64(100.0).unwrap(),
            early_exag_iter: 100,
            early_exag_factor: T::from_f64(4.0).unwrap(),
        }
    }
}

/////////////
// Updates //
/////////////

/// Adaptive gain update for t-SNE gradient descent
///
/// When the gradient and the previous update disagree in (three-valued)
/// sign, the gain shrinks by 0.8 down to `min_gain`; otherwise it grows by
/// 0.2.
///
/// ### Params
///
/// * `val` - Current parameter value to update
/// * `update` - Accumulated momentum vector for this parameter
/// * `gain` - Adaptive gain (learning rate multiplier) for this parameter
/// * `grad` - Current gradient for this parameter
/// * `lr` - Base learning rate
/// * `momentum` - Momentum coefficient (0.5 early, 0.8 later)
/// * `min_gain` - Minimum allowed gain value (0.01)
#[inline(always)]
fn update_parameter<T>(
    val: &mut T,
    update: &mut T,
    gain: &mut T,
    grad: T,
    lr: T,
    momentum: T,
    min_gain: T,
) where
    T: Float + FromPrimitive,
{
    if sign(grad) != sign(*update) {
        *gain = (*gain * T::from_f64(TSNE_GAIN_DECAY).unwrap()).max(min_gain);
    } else {
        *gain = *gain + T::from_f64(TSNE_GAIN_INCREASE).unwrap();
    }

    *update = momentum * *update - lr * *gain * grad;
    *val = *val + *update;
}

///////////////
// Optimiser //
///////////////

/// Exact gradient-descent optimiser for the t-SNE objective
///
/// Owns the embedding together with its velocity, per-coordinate gains and
/// the Student-t numerator buffer. One call to `step()` is one epoch; the
/// embedding stays centred at the origin after every step.
pub struct TsneOptimiser<'a, T> {
    p: &'a JointProbabilities<T>,
    params: TsneOptimParams<T>,
    embd: Vec<Vec<T>>,
    update: Vec<Vec<T>>,
    gains: Vec<Vec<T>>,
    grad: Vec<Vec<T>>,
    q: Vec<T>,
    n_dim: usize,
    epoch: usize,
}

impl<'a, T> TsneOptimiser<'a, T>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    /// Set up a new optimiser
    ///
    /// ### Params
    ///
    /// * `p` - Joint probabilities of the input space
    /// * `params` - Optimisation parameters
    /// * `init` - Initial embedding (samples × n_dim)
    ///
    /// ### Returns
    ///
    /// The optimiser at epoch 0, or an error if `init` does not have one row
    /// per sample or its rows differ in length.
    pub fn new(
        p: &'a JointProbabilities<T>,
        params: &TsneOptimParams<T>,
        init: Vec<Vec<T>>,
    ) -> TsneResult<Self> {
        let n = p.n_samples();
        if init.len() != n {
            return Err(TsneError::InvalidParameter {
                name: "init",
                value: init.len() as f64,
                reason: "must have one row per sample",
            });
        }

        let n_dim = init.first().map_or(0, |row| row.len());
        if let Some((index, row)) = init.iter().enumerate().find(|(_, r)| r.len() != n_dim) {
            return Err(InputError::DimensionMismatch {
                index,
                expected: n_dim,
                actual: row.len(),
            }
            .into());
        }

        Ok(Self {
            p,
            params: params.clone(),
            embd: init,
            update: vec![vec![T::zero(); n_dim]; n],
            gains: vec![vec![T::one(); n_dim]; n],
            grad: vec![vec![T::zero(); n_dim]; n],
            q: vec![T::zero(); n * n],
            n_dim,
            epoch: 0,
        })
    }

    /// Number of completed epochs
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Current embedding
    pub fn embedding(&self) -> &[Vec<T>] {
        &self.embd
    }

    /// Current per-coordinate gains
    pub fn gains(&self) -> &[Vec<T>] {
        &self.gains
    }

    /// Current per-coordinate velocity
    pub fn velocity(&self) -> &[Vec<T>] {
        &self.update
    }

    /// Run one epoch
    ///
    /// ### Notes
    ///
    /// 1. q_ij = 1 / (1 + |y_i - y_j|²) for every pair; Z = sum over all
    ///    ordered pairs, 1e-12 if it is zero
    /// 2. grad_i = sum_j exag * (P_ij - max(q_ij / Z, 1e-12)) * q_ij *
    ///    (y_i - y_j)
    /// 3. Gains, momentum and position update per coordinate
    /// 4. Re-centre every dimension at zero
    ///
    /// Exaggeration applies for `epoch < early_exag_iter`, momentum switches
    /// from 0.5 to 0.8 at epoch 250.
    ///
    /// ### Returns
    ///
    /// The normaliser Z of the layout the gradient was computed on
    pub fn step(&mut self) -> T {
        let n = self.embd.len();
        let eps = T::from_f64(PROB_FLOOR).unwrap();
        let two = T::from_f64(2.0).unwrap();
        let min_gain = T::from_f64(TSNE_MIN_GAIN).unwrap();

        let momentum = if self.epoch < TSNE_MOMENTUM_SWITCH_ITER {
            T::from_f64(TSNE_INITIAL_MOMENTUM).unwrap()
        } else {
            T::from_f64(TSNE_FINAL_MOMENTUM).unwrap()
        };
        let exag_factor = if self.epoch < self.params.early_exag_iter {
            self.params.early_exag_factor
        } else {
            T::one()
        };

        // Student-t numerators
        let mut sum_q = T::zero();
        for i in 0..n {
            for j in (i + 1)..n {
                let q_ij = T::one() / (T::one() + euclidean_dist_sq(&self.embd[i], &self.embd[j]));
                self.q[i * n + j] = q_ij;
                self.q[j * n + i] = q_ij;
                sum_q = sum_q + two * q_ij;
            }
        }
        let sum_q = if sum_q == T::zero() { eps } else { sum_q };

        // gradient
        for i in 0..n {
            for d in 0..self.n_dim {
                self.grad[i][d] = T::zero();
            }
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q_ij = self.q[i * n + j];
                let q_norm = (q_ij / sum_q).max(eps);
                let coeff = exag_factor * (self.p.get(i, j) - q_norm) * q_ij;
                for d in 0..self.n_dim {
                    self.grad[i][d] =
                        self.grad[i][d] + (self.embd[i][d] - self.embd[j][d]) * coeff;
                }
            }
        }

        for i in 0..n {
            for d in 0..self.n_dim {
                update_parameter(
                    &mut self.embd[i][d],
                    &mut self.update[i][d],
                    &mut self.gains[i][d],
                    self.grad[i][d],
                    self.params.lr,
                    momentum,
                    min_gain,
                );
            }
        }

        self.recentre();
        self.epoch += 1;

        sum_q
    }

    /// Subtract the per-dimension mean
    fn recentre(&mut self) {
        let n = self.embd.len();
        if n == 0 {
            return;
        }
        let n_t = T::from_usize(n).unwrap();

        for d in 0..self.n_dim {
            let mean = self.embd.iter().fold(T::zero(), |acc, p| acc + p[d]) / n_t;
            for point in self.embd.iter_mut() {
                point[d] = point[d] - mean;
            }
        }
    }

    /// Run the remaining epochs, reporting checkpoints to `observer`
    ///
    /// ### Params
    ///
    /// * `observer` - Receives a `TsneEvent::Checkpoint` every 50 epochs and
    ///   after the last one
    ///
    /// ### Returns
    ///
    /// The final embedding
    pub fn run<O>(mut self, observer: &mut O) -> Vec<Vec<T>>
    where
        O: TsneObserver + ?Sized,
    {
        let n_epochs = self.params.n_epochs;

        while self.epoch < n_epochs {
            let z = self.step();

            if self.epoch % TSNE_REPORT_EVERY == 0 || self.epoch == n_epochs {
                let kl = kl_divergence(self.p, &self.embd);
                observer.on_event(&TsneEvent::Checkpoint {
                    epoch: self.epoch,
                    n_epochs,
                    z: z.to_f64().unwrap_or(f64::NAN),
                    kl_divergence: kl.to_f64().unwrap_or(f64::NAN),
                });
            }
        }

        self.embd
    }

    /// Hand the embedding back
    pub fn into_embedding(self) -> Vec<Vec<T>> {
        self.embd
    }
}

/// Optimise an embedding with exact t-SNE gradient descent
///
/// ### Params
///
/// * `embd` - Initial embedding (samples × n_dim)
/// * `p` - Joint probabilities P_ij
/// * `params` - Optimisation parameters
/// * `observer` - Receives checkpoint events
///
/// ### Returns
///
/// The optimised embedding
pub fn optimise_tsne<T, O>(
    embd: Vec<Vec<T>>,
    p: &JointProbabilities<T>,
    params: &TsneOptimParams<T>,
    observer: &mut O,
) -> TsneResult<Vec<Vec<T>>>
where
    T: Float + FromPrimitive + ToPrimitive,
    O: TsneObserver + ?Sized,
{
    Ok(TsneOptimiser::new(p, params, embd)?.run(observer))
}

///////////
// Tests //
///////////
