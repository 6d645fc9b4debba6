use std::time::Duration;
use thousands::Separable;
use tracing::{debug, info, warn};

////////////
// Events //
////////////

/// Diagnostic events emitted during a t-SNE run
///
/// Purely informational. Nothing the engine returns depends on whether or
/// how these are consumed.
#[derive(Clone, Debug, PartialEq)]
pub enum TsneEvent {
    /// The run is about to start
    ///
    /// ### Fields
    ///
    /// * `n_samples` - Number of input points
    /// * `n_features` - Length of each feature vector
    /// * `n_dim` - Embedding dimensions
    /// * `perplexity` - Requested perplexity, before any clamping
    /// * `n_epochs` - Number of optimiser epochs
    Started {
        n_samples: usize,
        n_features: usize,
        n_dim: usize,
        perplexity: f64,
        n_epochs: usize,
    },
    /// The requested perplexity was not smaller than the number of samples
    ///
    /// ### Fields
    ///
    /// * `requested` - Perplexity from the parameters
    /// * `clamped` - Perplexity actually used, `max(1, n_samples / 3)`
    /// * `n_samples` - Number of input points
    PerplexityClamped {
        requested: f64,
        clamped: f64,
        n_samples: usize,
    },
    /// Bandwidth search finished for all anchors
    ///
    /// ### Fields
    ///
    /// * `n_unconverged` - Anchors whose search ran out of steps
    /// * `max_steps` - Most search steps any anchor needed
    /// * `mean_beta` - Average kernel precision over all anchors
    AffinitiesCalibrated {
        n_unconverged: usize,
        max_steps: usize,
        mean_beta: f64,
    },
    /// Periodic optimiser progress
    ///
    /// ### Fields
    ///
    /// * `epoch` - Completed epochs (1-based)
    /// * `n_epochs` - Total epochs of the run
    /// * `z` - Normaliser of the Student-t similarities in that epoch
    /// * `kl_divergence` - KL(P || Q) of the layout after that epoch
    Checkpoint {
        epoch: usize,
        n_epochs: usize,
        z: f64,
        kl_divergence: f64,
    },
    /// The run completed
    ///
    /// ### Fields
    ///
    /// * `n_samples` - Number of embedded points
    /// * `n_epochs` - Number of optimiser epochs
    /// * `elapsed` - Wall time from `Started` to here
    Finished {
        n_samples: usize,
        n_epochs: usize,
        elapsed: Duration,
    },
}

///////////////
// Observers //
///////////////

/// Receiver of `TsneEvent`s
///
/// Implemented for any `FnMut(&TsneEvent)` closure.
pub trait TsneObserver {
    fn on_event(&mut self, event: &TsneEvent);
}

impl<F> TsneObserver for F
where
    F: FnMut(&TsneEvent),
{
    fn on_event(&mut self, event: &TsneEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl TsneObserver for NoopObserver {
    fn on_event(&mut self, _event: &TsneEvent) {}
}

/// Forwards events to `tracing`
///
/// The clamp warning goes out at `WARN`, calibration details at `DEBUG`,
/// everything else at `INFO`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl TsneObserver for LogObserver {
    fn on_event(&mut self, event: &TsneEvent) {
        match event {
            TsneEvent::Started {
                n_samples,
                n_features,
                n_dim,
                perplexity,
                n_epochs,
            } => info!(
                n_samples = %n_samples.separate_with_underscores(),
                n_features,
                n_dim,
                perplexity,
                n_epochs,
                "Running exact t-SNE"
            ),
            TsneEvent::PerplexityClamped {
                requested,
                clamped,
                n_samples,
            } => warn!(
                requested,
                clamped,
                n_samples,
                "Perplexity {} is too high for {} samples, reducing it to {}",
                requested,
                n_samples,
                clamped
            ),
            TsneEvent::AffinitiesCalibrated {
                n_unconverged,
                max_steps,
                mean_beta,
            } => debug!(
                n_unconverged,
                max_steps, mean_beta, "Calibrated Gaussian affinities"
            ),
            TsneEvent::Checkpoint {
                epoch,
                n_epochs,
                z,
                kl_divergence,
            } => info!(
                z = %z.separate_with_underscores(),
                kl_divergence,
                "Completed epoch {} out of {}",
                epoch,
                n_epochs
            ),
            TsneEvent::Finished {
                n_samples,
                n_epochs,
                elapsed,
            } => info!(
                n_samples = %n_samples.separate_with_underscores(),
                n_epochs,
                "t-SNE finished in {:.2?}",
                elapsed
            ),
        }
    }
}

/// Keeps every event in order; handy for inspecting a run afterwards
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<TsneEvent>,
}

impl EventRecorder {
    /// Epochs at which `Checkpoint` events were seen
    pub fn checkpoint_epochs(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TsneEvent::Checkpoint { epoch, .. } => Some(*epoch),
                _ => None,
            })
            .collect()
    }

    /// The clamp event, if one was emitted
    pub fn clamp(&self) -> Option<&TsneEvent> {
        self.events
            .iter()
            .find(|e| matches!(e, TsneEvent::PerplexityClamped { .. }))
    }
}

impl TsneObserver for EventRecorder {
    fn on_event(&mut self, event: &TsneEvent) {
        self.events.push(event.clone());
    }
}

///////////
// Tests //
///////////
