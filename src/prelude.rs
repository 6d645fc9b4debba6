pub use crate::data::init::{initialise_embedding, parse_initialisation, TsneInit};
pub use crate::data::structures::{ConditionalProbabilities, DistanceMatrix, JointProbabilities};
pub use crate::error::{InputError, TsneError, TsneResult};
pub use crate::training::tsne_optimiser::{optimise_tsne, TsneOptimParams, TsneOptimiser};
pub use crate::training::TsneGraphParams;
pub use crate::utils::observer::{EventRecorder, LogObserver, NoopObserver, TsneEvent, TsneObserver};
pub use crate::{tsne, tsne_matrix, tsne_with, Embedded, FeaturePoint, FeatureVector, TsneParams};
