//! Signal computation primitives shared by every engine generation.

pub mod features;
pub mod layers;
pub mod nagr;
pub mod numeric;
pub mod profiles;
pub mod router;

pub use features::{
    equal_weights, normalize, weighted_score, FeatureMap, RawFeatures, ScaleTable,
    WeightProfile, WeightedScore,
};
pub use layers::{layer_prediction, Layer, LayerSignal};
pub use nagr::{combine, level_signal, nagr, NagrNode};
pub use numeric::{as_number, clip, is_number, round_to};
pub use router::{combine_levels, router_weights, LevelWeights, LevelWeightsError, Regime, Route};
