//! Predictive modelling: feature preparation, a seeded tree-ensemble
//! trainer, and the predictor that applies a fitted model.

pub mod features;
pub mod forest;
pub mod predict;
pub mod trainer;

pub use features::{prepare, FeatureMatrix, FeatureSplit, Target};
pub use forest::{ForestParams, RandomForest};
pub use predict::{predict, PredictionResult};
pub use trainer::{train, TrainedModel, TrainerConfig, TrainingReport};
