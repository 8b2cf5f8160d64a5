pub mod extractor;
pub mod types;

pub use extractor::FeatureExtractor;
pub use types::{FeatureError, FeatureKey, FeatureValue, FeatureVector};
