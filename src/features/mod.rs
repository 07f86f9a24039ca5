// src/features/mod.rs
pub mod derivation;
pub mod profile;
pub mod schema;

// Re-export the feature pipeline for clean API
pub use derivation::{derive_features, DerivedFeatures, FEATURE_CATALOG};
pub use profile::RawProfile;
pub use schema::{FeatureInfo, FeatureSchema, FeatureVector};

use crate::error::AdvisorResult;
use serde_json::Value as JsonValue;

/// Raw JSON body to schema-ordered vector in one step.
pub fn build_feature_vector(
    schema: &FeatureSchema,
    body: &JsonValue,
) -> AdvisorResult<(DerivedFeatures, FeatureVector)> {
    let profile = RawProfile::from_json(body)?;
    let derived = derive_features(&profile)?;
    let vector = schema.assemble(&derived)?;
    Ok((derived, vector))
}
