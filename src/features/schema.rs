// src/features/schema.rs
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{AdvisorError, AdvisorResult};
use crate::features::derivation::{is_known_feature, DerivedFeatures};

/// On-disk layout of `feature_info.json`, as written by the training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub numerical_features: Vec<String>,
    pub categorical_features: Vec<String>,
}

/// The ordered list of features every model consumes.
///
/// Numerical features come first, then categorical ones. The position of a
/// name in this list is the index of its value in the [`FeatureVector`].
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    numerical_count: usize,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Missing required file: {}", path.display()))?;
        let info: FeatureInfo = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse feature info from {}", path.display()))?;
        let schema = Self::from_info(info)
            .with_context(|| format!("Invalid feature schema in {}", path.display()))?;
        info!(
            "Loaded feature schema from {}: {} numerical + {} categorical = {} features",
            path.display(),
            schema.numerical_count,
            schema.names.len() - schema.numerical_count,
            schema.names.len()
        );
        Ok(schema)
    }

    /// Builds the schema and its name-to-index map, rejecting names the
    /// deriver cannot produce and names listed twice.
    pub fn from_info(info: FeatureInfo) -> AdvisorResult<Self> {
        let numerical_count = info.numerical_features.len();
        let names: Vec<String> = info
            .numerical_features
            .into_iter()
            .chain(info.categorical_features)
            .collect();

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if !is_known_feature(name) {
                return Err(AdvisorError::UnknownFeature(name.clone()));
            }
            if index.insert(name.clone(), position).is_some() {
                return Err(AdvisorError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self {
            names,
            numerical_count,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn numerical_count(&self) -> usize {
        self.numerical_count
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Places each derived value at its schema index. Derived features the
    /// schema does not list are skipped. A value that is not finite once
    /// narrowed to `f32` is rejected by name.
    pub fn assemble(&self, derived: &DerivedFeatures) -> AdvisorResult<FeatureVector> {
        let mut slots: Vec<Option<f32>> = vec![None; self.names.len()];
        for (name, value) in derived.iter() {
            if let Some(position) = self.index_of(name) {
                slots[position] = Some(value as f32);
            }
        }

        let mut values = Vec::with_capacity(slots.len());
        for (position, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(value) if value.is_finite() => values.push(value),
                Some(_) => {
                    return Err(AdvisorError::NonFiniteFeature(
                        self.names[position].clone(),
                    ))
                }
                None => return Err(AdvisorError::UnknownFeature(self.names[position].clone())),
            }
        }
        debug!("Assembled feature vector of length {}", values.len());
        Ok(FeatureVector { values })
    }
}

/// Feature values in schema order, ready for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}
