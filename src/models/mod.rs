// src/models/mod.rs
pub mod dense;

use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::features::FeatureVector;

pub use dense::DenseNetwork;

/// A pre-trained model that maps one feature vector to one value per output.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    /// Width of the feature vector this model was trained on.
    fn input_dim(&self) -> usize;

    fn predict(&self, features: &FeatureVector) -> Result<Vec<f32>>;
}

/// The three independently trained models behind `/predict`.
#[derive(Clone)]
pub struct ModelSet {
    /// Binary classifier: probability the savings goal is achievable.
    pub savings: Arc<dyn Predictor>,
    /// Regressor: recommended monthly savings amount.
    pub amount: Arc<dyn Predictor>,
    /// Multi-task model: achievability, amount and financial risk.
    pub multi_task: Arc<dyn Predictor>,
}

impl ModelSet {
    pub fn load(savings_path: &Path, amount_path: &Path, multi_task_path: &Path) -> Result<Self> {
        let savings = DenseNetwork::load(savings_path).context("Error loading savings model")?;
        let amount = DenseNetwork::load(amount_path).context("Error loading amount model")?;
        let multi_task =
            DenseNetwork::load(multi_task_path).context("Error loading multi-task model")?;
        info!("✅ All three prediction models loaded");
        Ok(Self {
            savings: Arc::new(savings),
            amount: Arc::new(amount),
            multi_task: Arc::new(multi_task),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Predictor>> {
        [&self.savings, &self.amount, &self.multi_task].into_iter()
    }
}
