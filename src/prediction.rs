// src/prediction.rs
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AdvisorError, AdvisorResult};
use crate::features::{build_feature_vector, FeatureSchema, FeatureVector};
use crate::history::{PredictionHistory, PredictionRecord};
use crate::models::{ModelSet, Predictor};

/// Scores above this are read as "yes" for every boolean output.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsModelOutput {
    pub can_achieve_savings: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmountModelOutput {
    pub recommended_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiTaskModelOutput {
    pub can_achieve_savings: bool,
    pub savings_confidence: f64,
    pub recommended_savings_amount: f64,
    pub financial_risk: bool,
    pub risk_score: f64,
}

/// The `/predict` response, keyed by model name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionOutput {
    pub savings_model: SavingsModelOutput,
    pub amount_model: AmountModelOutput,
    pub multi_task_model: MultiTaskModelOutput,
}

pub struct PredictionService {
    schema: Arc<FeatureSchema>,
    models: ModelSet,
    history: Arc<PredictionHistory>,
}

impl PredictionService {
    /// Fails when any model was trained on a different feature width than
    /// the schema provides.
    pub fn new(
        schema: Arc<FeatureSchema>,
        models: ModelSet,
        history: Arc<PredictionHistory>,
    ) -> anyhow::Result<Self> {
        for model in models.iter() {
            if model.input_dim() != schema.len() {
                anyhow::bail!(
                    "Model '{}' expects {} features but the feature schema has {}",
                    model.name(),
                    model.input_dim(),
                    schema.len()
                );
            }
        }
        Ok(Self {
            schema,
            models,
            history,
        })
    }

    pub fn features_expected(&self) -> usize {
        self.schema.len()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Derives features, runs all three models and records the result.
    ///
    /// Any failure aborts the whole prediction; there are no partial results.
    pub async fn predict(&self, body: &JsonValue) -> AdvisorResult<PredictionOutput> {
        let start = Instant::now();
        if !body.is_object() {
            return Err(AdvisorError::NotAnObject);
        }
        let (_, vector) = build_feature_vector(&self.schema, body)?;
        self.check_width(&vector)?;

        let savings = run_model(self.models.savings.as_ref(), &vector, 1)?;
        let amount = run_model(self.models.amount.as_ref(), &vector, 1)?;
        let multi = run_model(self.models.multi_task.as_ref(), &vector, 3)?;

        let output = PredictionOutput {
            savings_model: SavingsModelOutput {
                can_achieve_savings: savings[0] > DECISION_THRESHOLD,
                confidence: savings[0] as f64,
            },
            amount_model: AmountModelOutput {
                recommended_savings: amount[0] as f64,
            },
            multi_task_model: MultiTaskModelOutput {
                can_achieve_savings: multi[0] > DECISION_THRESHOLD,
                savings_confidence: multi[0] as f64,
                recommended_savings_amount: multi[1] as f64,
                financial_risk: multi[2] > DECISION_THRESHOLD,
                risk_score: multi[2] as f64,
            },
        };
        info!(
            "Prediction complete in {:?}: can_achieve={} recommended={:.2} risk={:.3}",
            start.elapsed(),
            output.savings_model.can_achieve_savings,
            output.amount_model.recommended_savings,
            output.multi_task_model.risk_score
        );

        self.record(body, &output).await;
        Ok(output)
    }

    fn check_width(&self, vector: &FeatureVector) -> AdvisorResult<()> {
        let expected = self.schema.len();
        if vector.len() != expected {
            return Err(AdvisorError::FeatureCountMismatch {
                expected,
                actual: vector.len(),
            });
        }
        for model in self.models.iter() {
            if model.input_dim() != vector.len() {
                return Err(AdvisorError::UpstreamPrediction(format!(
                    "{} expects {} features, got {}",
                    model.name(),
                    model.input_dim(),
                    vector.len()
                )));
            }
        }
        Ok(())
    }

    async fn record(&self, body: &JsonValue, output: &PredictionOutput) {
        let output_json = match serde_json::to_value(output) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not serialize prediction for history: {}", e);
                return;
            }
        };
        let record = PredictionRecord::new(body.clone(), output_json);
        if let Err(e) = self.history.append(record).await {
            warn!(
                "Prediction succeeded but could not be saved to {}: {}",
                self.history.path().display(),
                e
            );
        }
    }
}

fn run_model(
    model: &dyn Predictor,
    vector: &FeatureVector,
    expected_outputs: usize,
) -> AdvisorResult<Vec<f32>> {
    let outputs = model
        .predict(vector)
        .map_err(|e| AdvisorError::UpstreamPrediction(format!("{}: {:#}", model.name(), e)))?;
    if outputs.len() < expected_outputs {
        return Err(AdvisorError::UpstreamPrediction(format!(
            "{} returned {} outputs, expected {}",
            model.name(),
            outputs.len(),
            expected_outputs
        )));
    }
    debug!("{} -> {:?}", model.name(), outputs);
    Ok(outputs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::profile::tests::sample_profile_json;
    use crate::features::schema::tests::full_feature_info;
    use crate::models::testing::{fixed, fixed_model_set, FailingPredictor};
    use serde_json::json;

    pub(crate) fn service_with(models: ModelSet, history: Arc<PredictionHistory>) -> PredictionService {
        let schema = Arc::new(FeatureSchema::from_info(full_feature_info()).unwrap());
        PredictionService::new(schema, models, history).unwrap()
    }

    fn temp_history(dir: &tempfile::TempDir) -> Arc<PredictionHistory> {
        Arc::new(PredictionHistory::new(dir.path().join("user_data.json")))
    }

    #[tokio::test]
    async fn test_merges_three_models() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(fixed_model_set(), temp_history(&dir));
        let output = service.predict(&sample_profile_json()).await.unwrap();

        assert!(output.savings_model.can_achieve_savings);
        assert!((output.savings_model.confidence - 0.73).abs() < 1e-6);
        assert!((output.amount_model.recommended_savings - 4200.5).abs() < 1e-3);
        assert!(!output.multi_task_model.can_achieve_savings);
        assert!((output.multi_task_model.recommended_savings_amount - 3900.0).abs() < 1e-3);
        assert!(output.multi_task_model.financial_risk);
        assert!((output.multi_task_model.risk_score - 0.81).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let mut models = fixed_model_set();
        models.savings = fixed("savings_model", 49, vec![0.5]);
        let service = service_with(models, temp_history(&dir));
        let output = service.predict(&sample_profile_json()).await.unwrap();
        assert!(!output.savings_model.can_achieve_savings);
    }

    #[tokio::test]
    async fn test_successful_prediction_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let history = temp_history(&dir);
        let service = service_with(fixed_model_set(), history.clone());
        let body = sample_profile_json();
        let output = service.predict(&body).await.unwrap();

        let latest = history.latest().await.unwrap().unwrap();
        assert_eq!(latest.input, body);
        assert_eq!(latest.output, serde_json::to_value(&output).unwrap());
    }

    #[test]
    fn test_model_width_mismatch_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut models = fixed_model_set();
        models.amount = fixed("amount_model", 45, vec![1.0]);
        let schema = Arc::new(FeatureSchema::from_info(full_feature_info()).unwrap());
        let err = PredictionService::new(schema, models, temp_history(&dir))
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.contains("amount_model"), "{}", message);
        assert!(message.contains("45"), "{}", message);
        assert!(message.contains("49"), "{}", message);
    }

    #[test]
    fn test_vector_width_checked_against_models() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(fixed_model_set(), temp_history(&dir));
        assert!(service.check_width(&FeatureVector::from(vec![0.0; 49])).is_ok());

        let mut narrow = service;
        narrow.models.savings = fixed("savings_model", 48, vec![0.9]);
        match narrow.check_width(&FeatureVector::from(vec![0.0; 49])).unwrap_err() {
            AdvisorError::UpstreamPrediction(message) => assert!(message.contains("48")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_model_failure_aborts_everything() {
        let dir = tempfile::tempdir().unwrap();
        let history = temp_history(&dir);
        let mut models = fixed_model_set();
        models.multi_task = Arc::new(FailingPredictor);
        let service = service_with(models, history.clone());

        let err = service.predict(&sample_profile_json()).await.unwrap_err();
        assert!(matches!(err, AdvisorError::UpstreamPrediction(_)));
        assert!(history.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_model_output_is_upstream_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut models = fixed_model_set();
        models.multi_task = fixed("multi_task_model", 49, vec![0.9]);
        let service = service_with(models, temp_history(&dir));
        assert!(matches!(
            service.predict(&sample_profile_json()).await.unwrap_err(),
            AdvisorError::UpstreamPrediction(_)
        ));
    }

    #[tokio::test]
    async fn test_non_object_body() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(fixed_model_set(), temp_history(&dir));
        assert!(matches!(
            service.predict(&json!("income=5")).await.unwrap_err(),
            AdvisorError::NotAnObject
        ));
    }
}
