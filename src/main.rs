// src/main.rs
use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;
use std::time::Instant;

use savings_advisor_lib::api::{create_router, AppContext};
use savings_advisor_lib::chat::{ChatService, GeminiClient};
use savings_advisor_lib::features::FeatureSchema;
use savings_advisor_lib::history::PredictionHistory;
use savings_advisor_lib::models::ModelSet;
use savings_advisor_lib::prediction::PredictionService;
use savings_advisor_lib::utils::config::AppConfig;
use savings_advisor_lib::utils::env::load_env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting savings advisor API");
    load_env();

    let start = Instant::now();
    let config = AppConfig::from_env().context("Invalid configuration")?;
    config.log_config();

    let schema = FeatureSchema::load(&config.feature_info_path)
        .context("Failed to load feature schema")?;
    info!(
        "📐 Feature schema loaded: {} features ({} numerical)",
        schema.len(),
        schema.numerical_count()
    );

    let models = ModelSet::load(
        &config.savings_model_path,
        &config.amount_model_path,
        &config.multi_task_model_path,
    )
    .context("Failed to load prediction models")?;

    let generator = GeminiClient::new(&config.gemini).context("Failed to set up Gemini client")?;
    let history = Arc::new(PredictionHistory::new(config.user_data_path.clone()));

    let prediction = PredictionService::new(Arc::new(schema), models, history.clone())
        .context("Prediction models do not match the feature schema")?;
    let context = AppContext {
        prediction,
        chat: ChatService::new(history.clone(), Arc::new(generator)),
        history,
    };
    let app = create_router(Arc::new(context));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(
        "🚀 Ready in {:.2?}, serving on http://{}",
        start.elapsed(),
        config.bind_addr
    );
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
