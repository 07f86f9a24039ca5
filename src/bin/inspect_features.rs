// src/bin/inspect_features.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use savings_advisor_lib::features::{build_feature_vector, FeatureSchema};
use savings_advisor_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Print the model feature vector for a raw profile", long_about = None)]
struct InspectArgs {
    /// Feature schema (feature_info.json)
    #[arg(long, default_value = "model/feature_info.json")]
    schema: PathBuf,

    /// Raw profile JSON, the same body /predict accepts
    #[arg(long)]
    profile: PathBuf,

    /// Print only features with a non-zero value
    #[arg(long)]
    non_zero: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = InspectArgs::parse();

    let schema = FeatureSchema::load(&args.schema).context("Failed to load feature schema")?;
    let raw = std::fs::read_to_string(&args.profile)
        .with_context(|| format!("Failed to read profile {}", args.profile.display()))?;
    let body: JsonValue = serde_json::from_str(&raw)
        .with_context(|| format!("Profile {} is not valid JSON", args.profile.display()))?;

    let (derived, vector) = build_feature_vector(&schema, &body)
        .with_context(|| format!("Profile {} was rejected", args.profile.display()))?;
    info!(
        "Derived {} features, schema expects {}",
        derived.len(),
        vector.len()
    );

    let width = schema.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for (index, (name, value)) in schema.names().iter().zip(vector.as_slice()).enumerate() {
        if args.non_zero && *value == 0.0 {
            continue;
        }
        let kind = if index < schema.numerical_count() {
            "num"
        } else {
            "cat"
        };
        println!("{:>3} {} {:<width$} {}", index, kind, name, value, width = width);
    }
    Ok(())
}
