// src/utils/config.rs
use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::chat::GeminiSettings;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_MODEL_DIR: &str = "model";
pub const DEFAULT_USER_DATA_FILE: &str = "user_data.json";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-002";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 60;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub feature_info_path: PathBuf,
    pub savings_model_path: PathBuf,
    pub amount_model_path: PathBuf,
    pub multi_task_model_path: PathBuf,
    pub user_data_path: PathBuf,
    pub gemini: GeminiSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must look like host:port")?;

        let model_dir = PathBuf::from(get("MODEL_DIR").unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string()));
        let path_or = |key: &str, default: PathBuf| get(key).map(PathBuf::from).unwrap_or(default);
        let trained = model_dir.join("trained_model");

        let api_key = match get("GEMINI_API_KEY") {
            Some(key) => key,
            None => bail!("GEMINI_API_KEY is not set; the chat endpoint cannot start without it"),
        };
        let timeout_secs = match get("GEMINI_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("GEMINI_TIMEOUT_SECS must be a whole number, got '{}'", raw))?,
            None => DEFAULT_GEMINI_TIMEOUT_SECS,
        };

        Ok(Self {
            bind_addr,
            feature_info_path: path_or("FEATURE_INFO_FILE", model_dir.join("feature_info.json")),
            savings_model_path: path_or("SAVINGS_MODEL_PATH", trained.join("best_savings_model.json")),
            amount_model_path: path_or("AMOUNT_MODEL_PATH", trained.join("best_amount_model.json")),
            multi_task_model_path: path_or(
                "MULTI_TASK_MODEL_PATH",
                trained.join("best_multi_task_model.json"),
            ),
            user_data_path: path_or("USER_DATA_FILE", PathBuf::from(DEFAULT_USER_DATA_FILE)),
            gemini: GeminiSettings {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                timeout_secs,
            },
        })
    }

    pub fn log_config(&self) {
        info!("⚙️  Savings advisor configuration");
        info!("   Listening on: {}", self.bind_addr);
        info!("   Feature schema: {}", self.feature_info_path.display());
        info!("   Savings model: {}", self.savings_model_path.display());
        info!("   Amount model: {}", self.amount_model_path.display());
        info!("   Multi-task model: {}", self.multi_task_model_path.display());
        info!("   Prediction history: {}", self.user_data_path.display());
        info!(
            "   Gemini: model={} base={} timeout={}s key=[hidden]",
            self.gemini.model, self.gemini.api_base, self.gemini.timeout_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.feature_info_path, PathBuf::from("model/feature_info.json"));
        assert_eq!(
            config.multi_task_model_path,
            PathBuf::from("model/trained_model/best_multi_task_model.json")
        );
        assert_eq!(config.user_data_path, PathBuf::from("user_data.json"));
        assert_eq!(config.gemini.model, "gemini-1.5-flash-002");
        assert_eq!(config.gemini.timeout_secs, 60);
    }

    #[test]
    fn test_model_dir_moves_every_artifact() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("MODEL_DIR", "/srv/models"),
            ("AMOUNT_MODEL_PATH", "/tmp/amount.json"),
        ]))
        .unwrap();
        assert_eq!(config.feature_info_path, PathBuf::from("/srv/models/feature_info.json"));
        assert_eq!(
            config.savings_model_path,
            PathBuf::from("/srv/models/trained_model/best_savings_model.json")
        );
        assert_eq!(config.amount_model_path, PathBuf::from("/tmp/amount.json"));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("BIND_ADDR", "localhost")
        ]))
        .is_err());
        assert!(AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_TIMEOUT_SECS", "soon")
        ]))
        .is_err());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("GEMINI_API_KEY", "env-key");
        env::set_var("GEMINI_MODEL", "gemini-env");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.gemini.api_key, "env-key");
        assert_eq!(config.gemini.model, "gemini-env");
        env::remove_var("GEMINI_API_KEY");
        env::remove_var("GEMINI_MODEL");
    }
}
