//! Engine configuration
//!
//! Every time-dependent computation (duration resolution, recency cutoff,
//! competency gap) reads the single `reference_date` here instead of the
//! wall clock, so test suites are deterministic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REFERENCE_DATE: &str = "2026-01-01";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "qwen3-next:80b-cloud";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Date that "Present" resolves to and that recency is measured from
    pub reference_date: NaiveDate,
    /// Months after which experience stops counting as current
    pub recency_months_limit: i64,
    /// Minimum cosine similarity for a vector-tier match
    pub vector_threshold: f64,
    /// Background worker pool size
    pub max_workers: usize,
    /// Maximum candidates returned by a matching job
    pub result_limit: usize,
    pub ollama_host: String,
    pub chat_model: String,
    pub embed_model: String,
    /// HTTP bind address
    pub listen_addr: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_date: NaiveDate::parse_from_str(DEFAULT_REFERENCE_DATE, "%Y-%m-%d")
                .expect("default reference date is valid"),
            recency_months_limit: crate::eligibility::RECENCY_MONTHS_LIMIT,
            vector_threshold: 0.92,
            max_workers: 2,
            result_limit: crate::ranker::DEFAULT_RESULT_LIMIT,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden from `TALENTMATCH_*` environment variables.
    /// Unparseable values keep the default and log a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("TALENTMATCH_REFERENCE_DATE") {
            match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(date) => config.reference_date = date,
                Err(e) => log::warn!("[EngineConfig] Bad TALENTMATCH_REFERENCE_DATE {:?}: {}", raw, e),
            }
        }
        if let Ok(raw) = std::env::var("TALENTMATCH_RECENCY_MONTHS") {
            match raw.parse() {
                Ok(v) => config.recency_months_limit = v,
                Err(e) => log::warn!("[EngineConfig] Bad TALENTMATCH_RECENCY_MONTHS {:?}: {}", raw, e),
            }
        }
        if let Ok(raw) = std::env::var("TALENTMATCH_MAX_WORKERS") {
            match raw.parse() {
                Ok(v) => config.max_workers = v,
                Err(e) => log::warn!("[EngineConfig] Bad TALENTMATCH_MAX_WORKERS {:?}: {}", raw, e),
            }
        }
        if let Ok(host) = std::env::var("TALENTMATCH_OLLAMA_HOST") {
            config.ollama_host = host;
        }
        if let Ok(model) = std::env::var("TALENTMATCH_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = std::env::var("TALENTMATCH_EMBED_MODEL") {
            config.embed_model = model;
        }
        if let Ok(addr) = std::env::var("TALENTMATCH_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        config
    }
}
