use std::path::Path;
use std::time::Duration;

use coherence_domain::{EncodingStrategy, ModelId, TaxonomyPreset, Temperature};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::{Error, Result, RetryConfig};

/// Optional file consulted from the working directory.
pub const CONFIG_FILE: &str = "coherence.toml";

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "COHERENCE";

/// Variables searched, in order, for the backend credential.
pub const CREDENTIAL_VARS: &[&str] = &["OPENAI_API_KEY", "COHERENCE_API_KEY"];

/// Everything a harness run needs apart from the scenarios themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[serde(rename_all = "snake_case")]
#[setters(into)]
pub struct HarnessConfig {
    /// Strategy to evaluate; `None` evaluates both for comparison.
    #[serde(default)]
    pub strategy: Option<EncodingStrategy>,
    pub model: ModelId,
    pub temperature: Temperature,
    pub max_tokens: usize,
    /// Base URL of an OpenAI-compatible API.
    pub api_url: String,
    /// Upper bound for a single backend call.
    pub timeout_secs: u64,
    pub taxonomy: TaxonomyPreset,
    pub retry: RetryConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            model: ModelId::new("gpt-4.1"),
            temperature: Temperature::default(),
            max_tokens: 300,
            api_url: "https://api.openai.com/v1/".to_string(),
            timeout_secs: 60,
            taxonomy: TaxonomyPreset::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration in increasing order of precedence:
    /// 1. Built-in defaults
    /// 2. `coherence.toml` in the working directory, when present
    /// 3. `COHERENCE_*` environment variables, after reading any `.env` file
    ///
    /// Nested keys use a double underscore, e.g.
    /// `COHERENCE_RETRY__MAX_RETRY_ATTEMPTS=3`.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_sources(Path::new(CONFIG_FILE), None)
    }

    /// Same layering as [`HarnessConfig::load`] with an explicit file and,
    /// when `env` is given, a fixed set of variables instead of the process
    /// environment.
    pub fn from_sources(file: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        debug!(model = %config.model, strategy = ?config.strategy, "Loaded harness configuration");
        Ok(config)
    }

    /// Strategies to run: the configured one, or every strategy.
    pub fn strategies(&self) -> Vec<EncodingStrategy> {
        match self.strategy {
            Some(strategy) => vec![strategy],
            None => EncodingStrategy::iter().collect(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves the backend credential from the process environment. Called
    /// once at startup so a missing key fails before any conversation runs.
    pub fn credential(&self) -> Result<String> {
        Self::credential_from(|name| std::env::var(name).ok())
    }

    pub fn credential_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        CREDENTIAL_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Error::MissingCredential(CREDENTIAL_VARS.iter().map(|name| name.to_string()).collect())
            })
    }
}
