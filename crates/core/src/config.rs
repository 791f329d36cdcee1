//! Process settings read once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Model used when `MODEL_NAME` is not set.
pub const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";

/// Temperature used when `TEMPERATURE` is not set.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Models offered by the web form, in display order.
pub const SUPPORTED_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"];

/// Settings forwarded to the chat model on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,

    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
}

/// Configuration holder shared by the entry points.
///
/// Built once from the environment and then passed by value; the web form
/// works on a per-session clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub model_name: String,
    pub temperature: f32,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            verbose: false,
        }
    }
}

impl Config {
    /// Read `MODEL_NAME`, `TEMPERATURE` and `VERBOSE` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("MODEL_NAME").filter(|m| !m.trim().is_empty()) {
            config.model_name = model.trim().to_string();
        }

        if let Some(raw) = lookup("TEMPERATURE") {
            let temperature = raw.trim().parse::<f32>().map_err(|_| {
                Error::InvalidConfig(format!("TEMPERATURE must be a number, got '{}'", raw))
            })?;
            config = config.with_temperature(temperature)?;
        }

        if let Some(raw) = lookup("VERBOSE") {
            config.verbose = parse_flag(&raw).ok_or_else(|| {
                Error::InvalidConfig(format!("VERBOSE must be a boolean, got '{}'", raw))
            })?;
        }

        Ok(config)
    }

    /// Replace the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    /// Replace the temperature, rejecting values outside `[0, 1]`.
    pub fn with_temperature(mut self, temperature: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(Error::InvalidConfig(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                temperature
            )));
        }
        self.temperature = temperature;
        Ok(self)
    }

    /// Enable or disable verbose progress logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The subset of settings the chat model needs.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model_name.clone(),
            temperature: self.temperature,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
