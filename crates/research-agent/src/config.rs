//! Settings read from the environment.

use std::env;
use std::str::FromStr;

use crate::logging::LogLevel;
use crate::search::SearchProvider;

/// Key value shipped in the sample `.env`, treated as unset.
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_SEARCH_ITERATIONS: u32 = 3;
const DEFAULT_MAX_RESULTS_PER_QUERY: usize = 5;

/// An invalid or incomplete configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    #[error("invalid value `{value}` for {var}: {reason}")]
    InvalidValue {
        /// The variable, e.g. `RESEARCH_TEMPERATURE`.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// What was expected instead.
        reason: String,
    },
    /// The Tavily backend was chosen without a key.
    #[error("TAVILY_API_KEY is required when the search provider is `tavily`")]
    MissingTavilyKey,
}

impl ConfigError {
    pub(crate) fn invalid(
        var: &'static str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            var,
            value: value.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Runtime configuration of the research agent.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// `OPENAI_API_KEY`. `None` selects the mock model.
    pub openai_api_key: Option<String>,
    /// `OPENAI_BASE_URL`.
    pub openai_base_url: Option<String>,
    /// `RESEARCH_PLANNER_MODEL`.
    pub model: String,
    /// `RESEARCH_TEMPERATURE`.
    pub temperature: f32,
    /// `RESEARCH_SEARCH_PROVIDER`.
    pub search_provider: SearchProvider,
    /// `TAVILY_API_KEY`.
    pub tavily_api_key: Option<String>,
    /// `RESEARCH_MAX_SEARCH_ITERATIONS`.
    pub max_search_iterations: u32,
    /// `RESEARCH_MAX_RESULTS_PER_QUERY`.
    pub max_results_per_query: usize,
    /// `RESEARCH_SYSTEM_PROMPT`.
    pub system_prompt: Option<String>,
    /// `LOG_LEVEL`.
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: None,
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            search_provider: SearchProvider::default(),
            tavily_api_key: None,
            max_search_iterations: DEFAULT_MAX_SEARCH_ITERATIONS,
            max_results_per_query: DEFAULT_MAX_RESULTS_PER_QUERY,
            system_prompt: None,
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY")
                .filter(|key| key != PLACEHOLDER_API_KEY),
            openai_base_url: get("OPENAI_BASE_URL"),
            model: get("RESEARCH_PLANNER_MODEL").unwrap_or(defaults.model),
            temperature: parse_var(
                "RESEARCH_TEMPERATURE",
                get("RESEARCH_TEMPERATURE"),
                defaults.temperature,
            )?,
            search_provider: parse_var(
                "RESEARCH_SEARCH_PROVIDER",
                get("RESEARCH_SEARCH_PROVIDER"),
                defaults.search_provider,
            )?,
            tavily_api_key: get("TAVILY_API_KEY"),
            max_search_iterations: parse_var(
                "RESEARCH_MAX_SEARCH_ITERATIONS",
                get("RESEARCH_MAX_SEARCH_ITERATIONS"),
                defaults.max_search_iterations,
            )?,
            max_results_per_query: parse_var(
                "RESEARCH_MAX_RESULTS_PER_QUERY",
                get("RESEARCH_MAX_RESULTS_PER_QUERY"),
                defaults.max_results_per_query,
            )?,
            system_prompt: get("RESEARCH_SYSTEM_PROMPT"),
            log_level: parse_var(
                "LOG_LEVEL",
                get("LOG_LEVEL"),
                defaults.log_level,
            )?,
        })
    }

    /// Returns `true` if no usable OpenAI key is configured.
    #[inline]
    pub fn use_mock_model(&self) -> bool {
        self.openai_api_key.is_none()
    }

    /// Checks settings that depend on each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_provider == SearchProvider::Tavily
            && self.tavily_api_key.is_none()
        {
            return Err(ConfigError::MissingTavilyKey);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "RESEARCH_TEMPERATURE",
                &self.temperature.to_string(),
                "expected a number between 0 and 2",
            ));
        }
        Ok(())
    }
}

fn parse_var<T>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match value {
        Some(value) => value.parse().map_err(|err: T::Err| {
            ConfigError::invalid(var, &value, err.to_string())
        }),
        None => Ok(default),
    }
}
