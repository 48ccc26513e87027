//! Log level parsing and filter directives.

use std::fmt::{self, Display};
use std::str::FromStr;

use tracing::level_filters::LevelFilter;

/// Crates of the HTTP stack, kept quiet unless debugging.
const HTTP_CRATES: [&str; 3] = ["reqwest", "hyper", "hyper_util"];

/// Verbosity of the logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LogLevel {
    /// Everything, including streamed events.
    Trace,
    /// Graph steps and requests.
    Debug,
    /// Run summaries.
    #[default]
    Info,
    /// Retries and tool failures.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Returns the filter directives for this level.
    ///
    /// At `info`, the HTTP stack is capped at `warn`. Quieter levels
    /// already cover it.
    pub fn filter_directives(self) -> String {
        let mut directives = self.to_string();
        if self == LogLevel::Info {
            for krate in HTTP_CRATES {
                directives.push_str(&format!(",{krate}=warn"));
            }
        }
        directives
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&LevelFilter::from(*self), f)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let filter = s
            .trim()
            .parse::<LevelFilter>()
            .map_err(|err| err.to_string())?;
        LogLevel::ALL
            .into_iter()
            .find(|level| LevelFilter::from(*level) == filter)
            .ok_or_else(|| "logging cannot be turned off".to_owned())
    }
}
