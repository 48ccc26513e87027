//! A research agent: a query goes through a small model/search graph and
//! comes back as a report.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library, starting from [`SessionBuilder`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod logging;
pub mod search;
mod session;
pub mod tools;

pub use config::{AppConfig, ConfigError};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`research_agent_core`] crate.
pub mod core {
    pub use research_agent_core::*;
}
