//! The protocol spoken between the research graph and an LLM.
//!
//! A research run only needs three things from a model: take the
//! conversation so far, stream back text, and optionally ask for tool
//! calls (the web search). This crate describes exactly that, so the
//! graph can run against a hosted OpenAI-compatible endpoint or the
//! scripted mock without caring which one it got.
//!
//! Nothing here performs I/O. Providers live in their own crates.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
