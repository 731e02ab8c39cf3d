//! # poetry-image-common
//!
//! Shared types for the python-poetry image publisher.
//!
//! Currently this is the error taxonomy used by the publish flow and the
//! toolchain adapters.

#![warn(missing_docs)]

pub mod error;

pub use error::{PublishError, PublishResult};
