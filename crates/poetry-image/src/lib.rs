//! # poetry-image
//!
//! Builds the `pfeiffermax/python-poetry` image for `linux/amd64` and
//! `linux/arm64/v8` with docker buildx and pushes it to a registry.
//!
//! - Image reference composition
//! - Build context resolution
//! - Builder instance lifecycle with guaranteed teardown
//! - Registry login and multi-platform build-and-push
//!
//! The docker CLI sits behind the [`Toolchain`] trait.

#![warn(missing_docs)]

pub mod builder;
pub mod cli;
pub mod config;
pub mod context;
pub mod publish;
pub mod reference;
pub mod toolchain;

pub use builder::BuilderGuard;
pub use config::{CacheBackend, PublishConfig, RegistryCredentials};
pub use context::resolve_context;
pub use publish::{Published, publish};
pub use reference::{ImageReference, build_reference};
pub use toolchain::{BuildOutcome, BuildRequest, BuilderHandle, BuilderOptions, DockerCli, Toolchain};
