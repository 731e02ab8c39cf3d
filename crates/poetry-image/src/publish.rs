//! Build-and-publish orchestration.

use poetry_image_common::{PublishError, PublishResult};

use crate::builder::BuilderGuard;
use crate::config::{PLATFORMS, PublishConfig, TARGET_STAGE};
use crate::context::resolve_context;
use crate::toolchain::{BuildRequest, BuilderOptions, Toolchain};

/// A successfully pushed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Reference the image was pushed to.
    pub reference: String,
    /// Manifest digest, when reported by the toolchain.
    pub digest: Option<String>,
}

/// Build the image for all platforms and push it.
///
/// The builder instance is released on every path once provisioned. Login
/// is skipped when no credentials are configured.
pub fn publish(config: &PublishConfig, toolchain: &dyn Toolchain) -> PublishResult<Published> {
    let context = config.context.clone().unwrap_or_else(resolve_context);
    if !context.is_dir() {
        return Err(PublishError::Config {
            message: format!("build context {} is not a directory", context.display()),
        });
    }
    let reference = config.image_reference().to_string();

    tracing::info!(
        reference = %reference,
        context = %context.display(),
        cache = ?config.cache,
        "Publishing image"
    );

    let builder = BuilderGuard::provision(toolchain, &BuilderOptions::multi_platform())?;

    match &config.credentials {
        Some(credentials) => {
            tracing::info!(registry = %config.registry, username = %credentials.username, "Logging in");
            toolchain.login(&config.registry, credentials)?;
        }
        None => tracing::info!(registry = %config.registry, "No credentials given, skipping login"),
    }

    let request = BuildRequest {
        context,
        target: TARGET_STAGE.to_string(),
        build_args: config.build_args(),
        tags: vec![reference.clone()],
        platforms: PLATFORMS.iter().map(ToString::to_string).collect(),
        builder: builder.name().to_string(),
        cache_from: config.cache.cache_from(),
        cache_to: config.cache.cache_to(),
        push: true,
    };
    tracing::info!(builder = %builder.name(), platforms = %request.platforms.join(","), "Building");
    let outcome = toolchain.build_and_push(&request)?;

    drop(builder);

    tracing::info!(reference = %reference, digest = ?outcome.digest, "Published image");
    Ok(Published {
        reference,
        digest: outcome.digest,
    })
}
