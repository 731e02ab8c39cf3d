//! Error types for the image publisher.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`PublishError`].
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors raised while building and publishing an image.
///
/// Variants that wrap a failed toolchain call carry the toolchain's stderr
/// unmodified in `message`.
#[derive(Error, Diagnostic, Debug)]
pub enum PublishError {
    /// Registry login was rejected.
    #[error("{message}")]
    #[diagnostic(
        code(poetry_image::registry::authentication),
        help("Check --docker-hub-username and --docker-hub-password")
    )]
    Authentication {
        /// The registry that rejected the credentials.
        registry: String,
        /// Toolchain output.
        message: String,
    },

    /// The multi-platform builder instance could not be provisioned.
    #[error("{message}")]
    #[diagnostic(
        code(poetry_image::builder::create),
        help("Make sure the docker buildx plugin is installed")
    )]
    BuilderCreate {
        /// Toolchain output.
        message: String,
    },

    /// Build or push failed.
    #[error("{message}")]
    #[diagnostic(code(poetry_image::build))]
    Build {
        /// Image reference that was being built.
        reference: String,
        /// Toolchain output.
        message: String,
    },

    /// Builder teardown failed.
    #[error("{message}")]
    #[diagnostic(code(poetry_image::builder::teardown))]
    Teardown {
        /// Builder instance name.
        builder: String,
        /// Toolchain output.
        message: String,
    },

    /// The toolchain binary could not be spawned.
    #[error("Failed to run {program}: {source}")]
    #[diagnostic(
        code(poetry_image::toolchain),
        help("Is docker installed and on PATH? Use --docker to point at another binary")
    )]
    Toolchain {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(poetry_image::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(poetry_image::serialization))]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(poetry_image::config))]
    Config {
        /// The error message.
        message: String,
    },
}

impl PublishError {
    /// Whether the error came from a rejected registry login.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
