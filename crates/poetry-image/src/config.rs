//! Publish configuration.

use std::fmt;
use std::path::PathBuf;

use crate::reference::ImageReference;

/// Target platforms of every published image.
pub const PLATFORMS: [&str; 2] = ["linux/amd64", "linux/arm64/v8"];

/// Build stage selected as the final output.
pub const TARGET_STAGE: &str = "production-image";

/// Directory used by the local cache backend.
pub const LOCAL_CACHE_DIR: &str = "/tmp";

/// Registry credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    /// Username.
    pub username: String,
    /// Password or access token.
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where buildx reads and writes its layer cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// GitHub Actions cache service, all layers exported.
    #[default]
    GithubActions,
    /// Local directory ([`LOCAL_CACHE_DIR`]), all layers exported.
    Local,
}

impl CacheBackend {
    /// Value for `--cache-from`.
    #[must_use]
    pub fn cache_from(self) -> String {
        match self {
            Self::GithubActions => "type=gha".to_string(),
            Self::Local => format!("type=local,src={LOCAL_CACHE_DIR}"),
        }
    }

    /// Value for `--cache-to`.
    #[must_use]
    pub fn cache_to(self) -> String {
        match self {
            Self::GithubActions => "type=gha,mode=max".to_string(),
            Self::Local => format!("type=local,mode=max,dest={LOCAL_CACHE_DIR}"),
        }
    }
}

/// Immutable configuration of a single publish run.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Registry host.
    pub registry: String,
    /// Credentials; `None` means anonymous access.
    pub credentials: Option<RegistryCredentials>,
    /// Image version tag.
    pub version_tag: String,
    /// Python version of the base image.
    pub python_version: String,
    /// OS variant of the base image.
    pub os_variant: String,
    /// Poetry version to install.
    pub poetry_version: String,
    /// Cache backend.
    pub cache: CacheBackend,
    /// Build context; resolved from the crate location when unset.
    pub context: Option<PathBuf>,
}

impl PublishConfig {
    /// Reference the image is pushed to.
    #[must_use]
    pub fn image_reference(&self) -> ImageReference {
        ImageReference::new(
            &self.registry,
            &self.version_tag,
            &self.poetry_version,
            &self.python_version,
            &self.os_variant,
        )
    }

    /// Base image the Dockerfile builds from.
    #[must_use]
    pub fn official_python_image(&self) -> String {
        format!("python:{}-{}", self.python_version, self.os_variant)
    }

    /// Build arguments passed to the build.
    #[must_use]
    pub fn build_args(&self) -> Vec<(String, String)> {
        vec![
            ("POETRY_VERSION".to_string(), self.poetry_version.clone()),
            (
                "OFFICIAL_PYTHON_IMAGE".to_string(),
                self.official_python_image(),
            ),
        ]
    }
}
