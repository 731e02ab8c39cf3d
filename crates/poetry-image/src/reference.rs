//! Image reference composition.

use std::fmt;

/// Namespace and repository the image is published under.
pub const REPOSITORY: &str = "pfeiffermax/python-poetry";

/// Default registry host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Fully qualified, tagged reference of a published python-poetry image.
///
/// Rendering is a pure function of the five fields; no validation is done.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    /// Registry host, optionally with port.
    pub registry: String,
    /// Image version (usually the git tag).
    pub version: String,
    /// Poetry version baked into the image.
    pub poetry_version: String,
    /// Python version of the base image.
    pub python_version: String,
    /// OS variant of the base image (e.g. `slim-bookworm`).
    pub os_variant: String,
}

impl ImageReference {
    /// Create a reference from its parts.
    pub fn new(
        registry: impl Into<String>,
        version: impl Into<String>,
        poetry_version: impl Into<String>,
        python_version: impl Into<String>,
        os_variant: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            version: version.into(),
            poetry_version: poetry_version.into(),
            python_version: python_version.into(),
            os_variant: os_variant.into(),
        }
    }

    /// The tag part, without registry and repository.
    #[must_use]
    pub fn tag(&self) -> String {
        format!(
            "{}-poetry{}-python{}-{}",
            self.version, self.poetry_version, self.python_version, self.os_variant
        )
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, REPOSITORY, self.tag())
    }
}

/// Compose the image reference string.
///
/// ```
/// let reference = poetry_image::build_reference("docker.io", "1.2.3", "1.8.0", "3.12", "slim");
/// assert_eq!(reference, "docker.io/pfeiffermax/python-poetry:1.2.3-poetry1.8.0-python3.12-slim");
/// ```
#[must_use]
pub fn build_reference(
    registry: &str,
    version: &str,
    poetry_version: &str,
    python_version: &str,
    os_variant: &str,
) -> String {
    ImageReference::new(registry, version, poetry_version, python_version, os_variant).to_string()
}
