//! Build context resolution.

use std::path::PathBuf;

/// Directory holding the `Dockerfile`, relative to this crate's manifest.
const CONTEXT_DIR: &str = "build";

/// Absolute path of the directory containing the image's build definition.
///
/// The directory ships next to this crate's sources. Falls back to the
/// joined path when it cannot be canonicalized.
#[must_use]
pub fn resolve_context() -> PathBuf {
    let context = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(CONTEXT_DIR);
    context.canonicalize().unwrap_or(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_absolute() {
        assert!(resolve_context().is_absolute());
    }

    #[test]
    fn context_contains_dockerfile() {
        let dockerfile = resolve_context().join("Dockerfile");
        let content = std::fs::read_to_string(dockerfile).unwrap();
        assert!(content.contains("AS production-image"));
        assert!(content.contains("ARG OFFICIAL_PYTHON_IMAGE"));
        assert!(content.contains("ARG POETRY_VERSION"));
    }
}
