//! Scoped ownership of a builder instance.

use poetry_image_common::PublishResult;

use crate::toolchain::{BuilderHandle, BuilderOptions, Toolchain};

/// Owns a provisioned builder instance and tears it down on drop.
///
/// Teardown stops and then removes the instance. Failures are logged and
/// swallowed so they never replace the outcome of the build itself.
pub struct BuilderGuard<'a> {
    toolchain: &'a dyn Toolchain,
    handle: BuilderHandle,
}

impl<'a> BuilderGuard<'a> {
    /// Provision a builder instance.
    ///
    /// Nothing needs releasing if provisioning fails.
    pub fn provision(toolchain: &'a dyn Toolchain, options: &BuilderOptions) -> PublishResult<Self> {
        let handle = toolchain.create_builder(options)?;
        tracing::info!(builder = %handle.name, driver = %options.driver, "Provisioned builder");
        Ok(Self { toolchain, handle })
    }

    /// Instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.handle.name
    }
}

impl Drop for BuilderGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.toolchain.stop_builder(&self.handle) {
            tracing::warn!(builder = %self.handle.name, error = %e, "Failed to stop builder");
        }
        match self.toolchain.remove_builder(&self.handle) {
            Ok(()) => tracing::info!(builder = %self.handle.name, "Removed builder"),
            Err(e) => {
                tracing::warn!(builder = %self.handle.name, error = %e, "Failed to remove builder");
            }
        }
    }
}
