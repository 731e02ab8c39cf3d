//! Command-line interface.
//!
//! Every option can also be supplied through an environment variable; an
//! explicit flag wins over the environment.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result};

use crate::config::{CacheBackend, PublishConfig, RegistryCredentials};
use crate::publish::publish;
use crate::reference::DEFAULT_REGISTRY;
use crate::toolchain::DockerCli;

/// Build the multi-arch python-poetry image and push it to a registry
#[derive(Parser, Debug)]
#[command(name = "poetry-image")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Docker Hub username
    #[arg(long, env = "DOCKER_HUB_USERNAME", requires = "docker_hub_password")]
    pub docker_hub_username: Option<String>,

    /// Docker Hub password
    #[arg(
        long,
        env = "DOCKER_HUB_PASSWORD",
        hide_env_values = true,
        requires = "docker_hub_username"
    )]
    pub docker_hub_password: Option<String>,

    /// Version tag
    #[arg(long, env = "GIT_TAG_NAME")]
    pub version_tag: String,

    /// Python version
    #[arg(long, env = "PYTHON_VERSION")]
    pub python_version: String,

    /// Operating system variant
    #[arg(long, env = "OS_VARIANT")]
    pub os_variant: String,

    /// Poetry version
    #[arg(long, env = "POETRY_VERSION")]
    pub poetry_version: String,

    /// Docker registry
    #[arg(long, env = "REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: String,

    /// Use local cache storage backend for docker builds
    #[arg(
        long,
        env = "USE_LOCAL_CACHE_STORAGE_BACKEND",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub use_local_cache_storage_backend: bool,

    /// Build context directory (defaults to the bundled build definition)
    #[arg(long, env = "BUILD_CONTEXT")]
    pub context: Option<PathBuf>,

    /// Docker binary to invoke
    #[arg(long = "docker", env = "DOCKER_BINARY", default_value = "docker")]
    pub docker: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Freeze the parsed options into a publish configuration.
    ///
    /// Username and password are either both present or both absent.
    #[must_use]
    pub fn to_config(&self) -> PublishConfig {
        let credentials = match (&self.docker_hub_username, &self.docker_hub_password) {
            (Some(username), Some(password)) => Some(RegistryCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        PublishConfig {
            registry: self.registry.clone(),
            credentials,
            version_tag: self.version_tag.clone(),
            python_version: self.python_version.clone(),
            os_variant: self.os_variant.clone(),
            poetry_version: self.poetry_version.clone(),
            cache: if self.use_local_cache_storage_backend {
                CacheBackend::Local
            } else {
                CacheBackend::GithubActions
            },
            context: self.context.clone(),
        }
    }

    /// Run the publish flow against the docker CLI.
    pub fn execute(self) -> Result<()> {
        let config = self.to_config();
        let docker = DockerCli::new(&self.docker);

        let published = publish(&config, &docker).map_err(|e| {
            if e.is_authentication() {
                let registry = &config.registry;
                Report::new(e).wrap_err(format!("Registry authentication against {registry} failed"))
            } else {
                Report::new(e)
            }
        })?;

        println!("Pushed {}", published.reference);
        if let Some(digest) = &published.digest {
            println!("Digest: {digest}");
        }
        Ok(())
    }
}
