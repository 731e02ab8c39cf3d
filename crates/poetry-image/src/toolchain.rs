//! Container toolchain abstraction and the docker CLI adapter.
//!
//! The publish flow only needs five capabilities from the toolchain:
//! provisioning and tearing down a buildx builder instance, logging in to a
//! registry, and running a multi-platform build that pushes its result.
//! [`Toolchain`] captures exactly that, so tests can swap in a fake.

use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use poetry_image_common::{PublishError, PublishResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::RegistryCredentials;

/// Lines of build stderr kept for the error message.
const STDERR_TAIL_LINES: usize = 20;

/// Options for provisioning a builder instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Instance name.
    pub name: String,
    /// Buildx driver.
    pub driver: String,
    /// Driver options (`KEY=VALUE`).
    pub driver_options: Vec<(String, String)>,
}

impl BuilderOptions {
    /// A uniquely named `docker-container` builder on the host network.
    ///
    /// Host networking lets the build push to a registry on the host's
    /// loopback interface.
    #[must_use]
    pub fn multi_platform() -> Self {
        Self {
            name: format!("poetry-image-{}", Uuid::new_v4().simple()),
            driver: "docker-container".to_string(),
            driver_options: vec![("network".to_string(), "host".to_string())],
        }
    }
}

/// A provisioned builder instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderHandle {
    /// Instance name as reported by the toolchain.
    pub name: String,
}

/// A multi-platform build-and-push invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context directory.
    pub context: PathBuf,
    /// Stage to build.
    pub target: String,
    /// Build arguments.
    pub build_args: Vec<(String, String)>,
    /// Tags applied to the result.
    pub tags: Vec<String>,
    /// Target platforms.
    pub platforms: Vec<String>,
    /// Builder instance to run on.
    pub builder: String,
    /// `--cache-from` value.
    pub cache_from: String,
    /// `--cache-to` value.
    pub cache_to: String,
    /// Push the result on success.
    pub push: bool,
}

/// Result of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Digest of the pushed manifest list, when the toolchain reported it.
    pub digest: Option<String>,
}

/// Capabilities the publish flow needs from a container toolchain.
pub trait Toolchain {
    /// Provision a builder instance.
    fn create_builder(&self, options: &BuilderOptions) -> PublishResult<BuilderHandle>;

    /// Authenticate against a registry.
    fn login(&self, registry: &str, credentials: &RegistryCredentials) -> PublishResult<()>;

    /// Build for all requested platforms and push.
    fn build_and_push(&self, request: &BuildRequest) -> PublishResult<BuildOutcome>;

    /// Stop a builder instance.
    fn stop_builder(&self, builder: &BuilderHandle) -> PublishResult<()>;

    /// Remove a stopped builder instance.
    fn remove_builder(&self, builder: &BuilderHandle) -> PublishResult<()>;
}

/// Shape of the file written by `docker buildx build --metadata-file`.
#[derive(Debug, Deserialize)]
struct BuildMetadata {
    #[serde(rename = "containerimage.digest")]
    digest: Option<String>,
}

/// Finished toolchain process.
#[derive(Debug)]
struct Invocation {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl Invocation {
    /// Toolchain stderr, or the exit status when it printed nothing.
    fn failure_message(&self, command: &str) -> String {
        if self.stderr.is_empty() {
            format!("{command} failed with {}", self.status)
        } else {
            self.stderr.clone()
        }
    }
}

/// [`Toolchain`] backed by the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
}

impl DockerCli {
    /// Use the given docker binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> PublishError {
        PublishError::Toolchain {
            program: self.program.display().to_string(),
            source,
        }
    }

    /// Run to completion with captured output, feeding `input` on stdin.
    fn run(&self, args: &[String], input: Option<&str>) -> PublishResult<Invocation> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            // The process may exit before reading; its status tells the story.
            match stdin.write_all(input.as_bytes()) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let output = child.wait_with_output()?;
        Ok(Invocation {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run with stdout inherited and stderr echoed, keeping its tail.
    fn run_streaming(&self, args: &[String]) -> PublishResult<Invocation> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let read = child
            .stderr
            .take()
            .map_or(Ok(()), |stderr| echo_lines(BufReader::new(stderr), &mut tail));

        // Reap the child even when reading its stderr failed.
        let status = child.wait()?;
        read?;
        Ok(Invocation {
            status,
            stdout: String::new(),
            stderr: Vec::from(tail).join("\n").trim().to_string(),
        })
    }
}

/// Echo each line to our stderr, keeping the last [`STDERR_TAIL_LINES`].
fn echo_lines(reader: impl BufRead, tail: &mut VecDeque<String>) -> std::io::Result<()> {
    for line in reader.split(b'\n') {
        let line = String::from_utf8_lossy(&line?).trim_end().to_string();
        eprintln!("{line}");
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Ok(())
}

impl Toolchain for DockerCli {
    fn create_builder(&self, options: &BuilderOptions) -> PublishResult<BuilderHandle> {
        let args = create_builder_args(options);
        tracing::debug!(?args, "Creating builder");

        let invocation = self.run(&args, None)?;
        if !invocation.status.success() {
            return Err(PublishError::BuilderCreate {
                message: invocation.failure_message("docker buildx create"),
            });
        }

        let name = if invocation.stdout.is_empty() {
            options.name.clone()
        } else {
            invocation.stdout
        };
        Ok(BuilderHandle { name })
    }

    fn login(&self, registry: &str, credentials: &RegistryCredentials) -> PublishResult<()> {
        let args = login_args(registry, &credentials.username);
        tracing::debug!(?args, "Logging in");

        let invocation = self.run(&args, Some(&credentials.password))?;
        if invocation.status.success() {
            Ok(())
        } else {
            Err(PublishError::Authentication {
                registry: registry.to_string(),
                message: invocation.failure_message("docker login"),
            })
        }
    }

    fn build_and_push(&self, request: &BuildRequest) -> PublishResult<BuildOutcome> {
        let metadata = tempfile::Builder::new()
            .prefix("poetry-image-metadata-")
            .suffix(".json")
            .tempfile()?;
        let args = build_args(request, Some(metadata.path()));
        tracing::debug!(?args, "Running build");

        let invocation = self.run_streaming(&args)?;
        if !invocation.status.success() {
            return Err(PublishError::Build {
                reference: request.tags.join(","),
                message: invocation.failure_message("docker buildx build"),
            });
        }

        let digest = match read_metadata(metadata.path()) {
            Ok(digest) => digest,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read build metadata");
                None
            }
        };
        Ok(BuildOutcome { digest })
    }

    fn stop_builder(&self, builder: &BuilderHandle) -> PublishResult<()> {
        self.builder_command("stop", builder)
    }

    fn remove_builder(&self, builder: &BuilderHandle) -> PublishResult<()> {
        self.builder_command("rm", builder)
    }
}

impl DockerCli {
    fn builder_command(&self, action: &str, builder: &BuilderHandle) -> PublishResult<()> {
        let args = vec![
            "buildx".to_string(),
            action.to_string(),
            builder.name.clone(),
        ];
        let invocation = self.run(&args, None)?;
        if invocation.status.success() {
            Ok(())
        } else {
            Err(PublishError::Teardown {
                builder: builder.name.clone(),
                message: invocation.failure_message(&format!("docker buildx {action}")),
            })
        }
    }
}

/// Digest recorded in a buildx metadata file.
fn read_metadata(path: &Path) -> PublishResult<Option<String>> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let metadata: BuildMetadata = serde_json::from_str(&content)?;
    Ok(metadata.digest)
}

/// Arguments for `docker buildx create`.
#[must_use]
pub fn create_builder_args(options: &BuilderOptions) -> Vec<String> {
    let mut args = vec![
        "buildx".to_string(),
        "create".to_string(),
        "--name".to_string(),
        options.name.clone(),
        "--driver".to_string(),
        options.driver.clone(),
    ];
    for (key, value) in &options.driver_options {
        args.push("--driver-opt".to_string());
        args.push(format!("{key}={value}"));
    }
    args
}

/// Arguments for `docker login`; the password goes to stdin.
#[must_use]
pub fn login_args(registry: &str, username: &str) -> Vec<String> {
    vec![
        "login".to_string(),
        "--username".to_string(),
        username.to_string(),
        "--password-stdin".to_string(),
        registry.to_string(),
    ]
}

/// Arguments for `docker buildx build`.
#[must_use]
pub fn build_args(request: &BuildRequest, metadata_file: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "buildx".to_string(),
        "build".to_string(),
        "--builder".to_string(),
        request.builder.clone(),
        "--target".to_string(),
        request.target.clone(),
    ];
    for (key, value) in &request.build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{key}={value}"));
    }
    for tag in &request.tags {
        args.push("--tag".to_string());
        args.push(tag.clone());
    }
    args.push("--platform".to_string());
    args.push(request.platforms.join(","));
    args.push("--cache-from".to_string());
    args.push(request.cache_from.clone());
    args.push("--cache-to".to_string());
    args.push(request.cache_to.clone());
    if let Some(path) = metadata_file {
        args.push("--metadata-file".to_string());
        args.push(path.display().to_string());
    }
    if request.push {
        args.push("--push".to_string());
    }
    args.push(request.context.display().to_string());
    args
}
