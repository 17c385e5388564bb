//! The boundary to the container runtime. One call runs one command inside
//! an isolated container with the workspace mounted, a memory ceiling, no
//! network, and a wall-clock deadline; the container is removed on every
//! path, timeout included.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Path the workspace is mounted at inside every container. Run commands
/// redirect stdin from `MOUNT_POINT/input_<i>.txt`.
pub const MOUNT_POINT: &str = "/app";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    /// Compile step only: artifacts are written back into the workspace.
    ReadWrite,
    /// Every test run: the solution must not touch inputs or escape.
    ReadOnly,
}

impl MountMode {
    fn as_str(self) -> &'static str {
        match self {
            MountMode::ReadWrite => "rw",
            MountMode::ReadOnly => "ro",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SandboxLimits {
    pub memory_bytes: u64,
    pub wall_clock: Duration,
}

/// Outcome of one sandboxed command. `timed_out` distinguishes "the process
/// was still running at the deadline" from "the process ran and failed";
/// it is never set together with a zero exit code.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Runs `command` through `/bin/sh -c` inside `image` with the workspace
    /// mounted at [`MOUNT_POINT`]. Network access is always disabled. An
    /// `Err` means the runtime itself failed, which is distinct from both a
    /// non-zero exit and a timeout.
    async fn run(
        &self,
        image: &str,
        command: &str,
        workspace: &Path,
        mount: MountMode,
        limits: &SandboxLimits,
    ) -> Result<ExecutionResult>;
}

pub struct DockerSandbox {
    docker: Docker,
}

impl DockerSandbox {
    pub fn new() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context("failed to connect to the docker daemon")?;
        Ok(Self { docker })
    }

    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.context("docker ping failed")?;
        Ok(())
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        debug!(%image, "pulling sandbox image");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress.with_context(|| format!("failed to pull image: {}", image))?;
        }
        Ok(())
    }

    async fn collect_logs(&self, name: &str) -> Result<(String, String)> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            ..Default::default()
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut stream = self.docker.logs(name, Some(options));
        while let Some(chunk) = stream.next().await {
            match chunk.context("failed to read container logs")? {
                LogOutput::StdOut { message } => stdout.push_str(&String::from_utf8_lossy(&message)),
                LogOutput::StdErr { message } => stderr.push_str(&String::from_utf8_lossy(&message)),
                _ => {}
            }
        }
        Ok((stdout, stderr))
    }

    async fn remove(&self, name: &str) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(err) = self.docker.remove_container(name, Some(options)).await {
            warn!(%err, container = %name, "failed to remove sandbox container");
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn run(
        &self,
        image: &str,
        command: &str,
        workspace: &Path,
        mount: MountMode,
        limits: &SandboxLimits,
    ) -> Result<ExecutionResult> {
        self.ensure_image(image).await?;

        let name = format!("arbiter-{}", Uuid::new_v4());
        let bind = format!("{}:{}:{}", workspace.display(), MOUNT_POINT, mount.as_str());

        let config = Config {
            image: Some(image.to_owned()),
            cmd: Some(vec![
                "/bin/sh".to_owned(),
                "-c".to_owned(),
                command.to_owned(),
            ]),
            working_dir: Some(MOUNT_POINT.to_owned()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            network_disabled: Some(true),
            host_config: Some(HostConfig {
                memory: Some(limits.memory_bytes as i64),
                binds: Some(vec![bind]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };
        self.docker
            .create_container(Some(options), config)
            .await
            .context("failed to create sandbox container")?;

        let t0 = Instant::now();
        if let Err(err) = self
            .docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await
        {
            self.remove(&name).await;
            return Err(err).context("failed to start sandbox container");
        }

        let wait_options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut wait_stream = self.docker.wait_container(&name, Some(wait_options));

        let exit_code = match tokio::time::timeout(limits.wall_clock, wait_stream.next()).await {
            // Deadline passed while the process was still running: force
            // teardown and report the typed timeout signal instead of an
            // error, so the caller can tell "over the limit" apart from
            // "runtime unreachable".
            Err(_) => {
                let elapsed = t0.elapsed();
                let _ = self
                    .docker
                    .kill_container(&name, None::<KillContainerOptions<String>>)
                    .await;
                self.remove(&name).await;
                return Ok(ExecutionResult {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: String::new(),
                    elapsed,
                    timed_out: true,
                });
            }
            Ok(Some(Ok(body))) => body.status_code,
            // bollard surfaces a non-zero exit as a wait "error"; it is a
            // normal completion for us.
            Ok(Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. }))) => code,
            Ok(Some(Err(err))) => {
                self.remove(&name).await;
                return Err(err).context("failed while waiting for sandbox container");
            }
            Ok(None) => {
                self.remove(&name).await;
                anyhow::bail!("sandbox wait stream ended without a status");
            }
        };
        let elapsed = t0.elapsed();

        let logs = self.collect_logs(&name).await;
        self.remove(&name).await;
        let (stdout, stderr) = logs?;

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
            elapsed,
            timed_out: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_modes_map_to_docker_bind_flags() {
        assert_eq!(MountMode::ReadWrite.as_str(), "rw");
        assert_eq!(MountMode::ReadOnly.as_str(), "ro");
    }

    #[test]
    fn success_requires_zero_exit_and_no_timeout() {
        let mut result = ExecutionResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(5),
            timed_out: false,
        };
        assert!(result.is_success());

        result.exit_code = 1;
        assert!(!result.is_success());

        result.exit_code = -1;
        result.timed_out = true;
        assert!(!result.is_success());
    }
}
