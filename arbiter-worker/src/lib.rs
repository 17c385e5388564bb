#![deny(clippy::all)]

mod config;
mod judger;
pub mod lang;
mod redis;
mod sandbox;
mod worker;
mod workspace;

pub use self::config::Config;

use self::judger::Judger;
use self::redis::RedisModule;
use self::sandbox::{DockerSandbox, Sandbox};
use self::worker::Worker;
use self::workspace::WorkspaceModule;

use arbiter_utils::container::{inject, Container};

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

/// Builds the long-lived clients once and installs them; everything the
/// pipeline needs afterwards is handed down as an `Arc`, never re-resolved
/// mid-run.
pub fn init(config: Config) -> Result<()> {
    let redis_module = Arc::new(RedisModule::new(&config)?);
    let docker_sandbox = Arc::new(DockerSandbox::new()?);
    let workspace_module = Arc::new(WorkspaceModule::new(&config)?);

    let mut container = Container::new();
    container.register(Arc::new(config));
    container.register(redis_module);
    container.register(docker_sandbox);
    container.register(workspace_module);
    container.install_global();
    Ok(())
}

pub async fn run() -> Result<()> {
    let config = inject::<Config>();
    let redis = inject::<RedisModule>();
    let docker = inject::<DockerSandbox>();
    let workspaces = inject::<WorkspaceModule>();

    // Fail loudly on a misconfigured host before entering the serve loop.
    redis.ping().await.context("redis is unreachable")?;
    docker.ping().await.context("the docker daemon is unreachable")?;
    info!("connected to redis and docker");

    let sandbox: Arc<dyn Sandbox> = docker;
    let judger = Judger::new(&config, sandbox, workspaces);
    let worker = Worker::new(config, redis, judger);
    worker.main_loop().await
}
