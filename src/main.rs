//! Main entry point for the Pixophilic bot.
//! Builds the collaborator clients once, wires the pipeline, and serves HTTP.

use anyhow::Context;
use pixophilic::application::pipeline::{Pipeline, PipelineSettings};
use pixophilic::infra::blob::S3Client;
use pixophilic::infra::config::AppConfig;
use pixophilic::infra::github::GitHubClient;
use pixophilic::infra::store::RedisStore;
use pixophilic::server;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env().context("load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    let github = Arc::new(GitHubClient::new(
        &config.github_api_url,
        &config.github_token,
        &config.host_url,
    ));
    let blob = Arc::new(S3Client::new(
        &config.s3_bucket,
        &config.s3_region,
        &config.s3_access_id,
        &config.s3_secret_access_key,
    ));
    let store = Arc::new(RedisStore::from_url(&config.redis_url).context("parse REDIS_URL")?);

    let pipeline = Arc::new(Pipeline::new(
        github,
        blob,
        store,
        PipelineSettings::new(
            &config.snapshot_root,
            &config.lock_file_path,
            &config.s3_bucket,
        ),
    ));

    let addr = format!("0.0.0.0:{}", config.port);
    server::run(
        &addr,
        pipeline,
        config.webhook_secret.clone(),
        runtime.handle().clone(),
    )
    .context("http server")?;

    Ok(())
}
