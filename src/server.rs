//! HTTP surface: webhook intake plus the two check-resolution routes.
//!
//! `tiny_http` accepts connections on the calling thread; each request is
//! dispatched onto the tokio runtime so many commit pipelines can be in
//! flight at once while every pipeline itself runs as one sequential task.

use crate::application::pipeline::{
    CompleteCheckOutcome, Pipeline, PullRequestEvent, RerunPlan,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::io::Read;
use std::sync::Arc;
use tiny_http::{Method, Request, Response};

/// Serve forever on `addr`. Never returns under normal operation.
pub fn run(
    addr: &str,
    pipeline: Arc<Pipeline>,
    webhook_secret: Option<String>,
    handle: tokio::runtime::Handle,
) -> std::io::Result<()> {
    let server = tiny_http::Server::http(addr)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    log::info!("listening on http://{addr}");

    for request in server.incoming_requests() {
        let pipeline = pipeline.clone();
        let secret = webhook_secret.clone();
        handle.spawn(async move {
            let url = request.url().to_string();
            if let Err(e) = handle_request(request, pipeline, secret).await {
                log::error!("request {url} failed: {e}");
            }
        });
    }

    Ok(())
}

async fn handle_request(
    request: Request,
    pipeline: Arc<Pipeline>,
    webhook_secret: Option<String>,
) -> std::io::Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/").to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let method = request.method().clone();

    match (&method, segments.as_slice()) {
        (&Method::Post, ["webhook"]) => handle_webhook(request, pipeline, webhook_secret).await,

        (&Method::Get, ["pixophilic", "complete_check", sha]) => {
            let sha = sha.to_string();
            let message = match pipeline.complete_check(&sha).await {
                Ok(CompleteCheckOutcome::Resolved) => "Resolved. Check should be green.",
                Ok(CompleteCheckOutcome::AlreadyResolved) => "Already resolved.",
                Ok(CompleteCheckOutcome::NotComplete) => {
                    "Check has not completed yet. Wait for it."
                }
                Ok(CompleteCheckOutcome::UnknownCommit) => "Cannot find commit",
                Err(e) => {
                    log::error!("complete_check for {sha} failed: {e}");
                    return request.respond(Response::from_string("error").with_status_code(500));
                }
            };
            request.respond(Response::from_string(message))
        }

        (&Method::Get, ["pixophilic", "test_run_complete", sha]) => {
            let sha = sha.to_string();
            match pipeline.plan_rerun(&sha).await {
                Ok(RerunPlan::Run(context)) => {
                    request.respond(Response::from_string("Running diff"))?;
                    if let Err(e) = pipeline.run_rerun(&context).await {
                        log::error!("rerun for {sha} failed: {e}");
                    }
                    Ok(())
                }
                Ok(RerunPlan::Stale) => request.respond(Response::from_string(
                    "Commit no longer head, not running diff",
                )),
                Ok(RerunPlan::CheckNotInProgress) => request.respond(Response::from_string(
                    "Check already completed, not running diff",
                )),
                Ok(RerunPlan::UnknownCommit) => {
                    request.respond(Response::from_string("Cannot find commit"))
                }
                Err(e) => {
                    log::error!("test_run_complete for {sha} failed: {e}");
                    request.respond(Response::from_string("error").with_status_code(500))
                }
            }
        }

        _ => request.respond(Response::from_string("Not found").with_status_code(404)),
    }
}

async fn handle_webhook(
    mut request: Request,
    pipeline: Arc<Pipeline>,
    webhook_secret: Option<String>,
) -> std::io::Result<()> {
    let event_name = header(&request, "X-GitHub-Event");
    let signature = header(&request, "X-Hub-Signature-256");

    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;

    if let Some(secret) = &webhook_secret {
        if !verify_signature(secret, &body, signature.as_deref()) {
            log::warn!("webhook delivery rejected: bad signature");
            return request
                .respond(Response::from_string("invalid signature").with_status_code(401));
        }
    }

    if event_name.as_deref() != Some("pull_request") {
        return request.respond(Response::from_string("ignored"));
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("webhook delivery rejected: {e}");
            return request.respond(Response::from_string("bad payload").with_status_code(400));
        }
    };

    let event = payload.into_event();
    if !event.qualifies() {
        log::debug!("ignoring pull_request action {}", event.action);
        return request.respond(Response::from_string("ignored"));
    }

    // Acknowledge the delivery before the pipeline runs; the check run is
    // the real reporting channel.
    request.respond(Response::from_string("ok"))?;

    if let Err(e) = pipeline.handle_pull_request_event(&event).await {
        log::error!(
            "pipeline for {} aborted: {e}",
            event.head_sha
        );
    }
    Ok(())
}

fn header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

/// Check a `sha256=<hex>` delivery signature against the shared secret.
fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature.and_then(|s| s.strip_prefix("sha256=")) else {
        return false;
    };
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Deserialize)]
struct WebhookPayload {
    action: String,
    pull_request: WebhookPull,
    repository: WebhookRepository,
    installation: Option<WebhookInstallation>,
}

#[derive(Deserialize)]
struct WebhookPull {
    number: u64,
    head: WebhookRef,
    base: WebhookRef,
}

#[derive(Deserialize)]
struct WebhookRef {
    sha: String,
}

#[derive(Deserialize)]
struct WebhookRepository {
    name: String,
    owner: WebhookOwner,
}

#[derive(Deserialize)]
struct WebhookOwner {
    login: String,
}

#[derive(Deserialize)]
struct WebhookInstallation {
    id: u64,
}

impl WebhookPayload {
    fn into_event(self) -> PullRequestEvent {
        PullRequestEvent {
            action: self.action,
            number: self.pull_request.number,
            owner: self.repository.owner.login,
            repo: self.repository.name,
            head_sha: self.pull_request.head.sha,
            base_sha: self.pull_request.base.sha,
            installation_id: self.installation.map(|i| i.id),
        }
    }
}
