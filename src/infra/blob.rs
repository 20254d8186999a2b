//! Blob-store interface and its S3 implementation.
//!
//! Requests are signed with AWS Signature Version 4 directly; the wire path
//! is percent-encoded the same way as the canonical URI so signatures hold
//! for keys containing `:` and other reserved characters.

use crate::domain::BlobError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Narrow interface to the blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Store an object with public-read visibility.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), BlobError>;
}

/// S3 client over plain HTTP with SigV4 request signing.
pub struct S3Client {
    http: reqwest::Client,
    bucket: String,
    region: String,
    access_id: String,
    secret_key: String,
    endpoint: String,
}

impl S3Client {
    pub fn new(bucket: &str, region: &str, access_id: &str, secret_key: &str) -> Self {
        let endpoint = if region == "us-east-1" {
            format!("https://{bucket}.s3.amazonaws.com")
        } else {
            format!("https://{bucket}.s3.{region}.amazonaws.com")
        };
        Self {
            http: reqwest::Client::new(),
            bucket: bucket.to_string(),
            region: region.to_string(),
            access_id: access_id.to_string(),
            secret_key: secret_key.to_string(),
            endpoint,
        }
    }

    /// Point the client at an S3-compatible endpoint (tests, MinIO).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    fn host(&self) -> String {
        self.endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string()
    }

    async fn send(
        &self,
        method: reqwest::Method,
        key: &str,
        body: Vec<u8>,
        extra_headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, BlobError> {
        let canonical_path = format!("/{}", uri_encode_path(key));
        let url = format!("{}{}", self.endpoint, canonical_path);
        let now = Utc::now();
        let payload_hash = hex::encode(Sha256::digest(&body));

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), self.host()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date(&now)),
        ];
        for (name, value) in extra_headers {
            headers.push((name.to_string(), value.to_string()));
        }

        let authorization = sign_request(
            &SigningInput {
                method: method.as_str(),
                canonical_path: &canonical_path,
                headers: &headers,
                payload_hash: &payload_hash,
                region: &self.region,
                access_id: &self.access_id,
                secret_key: &self.secret_key,
            },
            &now,
        );

        let mut request = self.http.request(method, &url);
        for (name, value) in &headers {
            if name != "host" {
                request = request.header(name, value);
            }
        }
        request = request.header("Authorization", authorization);
        if !body.is_empty() {
            request = request.body(body);
        }

        request
            .send()
            .await
            .map_err(|e| BlobError::Transport(e.into()))
    }
}

#[async_trait]
impl BlobStore for S3Client {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let response = self.send(reqwest::Method::GET, key, Vec::new(), &[]).await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BlobError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BlobError::Transport(e.into()))?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), BlobError> {
        let response = self
            .send(
                reqwest::Method::PUT,
                key,
                body,
                &[("content-type", content_type), ("x-amz-acl", "public-read")],
            )
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BlobError::Api {
                status: status.as_u16(),
                message,
            });
        }
        log::info!("uploaded {key} to bucket {}", self.bucket);
        Ok(())
    }
}

struct SigningInput<'a> {
    method: &'a str,
    canonical_path: &'a str,
    headers: &'a [(String, String)],
    payload_hash: &'a str,
    region: &'a str,
    access_id: &'a str,
    secret_key: &'a str,
}

fn sign_request(input: &SigningInput<'_>, now: &DateTime<Utc>) -> String {
    let mut sorted: Vec<&(String, String)> = input.headers.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = sorted
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers: String = sorted
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        input.method, input.canonical_path, canonical_headers, signed_headers, input.payload_hash
    );

    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{}/s3/aws4_request", input.region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{scope}\n{}",
        amz_date(now),
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let date_key = hmac(format!("AWS4{}", input.secret_key).as_bytes(), date.as_bytes());
    let region_key = hmac(&date_key, input.region.as_bytes());
    let service_key = hmac(&region_key, b"s3");
    let signing_key = hmac(&service_key, b"aws4_request");
    let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes()));

    format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        input.access_id
    )
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn amz_date(now: &DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Percent-encode an object key for the canonical URI, keeping `/` as a
/// segment separator and the SigV4 unreserved set verbatim.
fn uri_encode_path(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
