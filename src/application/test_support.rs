//! In-memory fakes for the collaborator traits, shared by the application
//! layer's tests.

use crate::domain::{BlobError, CheckRequest, CheckRun, CommitRecord, HostError, StoreError};
use crate::infra::blob::BlobStore;
use crate::infra::github::{GitHubHost, PullFile, PullRequestInfo};
use crate::infra::store::CommitStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory GitHub host recording every check-run mutation.
pub struct FakeHost {
    pub created: Mutex<Vec<CheckRequest>>,
    pub updated: Mutex<Vec<(u64, CheckRequest)>>,
    /// Every mutation in call order, regardless of create vs update.
    sequence: Mutex<Vec<CheckRequest>>,
    next_id: AtomicU64,
    file_contents: Mutex<HashMap<(String, String), String>>,
    pull_file_pages: Mutex<Vec<Vec<String>>>,
    pulls: Mutex<HashMap<u64, PullRequestInfo>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            sequence: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            file_contents: Mutex::new(HashMap::new()),
            pull_file_pages: Mutex::new(Vec::new()),
            pulls: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_file(&self, path: &str, git_ref: &str, content: &str) {
        self.file_contents
            .lock()
            .unwrap()
            .insert((path.to_string(), git_ref.to_string()), content.to_string());
    }

    /// Changed-file listing, one inner vec per page.
    pub fn set_pull_file_pages(&self, pages: Vec<Vec<&str>>) {
        *self.pull_file_pages.lock().unwrap() = pages
            .into_iter()
            .map(|page| page.into_iter().map(str::to_string).collect())
            .collect();
    }

    pub fn set_pull(&self, info: PullRequestInfo) {
        self.pulls.lock().unwrap().insert(info.number, info);
    }

    /// The most recent check-run request, created or updated.
    pub fn last_check(&self) -> Option<CheckRequest> {
        self.sequence.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GitHubHost for FakeHost {
    async fn file_content(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, HostError> {
        self.file_contents
            .lock()
            .unwrap()
            .get(&(path.to_string(), git_ref.to_string()))
            .cloned()
            .ok_or(HostError::NotFound)
    }

    async fn pull_files(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        page: u32,
        _per_page: u32,
    ) -> Result<Vec<PullFile>, HostError> {
        let pages = self.pull_file_pages.lock().unwrap();
        Ok(pages
            .get(page.saturating_sub(1) as usize)
            .map(|page| {
                page.iter()
                    .map(|filename| PullFile {
                        filename: filename.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_check(&self, request: &CheckRequest) -> Result<CheckRun, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(request.clone());
        self.sequence.lock().unwrap().push(request.clone());
        Ok(CheckRun {
            id,
            status: request.status,
            conclusion: request.conclusion,
        })
    }

    async fn update_check(
        &self,
        check_run_id: u64,
        request: &CheckRequest,
    ) -> Result<CheckRun, HostError> {
        self.updated
            .lock()
            .unwrap()
            .push((check_run_id, request.clone()));
        self.sequence.lock().unwrap().push(request.clone());
        Ok(CheckRun {
            id: check_run_id,
            status: request.status,
            conclusion: request.conclusion,
        })
    }

    async fn pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, HostError> {
        self.pulls
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or(HostError::NotFound)
    }
}

/// In-memory commit/pull-ref store with hash-merge semantics.
pub struct FakeStore {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    pulls: Mutex<HashMap<String, u64>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hashes: Mutex::new(HashMap::new()),
            pulls: Mutex::new(HashMap::new()),
        })
    }

    pub fn record(&self, sha: &str) -> Option<CommitRecord> {
        self.hashes
            .lock()
            .unwrap()
            .get(sha)
            .and_then(CommitRecord::from_hash)
    }
}

#[async_trait]
impl CommitStore for FakeStore {
    async fn merge_commit_record(
        &self,
        sha: &str,
        fields: &[(String, String)],
    ) -> Result<(), StoreError> {
        let mut hashes = self.hashes.lock().unwrap();
        let record = hashes.entry(sha.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn commit_record(&self, sha: &str) -> Result<Option<CommitRecord>, StoreError> {
        Ok(self.record(sha))
    }

    async fn set_pull_ref(&self, sha: &str, number: u64) -> Result<(), StoreError> {
        self.pulls.lock().unwrap().insert(sha.to_string(), number);
        Ok(())
    }

    async fn pull_ref(&self, sha: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.pulls.lock().unwrap().get(sha).copied())
    }
}

/// In-memory blob store.
pub struct FakeBlob {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub put_keys: Mutex<Vec<String>>,
}

impl FakeBlob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
            put_keys: Mutex::new(Vec::new()),
        })
    }

    pub fn with(entries: Vec<(&str, Vec<u8>)>) -> Arc<Self> {
        let blob = Self::new();
        {
            let mut objects = blob.objects.lock().unwrap();
            for (key, value) in entries {
                objects.insert(key.to_string(), value);
            }
        }
        blob
    }
}

#[async_trait]
impl BlobStore for FakeBlob {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or(BlobError::NotFound)
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), BlobError> {
        self.put_keys.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }
}
