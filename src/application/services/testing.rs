//! In-memory collaborators for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::errors::FetchError;
use crate::domain::traits::{Fetcher, Host};

/// Serves canned bodies; unknown URLs answer 404
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, body: &[u8]) -> Self {
        self.set(url, body);
        self
    }

    pub fn failing(self, url: &str, error: FetchError) -> Self {
        self.responses.lock().unwrap().insert(url.to_string(), Err(error));
        self
    }

    pub fn set(&self, url: &str, body: &[u8]) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(body.to_vec()));
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

/// Counts restart requests
#[derive(Default)]
pub struct RecordingHost {
    restarts: AtomicUsize,
}

impl RecordingHost {
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

impl Host for RecordingHost {
    fn request_restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}
