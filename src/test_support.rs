use crate::manifest_client::{FetchError, ManifestSource};
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory site: paths map to a body or an HTTP status.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Result<String, u16>>,
    requests: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn with(mut self, path: &str, body: &str) -> Self {
        self.files.insert(path.to_string(), Ok(body.to_string()));
        self
    }

    pub fn failing(mut self, path: &str, status: u16) -> Self {
        self.files.insert(path.to_string(), Err(status));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ManifestSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(path.to_string());
        match self.files.get(path) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err(status)) => Err(FetchError::Status(*status)),
            None => Err(FetchError::Status(404)),
        }
    }
}
