//! Files in the data repository, read and written as JSON documents.
//!
//! Every write carries the sha of the version it was computed from. A write
//! against a file that moved on since then fails with
//! [`StoreError::Conflict`]; nothing here retries.

pub mod github;
pub mod memory;
pub mod wrapper;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use github::GithubStore;
pub use memory::MemoryStore;
pub use wrapper::DataRepo;

/// A decoded file together with the blob sha it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored {
    pub data: Value,
    pub sha: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path} changed since it was read")]
    Conflict { path: String },
    #[error("{path} is too large for the contents API")]
    TooLarge { path: String },
    #[error("data repository answered {status} for {path}")]
    Status { path: String, status: i32 },
    #[error("transport error: {0}")]
    Http(#[from] minreq::Error),
    #[error("bad base64 in {path}: {source}")]
    Decode {
        path: String,
        source: base64::DecodeError,
    },
    #[error("bad json: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait DataStore: Send + Sync {
    /// Fetches the file at `path`, or `None` when it does not exist.
    fn read(&self, path: &str) -> Result<Option<Stored>, StoreError>;

    /// Replaces the file at `path`. `sha` must be the sha last read, or
    /// `None` when creating the file.
    fn write(
        &self,
        path: &str,
        data: &Value,
        sha: Option<&str>,
        message: &str,
    ) -> Result<(), StoreError>;
}

impl<T: DataStore + ?Sized> DataStore for Arc<T> {
    fn read(&self, path: &str) -> Result<Option<Stored>, StoreError> {
        (**self).read(path)
    }

    fn write(
        &self,
        path: &str,
        data: &Value,
        sha: Option<&str>,
        message: &str,
    ) -> Result<(), StoreError> {
        (**self).write(path, data, sha, message)
    }
}
