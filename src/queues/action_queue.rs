//! Offline write queue for clients of this API.
//!
//! Actions are kept in a JSON file in FIFO order and replayed one at a time.
//! A failed replay bumps the head's attempt counter and pauses the queue
//! with the item still in place; once the head has failed
//! [`MAX_ATTEMPTS`] times the queue stops processing altogether.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::USER_AGENT;
use crate::data::new_id;

pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub id: String,
    pub endpoint: String,
    pub body: Value,
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue file: {0}")]
    Io(#[from] io::Error),
    #[error("queue file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("server answered {status}: {message}")]
    Rejected { status: i32, message: String },
    #[error("transport error: {0}")]
    Http(#[from] minreq::Error),
}

/// Sends one queued action to the server.
pub trait Dispatch {
    fn dispatch(&mut self, action: &QueuedAction) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Everything was delivered.
    Drained,
    /// The head failed this round and stays queued.
    Paused,
    /// The head has used up its attempts; nothing more is sent.
    Stalled,
}

pub struct ActionQueue {
    path: PathBuf,
    items: VecDeque<QueuedAction>,
}

impl ActionQueue {
    /// Loads the queue stored at `path`, starting empty when the file is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(ActionQueue { path, items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &QueuedAction> {
        self.items.iter()
    }

    pub fn is_stalled(&self) -> bool {
        self.items
            .front()
            .is_some_and(|head| head.attempts >= MAX_ATTEMPTS)
    }

    fn persist(&self) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.items)?)?;
        Ok(())
    }

    /// Appends an action and immediately tries to drain the queue.
    pub fn enqueue(
        &mut self,
        endpoint: &str,
        body: Value,
        dispatcher: &mut impl Dispatch,
    ) -> Result<Progress, QueueError> {
        let now = Utc::now();
        self.items.push_back(QueuedAction {
            id: new_id(now),
            endpoint: endpoint.to_string(),
            body,
            attempts: 0,
            queued_at: now,
        });
        self.persist()?;
        self.process(dispatcher)
    }

    /// Replays queued actions in order until one fails or none are left.
    /// Call this whenever connectivity comes back.
    pub fn process(&mut self, dispatcher: &mut impl Dispatch) -> Result<Progress, QueueError> {
        while let Some(head) = self.items.front_mut() {
            if head.attempts >= MAX_ATTEMPTS {
                return Ok(Progress::Stalled);
            }

            match dispatcher.dispatch(head) {
                Ok(()) => {
                    self.items.pop_front();
                    self.persist()?;
                }
                Err(e) => {
                    head.attempts += 1;
                    tracing::warn!(
                        endpoint = %head.endpoint,
                        attempts = head.attempts,
                        error = %e,
                        "queued action failed"
                    );
                    self.persist()?;
                    return Ok(Progress::Paused);
                }
            }
        }
        Ok(Progress::Drained)
    }
}

/// Replays actions as `POST {base_url}/api/{endpoint}` with the user's token.
pub struct HttpDispatcher {
    base_url: String,
    token: String,
}

impl HttpDispatcher {
    pub fn new(base_url: &str, token: &str) -> Self {
        HttpDispatcher {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn url(&self, action: &QueuedAction) -> String {
        format!(
            "{}/api/{}",
            self.base_url,
            action.endpoint.trim_start_matches('/')
        )
    }
}

impl Dispatch for HttpDispatcher {
    fn dispatch(&mut self, action: &QueuedAction) -> Result<(), DispatchError> {
        let response = minreq::post(self.url(action))
            .with_header("Authorization", format!("Bearer {}", self.token))
            .with_header("Content-Type", "application/json")
            .with_header("User-Agent", USER_AGENT)
            .with_body(action.body.to_string())
            .send()?;

        if (200..300).contains(&response.status_code) {
            return Ok(());
        }

        let message = serde_json::from_slice::<Value>(response.as_bytes())
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or_default();
        Err(DispatchError::Rejected {
            status: response.status_code,
            message,
        })
    }
}
