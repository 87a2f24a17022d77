use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataStore, StoreError, Stored};
use crate::config::{DataRepoConfig, USER_AGENT};

/// Contents API client for the data repository, authenticated with the system PAT.
pub struct GithubStore {
    api_url: String,
    repo: String,
    branch: String,
    token: String,
}

#[derive(Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Serialize)]
struct PutContent<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GithubStore {
    pub fn new(api_url: &str, config: &DataRepoConfig) -> Self {
        GithubStore {
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_url, self.repo, path)
    }

    fn request(&self, request: minreq::Request) -> minreq::Request {
        request
            .with_header("Authorization", format!("Bearer {}", self.token))
            .with_header("Accept", "application/vnd.github+json")
            .with_header("X-GitHub-Api-Version", "2022-11-28")
            .with_header("User-Agent", USER_AGENT)
    }
}

pub(crate) fn decode_content(path: &str, content: &str) -> Result<Value, StoreError> {
    // the API wraps base64 at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|source| StoreError::Decode {
            path: path.to_string(),
            source,
        })?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn encode_content(data: &Value) -> Result<String, StoreError> {
    let pretty = serde_json::to_string_pretty(data)?;
    Ok(STANDARD.encode(pretty.as_bytes()))
}

impl DataStore for GithubStore {
    fn read(&self, path: &str) -> Result<Option<Stored>, StoreError> {
        let url = format!(
            "{}?ref={}",
            self.url(path),
            url::form_urlencoded::byte_serialize(self.branch.as_bytes()).collect::<String>()
        );
        let response = self.request(minreq::get(url)).send()?;

        match response.status_code {
            200 => {}
            404 => return Ok(None),
            status => {
                tracing::warn!(path, status, "contents read failed");
                return Err(StoreError::Status {
                    path: path.to_string(),
                    status,
                });
            }
        }

        let file: ContentFile = serde_json::from_slice(response.as_bytes())?;
        if file.encoding != "base64" {
            return Err(StoreError::TooLarge {
                path: path.to_string(),
            });
        }

        let data = decode_content(path, &file.content)?;
        tracing::debug!(path, sha = %file.sha, "read data file");
        Ok(Some(Stored {
            data,
            sha: file.sha,
        }))
    }

    fn write(
        &self,
        path: &str,
        data: &Value,
        sha: Option<&str>,
        message: &str,
    ) -> Result<(), StoreError> {
        let body = PutContent {
            message,
            content: encode_content(data)?,
            branch: &self.branch,
            sha,
        };

        let response = self
            .request(minreq::put(self.url(path)))
            .with_header("Content-Type", "application/json")
            .with_body(serde_json::to_string(&body)?)
            .send()?;

        match response.status_code {
            200 | 201 => {
                tracing::debug!(path, "wrote data file");
                Ok(())
            }
            // 409: sha is stale, 422: file exists and no sha was sent
            409 | 422 => {
                tracing::warn!(path, status = response.status_code, "write conflict");
                Err(StoreError::Conflict {
                    path: path.to_string(),
                })
            }
            status => {
                tracing::warn!(path, status, "contents write failed");
                Err(StoreError::Status {
                    path: path.to_string(),
                    status,
                })
            }
        }
    }
}
