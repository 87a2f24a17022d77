//! Calls made to GitHub on behalf of the signed-in user, with their bearer token.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use thiserror::Error;

use crate::config::{Config, GITHUB_OAUTH_URL, SEARCH_PER_PAGE, USER_AGENT};
use crate::structs::{
    GistSummary, GithubUser, RawGist, RawRepo, RawSearch, RepoSummary, SearchResults,
};

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub rejected the token")]
    Unauthorized,
    #[error("not found on GitHub")]
    NotFound,
    #[error("GitHub answered {status}")]
    Status { status: i32 },
    #[error("oauth exchange failed: {0}")]
    OAuth(String),
    #[error("GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET must be set")]
    NotConfigured,
    #[error("transport error: {0}")]
    Http(#[from] minreq::Error),
    #[error("bad json from GitHub: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait GithubApi: Send + Sync {
    /// The account behind `token`.
    fn viewer(&self, token: &str) -> Result<GithubUser, GithubError>;

    fn user(&self, token: &str, login: &str) -> Result<Option<GithubUser>, GithubError>;

    /// Repositories by most recent update; the viewer's own when `login` is `None`.
    fn repos(&self, token: &str, login: Option<&str>) -> Result<Vec<RepoSummary>, GithubError>;

    fn pinned_repos(&self, token: &str, login: &str) -> Result<Vec<RepoSummary>, GithubError>;

    fn search_repos(&self, token: &str, query: &str, page: u32) -> Result<SearchResults, GithubError>;

    fn gists(&self, token: &str, login: Option<&str>) -> Result<Vec<GistSummary>, GithubError>;

    fn forks(&self, token: &str, full_name: &str) -> Result<Vec<RepoSummary>, GithubError>;

    fn set_starred(&self, token: &str, full_name: &str, starred: bool) -> Result<(), GithubError>;

    /// Trades an OAuth `code` for an access token.
    fn exchange_code(&self, code: &str) -> Result<String, GithubError>;
}

pub struct GithubClient {
    api_url: String,
    client_id: String,
    client_secret: String,
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

const PINNED_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    pinnedItems(first: 6, types: REPOSITORY) {
      nodes {
        ... on Repository {
          name
          nameWithOwner
          url
          description
          stargazerCount
          forkCount
          updatedAt
          primaryLanguage { name }
          owner { login avatarUrl }
        }
      }
    }
  }
}
"#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinnedRepo {
    name: String,
    name_with_owner: String,
    url: String,
    description: Option<String>,
    stargazer_count: u32,
    fork_count: u32,
    updated_at: Option<String>,
    primary_language: Option<PinnedLanguage>,
    owner: PinnedOwner,
}

#[derive(Deserialize)]
struct PinnedLanguage {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinnedOwner {
    login: String,
    avatar_url: String,
}

impl From<PinnedRepo> for RepoSummary {
    fn from(repo: PinnedRepo) -> Self {
        RepoSummary {
            name: repo.name,
            full_name: repo.name_with_owner,
            url: repo.url,
            description: repo.description,
            stars: repo.stargazer_count,
            forks: repo.fork_count,
            language: repo.primary_language.map(|l| l.name),
            updated_at: repo.updated_at,
            owner: repo.owner.login,
            owner_avatar: repo.owner.avatar_url,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl GithubClient {
    pub fn new(config: &Config) -> Self {
        GithubClient {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    fn request(&self, request: minreq::Request, token: &str) -> minreq::Request {
        request
            .with_header("Authorization", format!("Bearer {token}"))
            .with_header("Accept", "application/vnd.github+json")
            .with_header("X-GitHub-Api-Version", "2022-11-28")
            .with_header("User-Agent", USER_AGENT)
    }

    fn send(&self, request: minreq::Request) -> Result<minreq::Response, GithubError> {
        let response = request.send()?;
        match response.status_code {
            200..=299 => Ok(response),
            401 => Err(GithubError::Unauthorized),
            404 => Err(GithubError::NotFound),
            status => {
                tracing::warn!(status, "GitHub request failed");
                Err(GithubError::Status { status })
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, GithubError> {
        let url = format!("{}{}", self.api_url, path);
        let response = self.send(self.request(minreq::get(url), token))?;
        Ok(serde_json::from_slice(response.as_bytes())?)
    }
}

impl GithubApi for GithubClient {
    fn viewer(&self, token: &str) -> Result<GithubUser, GithubError> {
        self.get_json(token, "/user")
    }

    fn user(&self, token: &str, login: &str) -> Result<Option<GithubUser>, GithubError> {
        match self.get_json(token, &format!("/users/{}", encode(login))) {
            Ok(user) => Ok(Some(user)),
            Err(GithubError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn repos(&self, token: &str, login: Option<&str>) -> Result<Vec<RepoSummary>, GithubError> {
        let path = match login {
            Some(login) => format!("/users/{}/repos?sort=updated&per_page=100", encode(login)),
            None => "/user/repos?sort=updated&per_page=100&affiliation=owner".to_string(),
        };
        let repos: Vec<RawRepo> = self.get_json(token, &path)?;
        Ok(repos.into_iter().map(RepoSummary::from).collect())
    }

    fn pinned_repos(&self, token: &str, login: &str) -> Result<Vec<RepoSummary>, GithubError> {
        let body = json!({"query": PINNED_QUERY, "variables": {"login": login}});
        let response = self.send(
            self.request(minreq::post(format!("{}/graphql", self.api_url)), token)
                .with_header("Content-Type", "application/json")
                .with_body(body.to_string()),
        )?;

        let value: serde_json::Value = serde_json::from_slice(response.as_bytes())?;
        let nodes = &value["data"]["user"]["pinnedItems"]["nodes"];
        if value["data"]["user"].is_null() {
            return Err(GithubError::NotFound);
        }

        let repos: Vec<Option<PinnedRepo>> = serde_json::from_value(nodes.clone())?;
        Ok(repos.into_iter().flatten().map(RepoSummary::from).collect())
    }

    fn search_repos(&self, token: &str, query: &str, page: u32) -> Result<SearchResults, GithubError> {
        let path = format!(
            "/search/repositories?q={}&sort=stars&order=desc&per_page={}&page={}",
            encode(query),
            SEARCH_PER_PAGE,
            page
        );
        let raw: RawSearch = self.get_json(token, &path)?;
        Ok(SearchResults {
            total: raw.total_count,
            page,
            items: raw.items.into_iter().map(RepoSummary::from).collect(),
        })
    }

    fn gists(&self, token: &str, login: Option<&str>) -> Result<Vec<GistSummary>, GithubError> {
        let path = match login {
            Some(login) => format!("/users/{}/gists?per_page=100", encode(login)),
            None => "/gists?per_page=100".to_string(),
        };
        let gists: Vec<RawGist> = self.get_json(token, &path)?;
        Ok(gists.into_iter().map(GistSummary::from).collect())
    }

    fn forks(&self, token: &str, full_name: &str) -> Result<Vec<RepoSummary>, GithubError> {
        let forks: Vec<RawRepo> =
            self.get_json(token, &format!("/repos/{full_name}/forks?sort=newest&per_page=100"))?;
        Ok(forks.into_iter().map(RepoSummary::from).collect())
    }

    fn set_starred(&self, token: &str, full_name: &str, starred: bool) -> Result<(), GithubError> {
        let url = format!("{}/user/starred/{}", self.api_url, full_name);
        let request = if starred {
            minreq::put(url).with_header("Content-Length", "0")
        } else {
            minreq::delete(url)
        };
        self.send(self.request(request, token))?;
        Ok(())
    }

    fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(GithubError::NotConfigured);
        }

        let body = json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "code": code,
        });
        let response = minreq::post(format!("{GITHUB_OAUTH_URL}/login/oauth/access_token"))
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/json")
            .with_header("User-Agent", USER_AGENT)
            .with_body(body.to_string())
            .send()?;

        let token: TokenResponse = serde_json::from_slice(response.as_bytes())?;
        match token.access_token {
            Some(access_token) => Ok(access_token),
            None => Err(GithubError::OAuth(
                token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| format!("status {}", response.status_code)),
            )),
        }
    }
}
