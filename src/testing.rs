//! Fakes and a local Rocket client for endpoint tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::Value;

use crate::config::Config;
use crate::github::{GithubApi, GithubError};
use crate::guards::limit_guard::Cooldown;
use crate::state::AppState;
use crate::store::MemoryStore;
use crate::structs::{GistSummary, GithubUser, RepoSummary, SearchResults};

pub fn github_user(id: u64, login: &str) -> GithubUser {
    GithubUser {
        id,
        login: login.to_string(),
        avatar_url: format!("https://avatars.example/{login}"),
        name: None,
        bio: None,
        location: None,
    }
}

pub fn repo_summary(full_name: &str) -> RepoSummary {
    let (owner, name) = full_name.split_once('/').unwrap();
    RepoSummary {
        name: name.into(),
        full_name: full_name.into(),
        url: format!("https://github.com/{full_name}"),
        description: None,
        stars: 3,
        forks: 1,
        language: Some("Rust".into()),
        updated_at: None,
        owner: owner.into(),
        owner_avatar: String::new(),
    }
}

/// Accepts `tok-<login>` for the known accounts.
pub struct FakeGithub {
    pub users: Vec<GithubUser>,
    pub starred: Mutex<Vec<(String, bool)>>,
}

impl Default for FakeGithub {
    fn default() -> Self {
        FakeGithub {
            users: vec![
                github_user(1, "octo"),
                github_user(2, "ana"),
                github_user(3, "bo"),
                github_user(4, "cleo"),
            ],
            starred: Mutex::new(vec![]),
        }
    }
}

impl FakeGithub {
    fn find(&self, login: &str) -> Option<GithubUser> {
        self.users
            .iter()
            .find(|u| u.login.eq_ignore_ascii_case(login))
            .cloned()
    }
}

impl GithubApi for FakeGithub {
    fn viewer(&self, token: &str) -> Result<GithubUser, GithubError> {
        token
            .strip_prefix("tok-")
            .and_then(|login| self.find(login))
            .ok_or(GithubError::Unauthorized)
    }

    fn user(&self, _token: &str, login: &str) -> Result<Option<GithubUser>, GithubError> {
        Ok(self.find(login))
    }

    fn repos(&self, _token: &str, login: Option<&str>) -> Result<Vec<RepoSummary>, GithubError> {
        let owner = login.unwrap_or("octo");
        Ok(vec![
            repo_summary(&format!("{owner}/one")),
            repo_summary(&format!("{owner}/two")),
        ])
    }

    fn pinned_repos(&self, _token: &str, login: &str) -> Result<Vec<RepoSummary>, GithubError> {
        match self.find(login) {
            Some(user) => Ok(vec![repo_summary(&format!("{}/pinned", user.login))]),
            None => Err(GithubError::NotFound),
        }
    }

    fn search_repos(&self, _token: &str, query: &str, page: u32) -> Result<SearchResults, GithubError> {
        Ok(SearchResults {
            total: 1,
            page,
            items: vec![repo_summary(&format!("search/{query}"))],
        })
    }

    fn gists(&self, _token: &str, _login: Option<&str>) -> Result<Vec<GistSummary>, GithubError> {
        Ok(vec![])
    }

    fn forks(&self, _token: &str, full_name: &str) -> Result<Vec<RepoSummary>, GithubError> {
        if full_name == "octo/missing" {
            return Err(GithubError::NotFound);
        }
        Ok(vec![repo_summary("ana/fork")])
    }

    fn set_starred(&self, _token: &str, full_name: &str, starred: bool) -> Result<(), GithubError> {
        self.starred
            .lock()
            .unwrap()
            .push((full_name.to_string(), starred));
        Ok(())
    }

    fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        match code {
            "good" => Ok("tok-cleo".into()),
            _ => Err(GithubError::OAuth("bad_verification_code".into())),
        }
    }
}

pub struct Harness {
    pub client: Client,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Config::local(), Duration::ZERO)
    }

    pub fn with(config: Config, cooldown: Duration) -> Self {
        Self::with_github(config, cooldown, Box::new(FakeGithub::default()))
    }

    pub fn with_github(config: Config, cooldown: Duration, github: Box<dyn GithubApi>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut state = AppState::new(config, Box::new(store.clone()), github);
        state.cooldown = Cooldown::new(cooldown);

        let client = Client::tracked(crate::app(state).expect("cors config")).expect("valid rocket");
        Harness { client, store }
    }

    pub fn get(&self, uri: &str, login: &str) -> LocalResponse<'_> {
        self.client
            .get(uri.to_string())
            .header(Header::new("Authorization", format!("Bearer tok-{login}")))
            .dispatch()
    }

    pub fn post(&self, uri: &str, login: &str, body: Value) -> LocalResponse<'_> {
        self.client
            .post(uri.to_string())
            .header(ContentType::JSON)
            .header(Header::new("Authorization", format!("Bearer tok-{login}")))
            .body(body.to_string())
            .dispatch()
    }

    /// POSTs and returns the JSON body, asserting a 200.
    pub fn post_ok(&self, uri: &str, login: &str, body: Value) -> Value {
        let response = self.post(uri, login, body);
        let status = response.status();
        let body = response.into_json::<Value>().unwrap_or(Value::Null);
        assert_eq!(status, Status::Ok, "{uri}: {body}");
        body
    }

    pub fn get_ok(&self, uri: &str, login: &str) -> Value {
        let response = self.get(uri, login);
        let status = response.status();
        let body = response.into_json::<Value>().unwrap_or(Value::Null);
        assert_eq!(status, Status::Ok, "{uri}: {body}");
        body
    }
}
