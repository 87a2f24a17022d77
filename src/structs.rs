use serde::{Deserialize, Serialize};

use crate::data::{Actor, Profile};

/// The subset of GitHub's user object this service reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubUser {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl GithubUser {
    pub fn actor(&self) -> Actor {
        Actor {
            username: self.login.clone(),
            avatar: self.avatar_url.clone(),
        }
    }

    /// A fresh profile seeded from the GitHub account.
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            name: self.name.clone(),
            bio: self.bio.clone(),
            avatar: self.avatar_url.clone(),
            location: self.location.clone(),
            ..Profile::bare(&self.login)
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOwner {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRepo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub owner: RawOwner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub description: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    pub updated_at: Option<String>,
    pub owner: String,
    pub owner_avatar: String,
}

impl From<RawRepo> for RepoSummary {
    fn from(repo: RawRepo) -> Self {
        RepoSummary {
            name: repo.name,
            full_name: repo.full_name,
            url: repo.html_url,
            description: repo.description,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language,
            updated_at: repo.updated_at,
            owner: repo.owner.login,
            owner_avatar: repo.owner.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSearch {
    pub total_count: u64,
    pub items: Vec<RawRepo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub total: u64,
    pub page: u32,
    pub items: Vec<RepoSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGistFile {
    pub filename: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGist {
    pub id: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub public: bool,
    pub created_at: String,
    pub files: std::collections::BTreeMap<String, RawGistFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GistSummary {
    pub id: String,
    pub url: String,
    pub description: Option<String>,
    pub public: bool,
    pub created_at: String,
    pub files: Vec<String>,
    pub languages: Vec<String>,
}

impl From<RawGist> for GistSummary {
    fn from(gist: RawGist) -> Self {
        let mut languages: Vec<String> = gist
            .files
            .values()
            .filter_map(|f| f.language.clone())
            .collect();
        languages.sort();
        languages.dedup();
        GistSummary {
            id: gist.id,
            url: gist.html_url,
            description: gist.description.filter(|d| !d.is_empty()),
            public: gist.public,
            created_at: gist.created_at,
            files: gist.files.into_values().map(|f| f.filename).collect(),
            languages,
        }
    }
}
