use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::USERNAME_LIMIT;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Thought,
    Release,
    Experiment,
    Tutorial,
    Commit,
    Milestone,
    Teaser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Fire,
    Rocket,
    Heart,
    Bulb,
    Eyes,
}

impl PostType {
    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(Value::String(name.to_ascii_lowercase())).ok()
    }
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Fire,
        ReactionKind::Rocket,
        ReactionKind::Heart,
        ReactionKind::Bulb,
        ReactionKind::Eyes,
    ];

    pub fn zeroed() -> BTreeMap<ReactionKind, u32> {
        Self::ALL.iter().map(|kind| (*kind, 0)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    pub full_name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippet {
    pub language: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub kind: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: u64,
    pub username: String,
    pub avatar: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: u64,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: PostType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default = "ReactionKind::zeroed")]
    pub reactions: BTreeMap<ReactionKind, u32>,
    #[serde(default)]
    pub reacted_by: BTreeMap<ReactionKind, Vec<String>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Adds or removes `username` from the reaction, returning whether it is now held.
    pub fn toggle_reaction(&mut self, kind: ReactionKind, username: &str) -> bool {
        let holders = self.reacted_by.entry(kind).or_default();
        let added = match holders.iter().position(|u| u.eq_ignore_ascii_case(username)) {
            Some(index) => {
                holders.remove(index);
                false
            }
            None => {
                holders.push(username.to_string());
                true
            }
        };
        let count = holders.len() as u32;
        self.reactions.insert(kind, count);
        added
    }

    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
    #[serde(default)]
    pub followers_list: Vec<String>,
    #[serde(default)]
    pub following_list: Vec<String>,
    #[serde(default)]
    pub pinned_repos: Vec<String>,
    #[serde(default)]
    pub starred_repos: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn bare(username: &str) -> Self {
        Profile {
            id: 0,
            username: username.to_string(),
            name: None,
            bio: None,
            avatar: format!("https://github.com/{username}.png"),
            location: None,
            followers: 0,
            following: 0,
            followers_list: vec![],
            following_list: vec![],
            pinned_repos: vec![],
            starred_repos: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn is_followed_by(&self, username: &str) -> bool {
        contains_login(&self.followers_list, username)
    }

    pub fn recount(&mut self) {
        self.followers = self.followers_list.len() as u32;
        self.following = self.following_list.len() as u32;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Star,
    Reaction,
    Reply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub actor: Actor,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingRecord {
    pub repo: String,
    #[serde(default)]
    pub stars: u32,
    #[serde(default)]
    pub views: u32,
    #[serde(default)]
    pub mentions: u32,
    #[serde(default)]
    pub score: u32,
    pub updated_at: DateTime<Utc>,
}

impl TrendingRecord {
    pub fn new(repo: &str) -> Self {
        TrendingRecord {
            repo: repo.to_string(),
            stars: 0,
            views: 0,
            mentions: 0,
            score: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn rescore(&mut self) {
        self.score = self.stars * 5 + self.views + self.mentions * 3;
        self.updated_at = Utc::now();
    }
}

/// `<unix-millis>-<8 hex>`; the prefix doubles as the creation time.
pub fn new_id(at: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        at.timestamp_millis(),
        hex::encode(rand::thread_rng().gen::<[u8; 4]>())
    )
}

pub fn id_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let millis = id.split('-').next()?.parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(millis)
}

/// GitHub login rules: alphanumerics and single hyphens, no leading hyphen.
pub fn is_login(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= USERNAME_LIMIT
        && !name.starts_with('-')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub fn is_full_name(repo: &str) -> bool {
    let Some((owner, name)) = repo.split_once('/') else {
        return false;
    };
    is_login(owner)
        && !name.is_empty()
        && name.len() <= 100
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

pub fn contains_login(list: &[String], login: &str) -> bool {
    list.iter().any(|u| u.eq_ignore_ascii_case(login))
}
