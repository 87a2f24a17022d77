use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::{DataStore, StoreError};
use crate::config::{LEGACY_POSTS_PATH, TRENDING_PATH};
use crate::data::{Notification, Post, Profile, TrendingRecord};
use crate::shards::Month;

/// A document and the sha it was read at (`None` when the file does not exist yet).
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub sha: Option<String>,
}

/// Where a post was found, so it can be written back to the same file.
#[derive(Debug)]
pub struct PostLocation {
    pub path: String,
    pub posts: Versioned<Vec<Post>>,
    pub index: usize,
}

impl PostLocation {
    pub fn post(&self) -> &Post {
        &self.posts.value[self.index]
    }

    pub fn post_mut(&mut self) -> &mut Post {
        &mut self.posts.value[self.index]
    }
}

pub fn profile_path(username: &str) -> String {
    format!("users/{}.json", username.to_ascii_lowercase())
}

pub fn notifications_path(username: &str) -> String {
    format!("notifications/{}.json", username.to_ascii_lowercase())
}

/// Typed access to the documents of the data repository.
pub struct DataRepo<'a> {
    store: &'a dyn DataStore,
}

impl<'a> DataRepo<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        DataRepo { store }
    }

    fn load<T: DeserializeOwned>(&self, path: &str) -> Result<Option<Versioned<T>>, StoreError> {
        let Some(stored) = self.store.read(path)? else {
            return Ok(None);
        };
        Ok(Some(Versioned {
            value: serde_json::from_value(stored.data)?,
            sha: Some(stored.sha),
        }))
    }

    fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        path: &str,
    ) -> Result<Versioned<T>, StoreError> {
        Ok(self.load(path)?.unwrap_or(Versioned {
            value: T::default(),
            sha: None,
        }))
    }

    pub fn save<T: Serialize>(
        &self,
        path: &str,
        doc: &Versioned<T>,
        message: &str,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_value(&doc.value)?;
        self.store.write(path, &data, doc.sha.as_deref(), message)
    }

    pub fn profile(&self, username: &str) -> Result<Option<Versioned<Profile>>, StoreError> {
        self.load(&profile_path(username))
    }

    pub fn save_profile(&self, profile: &Versioned<Profile>, message: &str) -> Result<(), StoreError> {
        self.save(&profile_path(&profile.value.username), profile, message)
    }

    pub fn notifications(&self, username: &str) -> Result<Versioned<Vec<Notification>>, StoreError> {
        self.load_or_default(&notifications_path(username))
    }

    pub fn save_notifications(
        &self,
        username: &str,
        notifications: &Versioned<Vec<Notification>>,
        message: &str,
    ) -> Result<(), StoreError> {
        self.save(&notifications_path(username), notifications, message)
    }

    pub fn shard(&self, month: Month) -> Result<Versioned<Vec<Post>>, StoreError> {
        self.load_or_default(&month.path())
    }

    pub fn legacy_posts(&self) -> Result<Option<Versioned<Vec<Post>>>, StoreError> {
        self.load(LEGACY_POSTS_PATH)
    }

    pub fn trending(&self) -> Result<Versioned<BTreeMap<String, TrendingRecord>>, StoreError> {
        self.load_or_default(TRENDING_PATH)
    }

    /// Looks in the shard named by the id's timestamp, else the two most
    /// recent shards, then the legacy file. A legacy post that was already
    /// migrated resolves to its shard copy.
    pub fn find_post(&self, id: &str, now: DateTime<Utc>) -> Result<Option<PostLocation>, StoreError> {
        let months = match Month::of_post_id(id) {
            Some(month) => vec![month],
            None => {
                let current = Month::of(now);
                vec![current, current.previous()]
            }
        };

        for month in months {
            let path = month.path();
            let posts = self.shard(month)?;
            if let Some(index) = posts.value.iter().position(|p| p.id == id) {
                return Ok(Some(PostLocation { path, posts, index }));
            }
        }

        if let Some(posts) = self.legacy_posts()? {
            if let Some(index) = posts.value.iter().position(|p| p.id == id) {
                let month = Month::of(posts.value[index].created_at);
                let shard = self.shard(month)?;
                if let Some(index) = shard.value.iter().position(|p| p.id == id) {
                    return Ok(Some(PostLocation {
                        path: month.path(),
                        posts: shard,
                        index,
                    }));
                }
                return Ok(Some(PostLocation {
                    path: LEGACY_POSTS_PATH.to_string(),
                    posts,
                    index,
                }));
            }
        }

        Ok(None)
    }

    pub fn save_location(&self, location: &PostLocation, message: &str) -> Result<(), StoreError> {
        self.save(&location.path, &location.posts, message)
    }
}
