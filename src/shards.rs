//! Monthly partitioning of posts into `data/posts/YYYY/MM.json`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Datelike, Utc};

use crate::data::{id_timestamp, Post};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(at: DateTime<Utc>) -> Self {
        Month {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn of_post_id(id: &str) -> Option<Self> {
        id_timestamp(id).map(Month::of)
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Month {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Month {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn path(self) -> String {
        format!("data/posts/{:04}/{:02}.json", self.year, self.month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Adds the posts from `incoming` whose ids `shard` lacks, returning how many were added.
pub fn merge_into(shard: &mut Vec<Post>, incoming: Vec<Post>) -> usize {
    let mut known: HashSet<String> = shard.iter().map(|p| p.id.clone()).collect();
    let before = shard.len();
    for post in incoming {
        if known.insert(post.id.clone()) {
            shard.push(post);
        }
    }
    sort_newest_first(shard);
    shard.len() - before
}

pub fn group_by_month(posts: Vec<Post>) -> BTreeMap<Month, Vec<Post>> {
    let mut groups: BTreeMap<Month, Vec<Post>> = BTreeMap::new();
    for post in posts {
        groups.entry(Month::of(post.created_at)).or_default().push(post);
    }
    groups
}
