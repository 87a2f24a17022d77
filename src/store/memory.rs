use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use super::{DataStore, StoreError, Stored};

/// In-process store with the same sha rules as the contents API.
///
/// Used when no data repository is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, Stored>>,
    failing: Mutex<HashSet<String>>,
    unreadable: Mutex<HashSet<String>>,
    revision: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later write to `path` fail.
    pub fn fail_writes_to(&self, path: &str) {
        lock(&self.failing).insert(path.to_string());
    }

    /// Makes every later read of `path` fail.
    pub fn fail_reads_of(&self, path: &str) {
        lock(&self.unreadable).insert(path.to_string());
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        lock(&self.files).get(path).map(|f| f.data.clone())
    }

    /// Seeds a file, bypassing sha checks.
    pub fn put(&self, path: &str, data: Value) {
        let sha = self.next_sha();
        lock(&self.files).insert(path.to_string(), Stored { data, sha });
    }

    fn next_sha(&self) -> String {
        let mut revision = lock(&self.revision);
        *revision += 1;
        format!("{:040x}", *revision)
    }
}

// a poisoned lock only means another request panicked mid-update
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl DataStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Option<Stored>, StoreError> {
        if lock(&self.unreadable).contains(path) {
            return Err(StoreError::Status {
                path: path.to_string(),
                status: 500,
            });
        }
        Ok(lock(&self.files).get(path).cloned())
    }

    fn write(
        &self,
        path: &str,
        data: &Value,
        sha: Option<&str>,
        _message: &str,
    ) -> Result<(), StoreError> {
        if lock(&self.failing).contains(path) {
            return Err(StoreError::Status {
                path: path.to_string(),
                status: 500,
            });
        }

        let new_sha = self.next_sha();
        let mut files = lock(&self.files);
        let current = files.get(path).map(|f| f.sha.as_str());
        if current != sha {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        files.insert(
            path.to_string(),
            Stored {
                data: data.clone(),
                sha: new_sha,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stale_sha_is_a_conflict() {
        let store = MemoryStore::new();
        store.write("a.json", &json!([1]), None, "create").unwrap();

        let first = store.read("a.json").unwrap().unwrap();
        store
            .write("a.json", &json!([1, 2]), Some(&first.sha), "update")
            .unwrap();

        let err = store
            .write("a.json", &json!([1, 3]), Some(&first.sha), "lost update")
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.get("a.json"), Some(json!([1, 2])));
    }

    #[test]
    fn creating_over_existing_file_conflicts() {
        let store = MemoryStore::new();
        store.put("a.json", json!({}));
        assert!(matches!(
            store.write("a.json", &json!({}), None, "create"),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn missing_file_reads_as_none() {
        assert!(MemoryStore::new().read("nope.json").unwrap().is_none());
    }
}
