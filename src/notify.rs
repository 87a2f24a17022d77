use chrono::Utc;
use serde_json::Value;

use crate::config::NOTIFICATION_CAP;
use crate::data::{new_id, Actor, Notification, NotificationKind};
use crate::store::{DataRepo, StoreError};

/// Puts a notification at the head of `recipient`'s list, keeping at most
/// [`NOTIFICATION_CAP`]. Returns `false` when nothing was written because
/// the actor is the recipient.
pub fn push(
    repo: &DataRepo<'_>,
    recipient: &str,
    kind: NotificationKind,
    actor: &Actor,
    data: Value,
) -> Result<bool, StoreError> {
    if recipient.eq_ignore_ascii_case(&actor.username) {
        return Ok(false);
    }

    let now = Utc::now();
    let mut list = repo.notifications(recipient)?;
    list.value.insert(
        0,
        Notification {
            id: new_id(now),
            kind,
            actor: actor.clone(),
            data,
            read: false,
            created_at: now,
        },
    );
    list.value.truncate(NOTIFICATION_CAP);

    repo.save_notifications(
        recipient,
        &list,
        &format!("Notify {recipient} ({kind:?}) from {}", actor.username),
    )?;
    Ok(true)
}

/// Like [`push`], but a failure is only logged: a notification never fails
/// the action that caused it.
pub fn notify(
    repo: &DataRepo<'_>,
    recipient: &str,
    kind: NotificationKind,
    actor: &Actor,
    data: Value,
) {
    if let Err(e) = push(repo, recipient, kind, actor, data) {
        tracing::warn!(recipient, ?kind, error = %e, "failed to deliver notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn actor(name: &str) -> Actor {
        Actor {
            username: name.into(),
            avatar: format!("https://github.com/{name}.png"),
        }
    }

    #[test]
    fn skips_self_notification() {
        let store = MemoryStore::new();
        let repo = DataRepo::new(&store);
        let sent = push(&repo, "Octo", NotificationKind::Follow, &actor("octo"), json!({})).unwrap();
        assert!(!sent);
        assert!(store.get("notifications/octo.json").is_none());
    }

    #[test]
    fn newest_first_and_capped() {
        let store = MemoryStore::new();
        let repo = DataRepo::new(&store);
        for i in 0..(NOTIFICATION_CAP + 5) {
            push(
                &repo,
                "octo",
                NotificationKind::Reaction,
                &actor("ana"),
                json!({"n": i}),
            )
            .unwrap();
        }

        let list = repo.notifications("octo").unwrap().value;
        assert_eq!(list.len(), NOTIFICATION_CAP);
        assert_eq!(list[0].data, json!({"n": NOTIFICATION_CAP + 4}));
        assert!(list.iter().all(|n| !n.read));
    }

    #[test]
    fn failures_are_swallowed() {
        let store = MemoryStore::new();
        store.fail_writes_to("notifications/octo.json");
        let repo = DataRepo::new(&store);
        notify(&repo, "octo", NotificationKind::Star, &actor("ana"), json!({}));
        assert!(store.get("notifications/octo.json").is_none());
    }
}
