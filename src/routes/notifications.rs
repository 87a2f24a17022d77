use rocket::{serde::json::Json, State};
use serde::{Deserialize, Serialize};

use crate::{
    data::Notification, error::ApiResult, guards::token_guard::Viewer, state::AppState,
};

#[derive(Debug, Serialize)]
pub struct Inbox {
    notifications: Vec<Notification>,
    unread: usize,
}

fn unread(list: &[Notification]) -> usize {
    list.iter().filter(|n| !n.read).count()
}

#[get("/get-notifications")]
pub fn get_notifications(viewer: &Viewer, state: &State<AppState>) -> ApiResult<Json<Inbox>> {
    let notifications = state.repo().notifications(viewer.login())?.value;
    Ok(Json(Inbox {
        unread: unread(&notifications),
        notifications,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRead {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    mark_all: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkReadOutcome {
    success: bool,
    unread: usize,
}

#[post("/mark-read", format = "application/json", data = "<request>")]
pub fn mark_read(
    viewer: &Viewer,
    state: &State<AppState>,
    request: Json<MarkRead>,
) -> ApiResult<Json<MarkReadOutcome>> {
    let repo = state.repo();
    let mut list = repo.notifications(viewer.login())?;

    let mut changed = 0;
    for notification in list.value.iter_mut().filter(|n| !n.read) {
        if request.mark_all || request.ids.contains(&notification.id) {
            notification.read = true;
            changed += 1;
        }
    }

    if changed > 0 {
        repo.save_notifications(
            viewer.login(),
            &list,
            &format!("Mark {changed} notifications read for {}", viewer.login()),
        )?;
    }

    Ok(Json(MarkReadOutcome {
        success: true,
        unread: unread(&list.value),
    }))
}

#[cfg(test)]
mod tests {
    use crate::data::{Actor, NotificationKind};
    use crate::notify::push;
    use crate::store::DataRepo;
    use crate::testing::Harness;
    use serde_json::json;

    fn seed(h: &Harness, count: usize) {
        let repo = DataRepo::new(h.store.as_ref());
        let actor = Actor {
            username: "ana".into(),
            avatar: String::new(),
        };
        for i in 0..count {
            push(&repo, "octo", NotificationKind::Star, &actor, json!({"n": i})).unwrap();
        }
    }

    #[test]
    fn lists_with_unread_count() {
        let h = Harness::new();
        seed(&h, 3);
        let inbox = h.get_ok("/api/get-notifications", "octo");
        assert_eq!(inbox["unread"], 3);
        assert_eq!(inbox["notifications"][0]["data"]["n"], 2);

        let empty = h.get_ok("/api/get-notifications", "bo");
        assert_eq!(empty["unread"], 0);
        assert_eq!(empty["notifications"], json!([]));
    }

    #[test]
    fn mark_all_sets_every_notification_read() {
        let h = Harness::new();
        seed(&h, 4);
        let outcome = h.post_ok("/api/mark-read", "octo", json!({"markAll": true}));
        assert_eq!(outcome["unread"], 0);

        let stored = h.store.get("notifications/octo.json").unwrap();
        assert!(stored.as_array().unwrap().iter().all(|n| n["read"] == true));
    }

    #[test]
    fn mark_read_by_id() {
        let h = Harness::new();
        seed(&h, 2);
        let inbox = h.get_ok("/api/get-notifications", "octo");
        let first = inbox["notifications"][0]["id"].clone();

        let outcome = h.post_ok("/api/mark-read", "octo", json!({"ids": [first]}));
        assert_eq!(outcome["unread"], 1);

        let inbox = h.get_ok("/api/get-notifications", "octo");
        assert_eq!(inbox["notifications"][0]["read"], true);
        assert_eq!(inbox["notifications"][1]["read"], false);
    }

    #[test]
    fn nothing_to_mark_writes_nothing() {
        let h = Harness::new();
        h.post_ok("/api/mark-read", "octo", json!({"markAll": true}));
        assert!(h.store.get("notifications/octo.json").is_none());
    }
}
