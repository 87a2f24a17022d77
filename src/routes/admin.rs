use rocket::{serde::json::Json, State};
use serde::Serialize;

use crate::{
    error::ApiResult,
    guards::{admin_guard::AdminToken, token_guard::Viewer},
    queues::audit_queue::{send_audit, AuditCategory, AuditLog},
    shards::{group_by_month, merge_into},
    state::AppState,
    store::{DataRepo, StoreError},
};

#[derive(Debug, Serialize)]
pub struct ShardReport {
    path: String,
    added: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct MigrationReport {
    migrated: usize,
    skipped: usize,
    shards: Vec<ShardReport>,
}

/// Copies posts from the legacy single file into monthly shards.
///
/// Posts already present in their shard are skipped, so running this twice
/// writes nothing the second time. The legacy file itself is never modified.
pub fn migrate(repo: &DataRepo<'_>) -> Result<MigrationReport, StoreError> {
    let Some(legacy) = repo.legacy_posts()? else {
        return Ok(MigrationReport::default());
    };

    let mut report = MigrationReport::default();
    for (month, posts) in group_by_month(legacy.value) {
        let incoming = posts.len();
        let mut shard = repo.shard(month)?;
        let added = merge_into(&mut shard.value, posts);

        report.migrated += added;
        report.skipped += incoming - added;
        if added == 0 {
            continue;
        }

        let path = month.path();
        repo.save(&path, &shard, &format!("Migrate {added} legacy posts into {month}"))?;
        report.shards.push(ShardReport { path, added });
    }
    Ok(report)
}

#[post("/migrate-shards")]
pub fn migrate_shards(
    viewer: &Viewer,
    _key: AdminToken,
    state: &State<AppState>,
) -> ApiResult<Json<MigrationReport>> {
    let report = migrate(&state.repo())?;
    tracing::info!(
        migrated = report.migrated,
        skipped = report.skipped,
        shards = report.shards.len(),
        "legacy posts migrated"
    );
    send_audit(
        state.config.logging_webhook.as_deref(),
        AuditLog {
            culprit: viewer.login().to_string(),
            category: AuditCategory::Admin,
            description: format!(
                "Migrated {} legacy posts into {} shards ({} already present)",
                report.migrated,
                report.shards.len(),
                report.skipped
            ),
        },
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, LEGACY_POSTS_PATH};
    use crate::testing::Harness;
    use rocket::http::{Header, Status};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn legacy_post(id: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "userId": 1,
            "username": "octo",
            "avatar": "",
            "content": "from the old file",
            "createdAt": created_at,
        })
    }

    fn harness() -> Harness {
        let config = Config {
            admin_key: Some("sesame".into()),
            ..Config::local()
        };
        Harness::with(config, Duration::ZERO)
    }

    fn migrate<'a>(h: &'a Harness, key: &str) -> rocket::local::blocking::LocalResponse<'a> {
        h.client
            .post("/api/migrate-shards")
            .header(Header::new("Authorization", "Bearer tok-octo"))
            .header(Header::new("Admin-Key", key.to_string()))
            .dispatch()
    }

    #[test]
    fn migration_is_idempotent() {
        let h = harness();
        h.store.put(
            LEGACY_POSTS_PATH,
            json!([
                legacy_post("1704067200000-aaaaaaaa", "2024-01-01T00:00:00Z"),
                legacy_post("1704153600000-bbbbbbbb", "2024-01-02T00:00:00Z"),
                legacy_post("1706745600000-cccccccc", "2024-02-01T00:00:00Z"),
            ]),
        );

        let report: Value = migrate(&h, "sesame").into_json().unwrap();
        assert_eq!(report["migrated"], 3);
        assert_eq!(report["skipped"], 0);
        assert_eq!(report["shards"][0]["path"], "data/posts/2024/01.json");
        assert_eq!(report["shards"][0]["added"], 2);

        let january = h.store.get("data/posts/2024/01.json").unwrap();
        assert_eq!(january[0]["id"], "1704153600000-bbbbbbbb");

        let again: Value = migrate(&h, "sesame").into_json().unwrap();
        assert_eq!(again["migrated"], 0);
        assert_eq!(again["skipped"], 3);
        assert_eq!(again["shards"], json!([]));
        assert!(h.store.get(LEGACY_POSTS_PATH).is_some());
    }

    #[test]
    fn missing_legacy_file_reports_zeros() {
        let h = harness();
        let report: Value = migrate(&h, "sesame").into_json().unwrap();
        assert_eq!(report, json!({"migrated": 0, "skipped": 0, "shards": []}));
    }

    #[test]
    fn needs_the_admin_key() {
        let h = harness();
        assert_eq!(migrate(&h, "guess").status(), Status::Unauthorized);

        let response = h.post("/api/migrate-shards", "octo", json!({}));
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
