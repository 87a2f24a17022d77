use rocket::{serde::json::Json, State};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::{TRENDING_DEFAULT_LIMIT, TRENDING_MAX_LIMIT, TRENDING_PATH},
    data::{is_full_name, NotificationKind, TrendingRecord},
    error::{ApiError, ApiResult},
    guards::token_guard::Viewer,
    notify::notify,
    routes::users::own_profile,
    state::AppState,
    store::{DataRepo, StoreError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrendingEvent {
    Star,
    Unstar,
    View,
    Mention,
}

/// Applies one event to the repository's counters in `trending.json`.
pub fn record_event(
    repo: &DataRepo<'_>,
    full_name: &str,
    event: TrendingEvent,
) -> Result<TrendingRecord, StoreError> {
    let mut trending = repo.trending()?;
    let record = trending
        .value
        .entry(full_name.to_string())
        .or_insert_with(|| TrendingRecord::new(full_name));

    match event {
        TrendingEvent::Star => record.stars += 1,
        TrendingEvent::Unstar => record.stars = record.stars.saturating_sub(1),
        TrendingEvent::View => record.views += 1,
        TrendingEvent::Mention => record.mentions += 1,
    }
    record.rescore();
    let record = record.clone();

    repo.save(
        TRENDING_PATH,
        &trending,
        &format!("Trending {event:?} for {full_name}"),
    )?;
    Ok(record)
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    repo: String,
    event: String,
}

#[post("/track-trending", format = "application/json", data = "<request>")]
pub fn track_trending(
    viewer: &Viewer,
    state: &State<AppState>,
    request: Json<TrackRequest>,
) -> ApiResult<Json<TrendingRecord>> {
    let full_name = request.repo.trim();
    if !is_full_name(full_name) {
        return Err(ApiError::bad_request("Repository must be owner/name"));
    }
    let event = match request.event.as_str() {
        "star" => TrendingEvent::Star,
        "unstar" => TrendingEvent::Unstar,
        "view" => TrendingEvent::View,
        other => return Err(ApiError::bad_request(format!("Unknown event {other:?}"))),
    };

    let repo = state.repo();
    if event == TrendingEvent::View {
        return Ok(Json(record_event(&repo, full_name, event)?));
    }

    let star = event == TrendingEvent::Star;
    state.github.set_starred(&viewer.token, full_name, star)?;

    // the viewer's starred list decides whether this changes the count
    let mut profile = own_profile(&repo, viewer)?;
    let starred = &mut profile.value.starred_repos;
    let already = starred.iter().any(|r| r.eq_ignore_ascii_case(full_name));
    if star == already {
        let trending = repo.trending()?.value;
        let record = trending
            .get(full_name)
            .cloned()
            .unwrap_or_else(|| TrendingRecord::new(full_name));
        return Ok(Json(record));
    }

    if star {
        starred.push(full_name.to_string());
    } else {
        starred.retain(|r| !r.eq_ignore_ascii_case(full_name));
    }
    repo.save_profile(
        &profile,
        &format!("{} {:?}s {full_name}", viewer.login(), event),
    )?;

    let record = record_event(&repo, full_name, event)?;

    if star {
        let owner = full_name.split('/').next().unwrap_or_default();
        match repo.profile(owner) {
            Ok(Some(_)) => notify(
                &repo,
                owner,
                NotificationKind::Star,
                &viewer.actor(),
                json!({"repo": full_name}),
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(owner, error = %e, "skipping star notification"),
        }
    }

    Ok(Json(record))
}

#[get("/track-trending?<limit>")]
pub fn get_trending(
    _viewer: &Viewer,
    state: &State<AppState>,
    limit: Option<usize>,
) -> ApiResult<Json<Vec<TrendingRecord>>> {
    let limit = limit
        .unwrap_or(TRENDING_DEFAULT_LIMIT)
        .clamp(1, TRENDING_MAX_LIMIT);

    let mut records: Vec<TrendingRecord> = state.repo().trending()?.value.into_values().collect();
    records.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.repo.cmp(&b.repo)));
    records.truncate(limit);
    Ok(Json(records))
}
