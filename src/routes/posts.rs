use chrono::{DateTime, Utc};
use rocket::{serde::json::Json, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::{
        FEED_DEFAULT_LIMIT, FEED_MAX_LIMIT, FEED_MIN_POSTS, POST_LIMIT, SNIPPET_LIMIT,
    },
    data::{
        is_full_name, new_id, Activity, CodeSnippet, Media, NotificationKind, Post,
        PostType, ReactionKind, RepoRef,
    },
    error::{ApiError, ApiResult},
    guards::token_guard::Viewer,
    notify::notify,
    queues::audit_queue::{send_audit, AuditCategory, AuditLog},
    routes::trending::{record_event, TrendingEvent},
    shards::{sort_newest_first, Month},
    state::AppState,
    store::{wrapper::PostLocation, DataRepo},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    content: String,
    #[serde(rename = "type", default)]
    kind: PostType,
    repo: Option<RepoRef>,
    code: Option<CodeSnippet>,
    activity: Option<Activity>,
    media: Option<Media>,
}

/// Trims `text` and checks it is non-empty and at most `limit` characters.
pub fn checked_text(text: &str, what: &str, limit: usize) -> ApiResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request(format!("{what} cannot be empty")));
    }
    if text.chars().count() > limit {
        return Err(ApiError::bad_request(format!(
            "{what} is over {limit} characters"
        )));
    }
    Ok(text.to_string())
}

fn check_attachments(post: &NewPost) -> ApiResult<()> {
    if let Some(repo) = &post.repo {
        if !is_full_name(&repo.full_name) {
            return Err(ApiError::bad_request("Repository must be owner/name"));
        }
    }
    if let Some(code) = &post.code {
        if code.snippet.trim().is_empty() || code.snippet.chars().count() > SNIPPET_LIMIT {
            return Err(ApiError::bad_request(format!(
                "Code snippet must be between 1-{SNIPPET_LIMIT} characters"
            )));
        }
    }
    if let Some(media) = &post.media {
        if !media.url.starts_with("https://") {
            return Err(ApiError::bad_request("Media must be served over https"));
        }
    }
    Ok(())
}

/// Refuses the write while the viewer's last post or comment is inside the
/// window. The window itself starts only when a write is saved.
pub fn check_cooldown(state: &AppState, viewer: &Viewer) -> ApiResult<()> {
    state.cooldown.check(viewer.login()).map_err(|wait| {
        ApiError::RateLimited((wait.as_millis() as u64).div_ceil(1000).max(1))
    })
}

pub fn locate(repo: &DataRepo<'_>, id: &str) -> ApiResult<PostLocation> {
    repo.find_post(id, Utc::now())?
        .ok_or_else(|| ApiError::NotFound(format!("Post {id}")))
}

#[post("/create-post", format = "application/json", data = "<body>")]
pub fn create_post(
    viewer: &Viewer,
    state: &State<AppState>,
    body: Json<NewPost>,
) -> ApiResult<Json<Post>> {
    let body = body.into_inner();
    let content = checked_text(&body.content, "Post", POST_LIMIT)?;
    check_attachments(&body)?;
    check_cooldown(state, viewer)?;

    let now = Utc::now();
    let post = Post {
        id: new_id(now),
        user_id: viewer.user.id,
        username: viewer.user.login.clone(),
        avatar: viewer.user.avatar_url.clone(),
        content,
        kind: body.kind,
        repo: body.repo,
        code: body.code,
        activity: body.activity,
        media: body.media,
        reactions: ReactionKind::zeroed(),
        reacted_by: Default::default(),
        comments: vec![],
        created_at: now,
        edited_at: None,
    };

    let repo = state.repo();
    let month = Month::of(now);
    let mut shard = repo.shard(month)?;
    shard.value.insert(0, post.clone());
    repo.save(
        &month.path(),
        &shard,
        &format!("Create post {} by {}", post.id, post.username),
    )?;
    state.cooldown.record(viewer.login());
    tracing::info!(post = %post.id, user = %post.username, shard = %month, "post created");

    if let Some(mentioned) = &post.repo {
        if let Err(e) = record_event(&repo, &mentioned.full_name, TrendingEvent::Mention) {
            tracing::warn!(repo = %mentioned.full_name, error = %e, "could not count mention");
        }
    }

    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagePost {
    post_id: String,
    action: String,
    content: Option<String>,
    reaction: Option<ReactionKind>,
    comment_id: Option<String>,
}

#[post("/manage-post", format = "application/json", data = "<body>")]
pub fn manage_post(
    viewer: &Viewer,
    state: &State<AppState>,
    body: Json<ManagePost>,
) -> ApiResult<Json<Value>> {
    let repo = state.repo();
    let mut location = locate(&repo, &body.post_id)?;
    let is_author = location.post().username.eq_ignore_ascii_case(viewer.login());

    match body.action.as_str() {
        "edit" => {
            if !is_author {
                return Err(ApiError::Forbidden("Only the author can edit a post".into()));
            }
            let content = checked_text(body.content.as_deref().unwrap_or(""), "Post", POST_LIMIT)?;
            let post = location.post_mut();
            post.content = content;
            post.edited_at = Some(Utc::now());
            repo.save_location(&location, &format!("Edit post {}", body.post_id))?;
            Ok(Json(json!(location.post())))
        }
        "delete" => {
            if !is_author {
                return Err(ApiError::Forbidden("Only the author can delete a post".into()));
            }
            location.posts.value.remove(location.index);
            repo.save(
                &location.path,
                &location.posts,
                &format!("Delete post {} by {}", body.post_id, viewer.login()),
            )?;
            send_audit(
                state.config.logging_webhook.as_deref(),
                AuditLog {
                    culprit: viewer.login().to_string(),
                    category: AuditCategory::Content,
                    description: format!("Deleted post {} from {}", body.post_id, location.path),
                },
            );
            Ok(Json(json!({"success": true, "deleted": body.post_id})))
        }
        "react" => {
            let kind = body
                .reaction
                .ok_or_else(|| ApiError::bad_request("Missing reaction"))?;
            let added = location.post_mut().toggle_reaction(kind, viewer.login());
            repo.save_location(
                &location,
                &format!("React {kind:?} on {} by {}", body.post_id, viewer.login()),
            )?;

            if added {
                let post = location.post();
                notify(
                    &repo,
                    &post.username,
                    NotificationKind::Reaction,
                    &viewer.actor(),
                    json!({"postId": post.id, "reaction": kind}),
                );
            }
            Ok(Json(json!(location.post())))
        }
        "delete-comment" => {
            let comment_id = body
                .comment_id
                .as_deref()
                .ok_or_else(|| ApiError::bad_request("Missing commentId"))?;
            let post = location.post_mut();
            let comment = post
                .comments
                .iter_mut()
                .find(|c| c.id == comment_id && !c.deleted)
                .ok_or_else(|| ApiError::NotFound(format!("Comment {comment_id}")))?;
            if !is_author && !comment.username.eq_ignore_ascii_case(viewer.login()) {
                return Err(ApiError::Forbidden(
                    "Only the commenter or the post author can delete a comment".into(),
                ));
            }
            // replies keep pointing at the tombstone
            comment.deleted = true;
            comment.content.clear();
            repo.save_location(
                &location,
                &format!("Delete comment {comment_id} on {}", body.post_id),
            )?;
            Ok(Json(json!(location.post())))
        }
        other => Err(ApiError::bad_request(format!("Unknown action {other:?}"))),
    }
}

#[get("/get-post?<id>")]
pub fn get_post(_viewer: &Viewer, state: &State<AppState>, id: &str) -> ApiResult<Json<Post>> {
    let location = locate(&state.repo(), id)?;
    Ok(Json(location.post().clone()))
}

#[derive(Debug, Default, FromForm)]
pub struct FeedQuery {
    username: Option<String>,
    #[field(name = "type")]
    kind: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Feed {
    pub posts: Vec<Post>,
    pub months: Vec<String>,
}

/// The current month's posts, topped up with last month's when there are
/// fewer than [`FEED_MIN_POSTS`], newest first.
pub fn feed(repo: &DataRepo<'_>, now: DateTime<Utc>, query: &FeedQuery) -> ApiResult<Feed> {
    let kind = match query.kind.as_deref() {
        Some(name) => Some(
            PostType::parse(name)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown post type {name:?}")))?,
        ),
        None => None,
    };
    let limit = query
        .limit
        .unwrap_or(FEED_DEFAULT_LIMIT)
        .clamp(1, FEED_MAX_LIMIT);

    let current = Month::of(now);
    let mut posts = repo.shard(current)?.value;
    let mut months = vec![current.to_string()];

    if posts.len() < FEED_MIN_POSTS {
        let previous = current.previous();
        posts.extend(repo.shard(previous)?.value);
        months.push(previous.to_string());
    }

    sort_newest_first(&mut posts);
    let posts = posts
        .into_iter()
        .filter(|p| {
            query
                .username
                .as_deref()
                .map_or(true, |u| p.username.eq_ignore_ascii_case(u))
        })
        .filter(|p| kind.map_or(true, |k| p.kind == k))
        .take(limit)
        .collect();

    Ok(Feed { posts, months })
}

#[get("/get-feed?<query..>")]
pub fn get_feed(_viewer: &Viewer, state: &State<AppState>, query: FeedQuery) -> ApiResult<Json<Feed>> {
    Ok(Json(feed(&state.repo(), Utc::now(), &query)?))
}
