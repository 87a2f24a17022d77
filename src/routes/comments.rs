use chrono::Utc;
use rocket::{serde::json::Json, State};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::COMMENT_LIMIT,
    data::{new_id, Comment, NotificationKind},
    error::{ApiError, ApiResult},
    guards::token_guard::Viewer,
    notify::notify,
    routes::posts::{check_cooldown, checked_text, locate},
    state::AppState,
};

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostComment {
    post_id: String,
    content: String,
    parent_id: Option<String>,
}

fn preview(content: &str) -> String {
    content.chars().take(80).collect()
}

#[post("/add-comment", format = "application/json", data = "<comment>")]
pub fn add_comment(
    viewer: &Viewer,
    state: &State<AppState>,
    comment: Json<PostComment>,
) -> ApiResult<Json<Comment>> {
    let content = checked_text(&comment.content, "Comment", COMMENT_LIMIT)?;
    check_cooldown(state, viewer)?;

    let repo = state.repo();
    let mut location = locate(&repo, &comment.post_id)?;

    let parent_author = match &comment.parent_id {
        Some(parent_id) => {
            let Some(parent) = location.post().comment(parent_id).filter(|c| !c.deleted) else {
                return Err(ApiError::NotFound(format!("Comment {parent_id}")));
            };
            Some(parent.username.clone())
        }
        None => None,
    };

    let now = Utc::now();
    let new_comment = Comment {
        id: new_id(now),
        user_id: viewer.user.id,
        username: viewer.user.login.clone(),
        avatar: viewer.user.avatar_url.clone(),
        content,
        parent_id: comment.parent_id.clone(),
        created_at: now,
        deleted: false,
    };
    location.post_mut().comments.push(new_comment.clone());
    repo.save_location(
        &location,
        &format!("Comment {} on {} by {}", new_comment.id, comment.post_id, viewer.login()),
    )?;
    state.cooldown.record(viewer.login());

    let post_author = location.post().username.clone();
    let data = json!({
        "postId": comment.post_id,
        "commentId": new_comment.id,
        "preview": preview(&new_comment.content),
    });
    notify(&repo, &post_author, NotificationKind::Reply, &viewer.actor(), data.clone());
    if let Some(parent_author) = parent_author {
        if !parent_author.eq_ignore_ascii_case(&post_author) {
            notify(&repo, &parent_author, NotificationKind::Reply, &viewer.actor(), data);
        }
    }

    Ok(Json(new_comment))
}
