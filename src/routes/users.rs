use rocket::{serde::json::Json, State};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::{BIO_LIMIT, LOCATION_LIMIT, NAME_LIMIT, PINNED_LIMIT},
    data::{contains_login, is_full_name, is_login, NotificationKind, Profile},
    error::{ApiError, ApiResult},
    github::{GithubApi, GithubError},
    guards::token_guard::Viewer,
    notify::notify,
    state::AppState,
    store::{wrapper::Versioned, DataRepo},
};

pub fn checked_login(username: &str) -> ApiResult<&str> {
    let username = username.trim();
    if !is_login(username) {
        return Err(ApiError::bad_request(format!("Invalid username {username:?}")));
    }
    Ok(username)
}

/// The viewer's stored profile, or a new one seeded from their GitHub account.
pub fn own_profile(repo: &DataRepo<'_>, viewer: &Viewer) -> ApiResult<Versioned<Profile>> {
    Ok(repo.profile(viewer.login())?.unwrap_or_else(|| Versioned {
        value: viewer.user.profile(),
        sha: None,
    }))
}

fn other_profile(
    repo: &DataRepo<'_>,
    github: &dyn GithubApi,
    token: &str,
    username: &str,
) -> ApiResult<Versioned<Profile>> {
    if let Some(profile) = repo.profile(username)? {
        return Ok(profile);
    }

    let value = match github.user(token, username) {
        Ok(Some(user)) => user.profile(),
        Ok(None) => return Err(ApiError::NotFound(format!("User {username}"))),
        Err(GithubError::Unauthorized) => return Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::warn!(username, error = %e, "GitHub lookup failed, using a bare profile");
            Profile::bare(username)
        }
    };
    Ok(Versioned { value, sha: None })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    profile: Profile,
    is_following: bool,
    persisted: bool,
}

#[get("/get-profile?<username>")]
pub fn get_profile(
    viewer: &Viewer,
    state: &State<AppState>,
    username: &str,
) -> ApiResult<Json<ProfileView>> {
    let username = checked_login(username)?;
    let repo = state.repo();

    let (profile, persisted) = match repo.profile(username)? {
        Some(stored) => (stored.value, true),
        None => match state.github.user(&viewer.token, username)? {
            Some(user) => (user.profile(), false),
            None => return Err(ApiError::NotFound(format!("User {username}"))),
        },
    };

    Ok(Json(ProfileView {
        is_following: profile.is_followed_by(viewer.login()),
        profile,
        persisted,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    pinned_repos: Option<Vec<String>>,
}

fn optional_text(value: &str, what: &str, limit: usize) -> ApiResult<Option<String>> {
    let value = value.trim();
    if value.chars().count() > limit {
        return Err(ApiError::bad_request(format!(
            "{what} is over {limit} characters"
        )));
    }
    Ok((!value.is_empty()).then(|| value.to_string()))
}

#[post("/update-profile", format = "application/json", data = "<update>")]
pub fn update_profile(
    viewer: &Viewer,
    state: &State<AppState>,
    update: Json<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    let repo = state.repo();
    let mut profile = own_profile(&repo, viewer)?;

    if let Some(name) = &update.name {
        profile.value.name = optional_text(name, "Name", NAME_LIMIT)?;
    }
    if let Some(bio) = &update.bio {
        profile.value.bio = optional_text(bio, "Bio", BIO_LIMIT)?;
    }
    if let Some(location) = &update.location {
        profile.value.location = optional_text(location, "Location", LOCATION_LIMIT)?;
    }
    if let Some(pinned) = &update.pinned_repos {
        if pinned.len() > PINNED_LIMIT {
            return Err(ApiError::bad_request(format!(
                "At most {PINNED_LIMIT} pinned repositories"
            )));
        }
        if let Some(bad) = pinned.iter().find(|r| !is_full_name(r)) {
            return Err(ApiError::bad_request(format!(
                "{bad:?} is not an owner/name repository"
            )));
        }
        profile.value.pinned_repos = pinned.clone();
    }

    repo.save_profile(&profile, &format!("Update profile of {}", viewer.login()))?;
    Ok(Json(profile.value))
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    username: String,
    action: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    success: bool,
    following: bool,
    followers: u32,
    target_updated: bool,
}

/// Returns whether `login` was new to the list.
fn add_login(list: &mut Vec<String>, login: &str) -> bool {
    if contains_login(list, login) {
        return false;
    }
    list.push(login.to_string());
    true
}

fn remove_login(list: &mut Vec<String>, login: &str) {
    list.retain(|u| !u.eq_ignore_ascii_case(login));
}

/// Both sides of the edge are written, the viewer's first. When the second
/// write fails the edge is left one-sided and the request still succeeds.
#[post("/follow-user", format = "application/json", data = "<request>")]
pub fn follow_user(
    viewer: &Viewer,
    state: &State<AppState>,
    request: Json<FollowRequest>,
) -> ApiResult<Json<FollowOutcome>> {
    let target = checked_login(&request.username)?;
    let follow = match request.action.as_str() {
        "follow" => true,
        "unfollow" => false,
        other => return Err(ApiError::bad_request(format!("Unknown action {other:?}"))),
    };
    if target.eq_ignore_ascii_case(viewer.login()) {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let repo = state.repo();
    let mut actor = own_profile(&repo, viewer)?;
    let mut followee = other_profile(&repo, state.github.as_ref(), &viewer.token, target)?;
    let target = followee.value.username.clone();

    let mut new_edge = false;
    if follow {
        add_login(&mut actor.value.following_list, &target);
        new_edge = add_login(&mut followee.value.followers_list, viewer.login());
    } else {
        remove_login(&mut actor.value.following_list, &target);
        remove_login(&mut followee.value.followers_list, viewer.login());
    }
    actor.value.recount();
    followee.value.recount();

    let verb = if follow { "follows" } else { "unfollows" };
    let message = format!("{} {verb} {target}", viewer.login());
    repo.save_profile(&actor, &message)?;

    let target_updated = match repo.save_profile(&followee, &message) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                actor = viewer.login(),
                target = %target,
                error = %e,
                "follow edge only written on the actor side"
            );
            false
        }
    };

    if new_edge && target_updated {
        notify(
            &repo,
            &target,
            NotificationKind::Follow,
            &viewer.actor(),
            json!({"username": viewer.login()}),
        );
    }

    Ok(Json(FollowOutcome {
        success: true,
        following: follow,
        followers: followee.value.followers,
        target_updated,
    }))
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;
    use rocket::http::Status;
    use serde_json::json;

    #[test]
    fn follow_and_unfollow_update_both_lists() {
        let h = Harness::new();
        let outcome = h.post_ok(
            "/api/follow-user",
            "octo",
            json!({"username": "ana", "action": "follow"}),
        );
        assert_eq!(outcome["followers"], 1);
        assert_eq!(outcome["targetUpdated"], true);

        let octo = h.store.get("users/octo.json").unwrap();
        let ana = h.store.get("users/ana.json").unwrap();
        assert_eq!(octo["followingList"], json!(["ana"]));
        assert_eq!(octo["following"], 1);
        assert_eq!(ana["followersList"], json!(["octo"]));

        // following twice does not duplicate the edge
        h.post_ok(
            "/api/follow-user",
            "octo",
            json!({"username": "ANA", "action": "follow"}),
        );
        assert_eq!(h.store.get("users/ana.json").unwrap()["followers"], 1);

        // and only the first follow is announced
        let notes = h.store.get("notifications/ana.json").unwrap();
        assert_eq!(notes.as_array().unwrap().len(), 1);
        assert_eq!(notes[0]["type"], "follow");

        h.post_ok(
            "/api/follow-user",
            "octo",
            json!({"username": "ana", "action": "unfollow"}),
        );
        assert_eq!(h.store.get("users/octo.json").unwrap()["followingList"], json!([]));
        assert_eq!(h.store.get("users/ana.json").unwrap()["followersList"], json!([]));
        assert_eq!(h.store.get("users/ana.json").unwrap()["followers"], 0);
    }

    #[test]
    fn failed_target_write_still_succeeds() {
        let h = Harness::new();
        h.store.fail_writes_to("users/ana.json");

        let outcome = h.post_ok(
            "/api/follow-user",
            "octo",
            json!({"username": "ana", "action": "follow"}),
        );
        assert_eq!(outcome["success"], true);
        assert_eq!(outcome["targetUpdated"], false);

        assert_eq!(h.store.get("users/octo.json").unwrap()["followingList"], json!(["ana"]));
        assert!(h.store.get("users/ana.json").is_none());
        assert!(h.store.get("notifications/ana.json").is_none());
    }

    #[test]
    fn follow_rejects_self_unknown_and_bad_actions() {
        let h = Harness::new();
        let cases = [
            (json!({"username": "octo", "action": "follow"}), Status::BadRequest),
            (json!({"username": "ana", "action": "block"}), Status::BadRequest),
            (json!({"username": "../x", "action": "follow"}), Status::BadRequest),
            (json!({"username": "ghost", "action": "follow"}), Status::NotFound),
        ];
        for (body, status) in cases {
            assert_eq!(h.post("/api/follow-user", "octo", body.clone()).status(), status, "{body}");
        }
        assert!(h.store.get("users/octo.json").is_none());
    }

    #[test]
    fn unknown_profiles_come_from_github_without_being_saved() {
        let h = Harness::new();
        let view = h.get_ok("/api/get-profile?username=bo", "octo");
        assert_eq!(view["profile"]["username"], "bo");
        assert_eq!(view["persisted"], false);
        assert_eq!(view["isFollowing"], false);
        assert!(h.store.get("users/bo.json").is_none());

        let response = h.get("/api/get-profile?username=ghost", "octo");
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn profile_shows_follow_state() {
        let h = Harness::new();
        h.post_ok(
            "/api/follow-user",
            "octo",
            json!({"username": "bo", "action": "follow"}),
        );
        let view = h.get_ok("/api/get-profile?username=bo", "octo");
        assert_eq!(view["persisted"], true);
        assert_eq!(view["isFollowing"], true);
        assert_eq!(view["profile"]["followers"], 1);
    }

    #[test]
    fn update_profile_edits_own_file() {
        let h = Harness::new();
        let profile = h.post_ok(
            "/api/update-profile",
            "octo",
            json!({"bio": " building things ", "location": "", "pinnedRepos": ["octo/tool"]}),
        );
        assert_eq!(profile["bio"], "building things");
        assert_eq!(profile["location"], json!(null));
        assert_eq!(profile["pinnedRepos"], json!(["octo/tool"]));
        assert_eq!(h.store.get("users/octo.json").unwrap()["bio"], "building things");

        let too_long = "x".repeat(crate::config::BIO_LIMIT + 1);
        let response = h.post("/api/update-profile", "octo", json!({"bio": too_long}));
        assert_eq!(response.status(), Status::BadRequest);

        let response = h.post(
            "/api/update-profile",
            "octo",
            json!({"pinnedRepos": ["a/1", "a/2", "a/3", "a/4", "a/5", "a/6", "a/7"]}),
        );
        assert_eq!(response.status(), Status::BadRequest);
    }
}
