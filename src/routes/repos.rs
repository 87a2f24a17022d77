use rocket::{serde::json::Json, State};

use crate::{
    data::is_full_name,
    error::{ApiError, ApiResult},
    guards::token_guard::Viewer,
    routes::users::checked_login,
    state::AppState,
    structs::{GistSummary, RepoSummary, SearchResults},
};

#[get("/search-repos?<q>&<page>")]
pub fn search_repos(
    viewer: &Viewer,
    state: &State<AppState>,
    q: &str,
    page: Option<u32>,
) -> ApiResult<Json<SearchResults>> {
    let query = q.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search query is empty"));
    }
    let page = page.unwrap_or(1).max(1);
    Ok(Json(state.github.search_repos(&viewer.token, query, page)?))
}

#[get("/get-repos?<username>&<pinned>")]
pub fn get_repos(
    viewer: &Viewer,
    state: &State<AppState>,
    username: Option<&str>,
    pinned: Option<bool>,
) -> ApiResult<Json<Vec<RepoSummary>>> {
    let username = username.map(checked_login).transpose()?;

    let repos = if pinned.unwrap_or(false) {
        let login = username.unwrap_or(viewer.login());
        state.github.pinned_repos(&viewer.token, login)?
    } else {
        state.github.repos(&viewer.token, username)?
    };
    Ok(Json(repos))
}

#[get("/get-gists?<username>")]
pub fn get_gists(
    viewer: &Viewer,
    state: &State<AppState>,
    username: Option<&str>,
) -> ApiResult<Json<Vec<GistSummary>>> {
    let username = username.map(checked_login).transpose()?;
    Ok(Json(state.github.gists(&viewer.token, username)?))
}

#[get("/get-forks?<repo>")]
pub fn get_forks(
    viewer: &Viewer,
    state: &State<AppState>,
    repo: &str,
) -> ApiResult<Json<Vec<RepoSummary>>> {
    let repo = repo.trim();
    if !is_full_name(repo) {
        return Err(ApiError::bad_request("Repository must be owner/name"));
    }
    Ok(Json(state.github.forks(&viewer.token, repo)?))
}
