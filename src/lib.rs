#[macro_use]
extern crate rocket;

pub mod config;
pub mod data;
pub mod error;
pub mod github;
pub mod guards;
pub mod notify;
pub mod queues;
pub mod routes;
pub mod shards;
pub mod state;
pub mod store;
pub mod structs;

#[cfg(test)]
mod testing;

use rocket::http::Method;
use rocket::serde::json::{json, Json, Value};
use rocket::{Build, Request, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use rocket_governor::rocket_governor_catcher;

use routes::{admin, auth, comments, notifications, posts, repos, root, trending, users};
use state::AppState;

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

#[catch(400)]
fn bad_request() -> Json<Value> {
    message("Bad Request")
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    message("Unauthorized")
}

#[catch(403)]
fn forbidden() -> Json<Value> {
    message("Forbidden")
}

#[catch(404)]
fn not_found() -> Json<Value> {
    message("Not Found")
}

#[catch(409)]
fn conflict() -> Json<Value> {
    message("Conflict")
}

#[catch(422)]
fn unprocessable(request: &Request<'_>) -> Json<Value> {
    tracing::debug!(uri = %request.uri(), "unreadable request body");
    message("Malformed request body")
}

#[catch(500)]
fn internal_error() -> Json<Value> {
    message("Internal error")
}

/// Builds the Rocket instance around `state`, ready to be launched or tested.
pub fn app(state: AppState) -> Result<Rocket<Build>, rocket_cors::Error> {
    let cors = CorsOptions {
        allowed_origins: AllowedOrigins::some_exact(&state.config.allowed_origins),
        allowed_methods: vec![Method::Get, Method::Post]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::some(&[
            "Authorization",
            "Accept",
            "Admin-Key",
            "Content-Type",
        ]),
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    Ok(rocket::build()
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                conflict,
                unprocessable,
                internal_error,
                rocket_governor_catcher
            ],
        )
        .manage(state)
        .mount("/", routes![root::index])
        .mount(
            "/api",
            routes![
                auth::auth_login,
                auth::auth_callback,
                posts::create_post,
                posts::manage_post,
                posts::get_post,
                posts::get_feed,
                comments::add_comment,
                users::get_profile,
                users::update_profile,
                users::follow_user,
                notifications::get_notifications,
                notifications::mark_read,
                trending::track_trending,
                trending::get_trending,
                repos::search_repos,
                repos::get_repos,
                repos::get_gists,
                repos::get_forks,
                admin::migrate_shards,
            ],
        )
        .attach(cors))
}
