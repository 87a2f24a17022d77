use rocket::serde::json::Json;
use serde::Serialize;

use crate::config::{start_time, version};

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    start_time: &'static str,
    version: &'static str,
}

#[get("/")]
pub fn index() -> Json<ServerInfo> {
    Json(ServerInfo {
        start_time: start_time(),
        version: version(),
    })
}
