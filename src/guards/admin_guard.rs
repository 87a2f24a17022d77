use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

use crate::state::AppState;

/// Passes when the `Admin-Key` header matches the configured key.
pub struct AdminToken;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let expected = request
            .rocket()
            .state::<AppState>()
            .and_then(|state| state.config.admin_key.as_deref());
        let token = request.headers().get_one("Admin-Key");

        match (token, expected) {
            (Some(token), Some(expected)) if token == expected => Outcome::Success(AdminToken),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
