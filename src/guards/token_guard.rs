use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};

use crate::{data::Actor, github::GithubError, state::AppState, structs::GithubUser};

/// The caller, identified by the GitHub token in `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub token: String,
    pub user: GithubUser,
}

impl Viewer {
    pub fn login(&self) -> &str {
        &self.user.login
    }

    pub fn actor(&self) -> Actor {
        self.user.actor()
    }
}

pub fn bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn from_request(request: &Request<'_>) -> Option<Viewer> {
    let token = bearer(request.headers().get_one("Authorization")?)?;
    let state = request.rocket().state::<AppState>()?;

    match state.github.viewer(token) {
        Ok(user) => Some(Viewer {
            token: token.to_string(),
            user,
        }),
        Err(GithubError::Unauthorized) => None,
        Err(e) => {
            tracing::warn!(error = %e, "could not verify bearer token");
            None
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r Viewer {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cache = request.local_cache(|| from_request(request));

        match cache {
            Some(viewer) => Outcome::Success(viewer),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_headers() {
        assert_eq!(bearer("Bearer abc"), Some("abc"));
        assert_eq!(bearer("bearer  abc "), Some("abc"));
        assert_eq!(bearer("Basic abc"), None);
        assert_eq!(bearer("Bearer "), None);
        assert_eq!(bearer("abc"), None);
    }
}
