use rand::Rng;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::Redirect;
use rocket::State;
use rocket_governor::RocketGovernor;

use crate::config::{Config, GITHUB_OAUTH_URL, OAUTH_SCOPES, OAUTH_STATE_COOKIE};
use crate::error::{ApiError, ApiResult};
use crate::github::GithubError;
use crate::guards::limit_guard::TenPerSecond;
use crate::queues::audit_queue::{send_audit, AuditCategory, AuditLog};
use crate::state::AppState;
use crate::store::wrapper::Versioned;

fn oauth_app(config: &Config) -> ApiResult<()> {
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        return Err(GithubError::NotConfigured.into());
    }
    Ok(())
}

/// Sends the browser to GitHub's consent page.
#[get("/auth-login")]
pub fn auth_login(
    _limit: RocketGovernor<'_, TenPerSecond>,
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
) -> ApiResult<Redirect> {
    oauth_app(&state.config)?;

    let oauth_state = hex::encode(rand::thread_rng().gen::<[u8; 16]>());
    let authorize = url::Url::parse_with_params(
        &format!("{GITHUB_OAUTH_URL}/login/oauth/authorize"),
        &[
            ("client_id", state.config.client_id.as_str()),
            ("scope", OAUTH_SCOPES),
            ("state", oauth_state.as_str()),
        ],
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    cookies.add(
        Cookie::build((OAUTH_STATE_COOKIE, oauth_state))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/"),
    );
    Ok(Redirect::to(authorize.to_string()))
}

/// Finishes the OAuth dance and hands the token to the frontend in the URL fragment.
#[get("/auth-callback?<code>&<state>")]
pub fn auth_callback(
    _limit: RocketGovernor<'_, TenPerSecond>,
    app: &State<AppState>,
    cookies: &CookieJar<'_>,
    code: &str,
    state: &str,
) -> ApiResult<Redirect> {
    let expected = cookies.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected.as_deref() != Some(state) {
        return Err(ApiError::bad_request("OAuth state does not match"));
    }
    cookies.remove(Cookie::build(OAUTH_STATE_COOKIE).path("/"));
    oauth_app(&app.config)?;

    let token = match app.github.exchange_code(code) {
        Ok(token) => token,
        Err(GithubError::OAuth(reason)) => {
            tracing::info!(%reason, "oauth code rejected");
            return Err(ApiError::bad_request("GitHub did not accept the login code"));
        }
        Err(e) => return Err(e.into()),
    };
    let user = app.github.viewer(&token)?;

    let repo = app.repo();
    if repo.profile(&user.login)?.is_none() {
        let profile = Versioned {
            value: user.profile(),
            sha: None,
        };
        repo.save_profile(&profile, &format!("Create profile for {}", user.login))?;
        send_audit(
            app.config.logging_webhook.as_deref(),
            AuditLog {
                culprit: user.login.clone(),
                category: AuditCategory::User,
                description: format!("{} joined", user.login),
            },
        );
    }

    let token: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    let app_url = app.config.app_url.trim_end_matches('/');
    Ok(Redirect::to(format!("{app_url}/#token={token}")))
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, OAUTH_STATE_COOKIE};
    use crate::github::GithubClient;
    use crate::testing::Harness;
    use rocket::http::{Cookie, Status};
    use std::net::SocketAddr;
    use std::time::Duration;

    fn remote() -> SocketAddr {
        "127.0.0.1:8000".parse().unwrap()
    }

    fn harness() -> Harness {
        let config = Config {
            client_id: "client-123".into(),
            client_secret: "secret-456".into(),
            ..Config::local()
        };
        Harness::with(config, Duration::ZERO)
    }

    #[test]
    fn login_redirects_with_state_cookie() {
        let h = harness();
        let response = h.client.get("/api/auth-login").remote(remote()).dispatch();
        assert_eq!(response.status(), Status::SeeOther);

        let state = response.cookies().get(OAUTH_STATE_COOKIE).unwrap().value().to_string();
        assert_eq!(state.len(), 32);

        let location = response.headers().get_one("Location").unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(location.contains("client_id=client-123"));
        assert!(location.contains(&format!("state={state}")));
        assert!(location.contains("scope=read%3Auser+public_repo+gist"));
    }

    #[test]
    fn login_without_oauth_app_fails() {
        let h = Harness::new();
        let response = h.client.get("/api/auth-login").remote(remote()).dispatch();
        assert_eq!(response.status(), Status::InternalServerError);

        // an id alone is not enough to finish the exchange
        let config = Config {
            client_id: "client-123".into(),
            ..Config::local()
        };
        let h = Harness::with(config, Duration::ZERO);
        let response = h.client.get("/api/auth-login").remote(remote()).dispatch();
        assert_eq!(response.status(), Status::InternalServerError);
    }

    #[test]
    fn callback_without_oauth_app_is_a_server_error() {
        let config = Config::local();
        let github = Box::new(GithubClient::new(&config));
        let h = Harness::with_github(config, Duration::ZERO, github);
        let response = h
            .client
            .get("/api/auth-callback?code=x&state=abc")
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, "abc"))
            .remote(remote())
            .dispatch();
        assert_eq!(response.status(), Status::InternalServerError);
        assert!(h.store.get("users/cleo.json").is_none());
    }

    #[test]
    fn callback_creates_profile_and_hands_over_token() {
        let h = harness();
        let response = h
            .client
            .get("/api/auth-callback?code=good&state=abc")
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, "abc"))
            .remote(remote())
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(
            response.headers().get_one("Location"),
            Some("http://localhost:3000/#token=tok-cleo")
        );
        assert_eq!(h.store.get("users/cleo.json").unwrap()["username"], "cleo");
    }

    #[test]
    fn callback_rejects_mismatched_state_and_bad_codes() {
        let h = harness();
        let response = h
            .client
            .get("/api/auth-callback?code=good&state=abc")
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, "other"))
            .remote(remote())
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);

        let response = h
            .client
            .get("/api/auth-callback?code=stale&state=abc")
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, "abc"))
            .remote(remote())
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        assert!(h.store.get("users/cleo.json").is_none());
    }
}
