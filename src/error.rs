use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::json::Json,
    Request,
};
use serde_json::json;
use thiserror::Error;

use crate::{github::GithubError, store::StoreError};

/// Everything a handler can fail with. Renders as `{"message": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Slow down, try again in {0}s")]
    RateLimited(u64),
    #[error("GitHub request failed")]
    Upstream(#[source] GithubError),
    #[error("Internal error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::RateLimited(_) => Status::TooManyRequests,
            ApiError::Upstream(_) => Status::BadGateway,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { path } => ApiError::Conflict(format!(
                "{path} was changed by someone else, please retry"
            )),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<GithubError> for ApiError {
    fn from(error: GithubError) -> Self {
        match error {
            GithubError::Unauthorized => ApiError::Unauthorized,
            GithubError::NotFound => ApiError::NotFound("GitHub resource".into()),
            GithubError::NotConfigured => ApiError::Internal(error.to_string()),
            other => ApiError::Upstream(other),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => {
                tracing::error!(uri = %request.uri(), %detail, "request failed")
            }
            ApiError::Upstream(source) => {
                tracing::warn!(uri = %request.uri(), %source, "GitHub request failed")
            }
            _ => tracing::debug!(uri = %request.uri(), %status, "request rejected"),
        }

        let mut body = json!({"message": self.to_string()});
        if let ApiError::RateLimited(seconds) = &self {
            body["retryAfter"] = json!(*seconds);
        }

        status::Custom(status, Json(body)).respond_to(request)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_become_409() {
        let error: ApiError = StoreError::Conflict {
            path: "users/octo.json".into(),
        }
        .into();
        assert_eq!(error.status(), Status::Conflict);
    }

    #[test]
    fn internal_details_stay_private() {
        let error: ApiError = StoreError::Status {
            path: "users/octo.json".into(),
            status: 500,
        }
        .into();
        assert_eq!(error.to_string(), "Internal error");
    }

    #[test]
    fn missing_oauth_app_is_a_server_error() {
        let error: ApiError = GithubError::NotConfigured.into();
        assert_eq!(error.status(), Status::InternalServerError);
    }
}
