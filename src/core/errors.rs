use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot follow yourself")]
    SelfFollow,

    #[error("Already following this user")]
    AlreadyFollowing,

    #[error("Not following this user")]
    NotFollowing,

    #[error("Post already liked")]
    AlreadyLiked,

    #[error("Post not liked")]
    NotLiked,

    #[error("Forbidden")]
    Forbidden,

    #[error("Account does not support this sign-in method")]
    UnsupportedMethod,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Token expired")]
    Expired,

    #[error("Malformed token")]
    Malformed,

    #[error("Token revoked")]
    Revoked,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Idempotency violations: the state is already what the caller asked for.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ApiError::AlreadyFollowing
                | ApiError::NotFollowing
                | ApiError::AlreadyLiked
                | ApiError::NotLiked
        )
    }

    /// Failures that mean the caller must authenticate again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized
                | ApiError::InvalidCredentials
                | ApiError::Expired
                | ApiError::Malformed
                | ApiError::Revoked
        )
    }

    /// Message safe to show the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            ApiError::InvalidInput(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::SelfFollow => "self_follow",
            ApiError::AlreadyFollowing => "already_following",
            ApiError::NotFollowing => "not_following",
            ApiError::AlreadyLiked => "already_liked",
            ApiError::NotLiked => "not_liked",
            ApiError::Forbidden => "forbidden",
            ApiError::UnsupportedMethod => "unsupported_method",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Expired => "token_expired",
            ApiError::Malformed => "token_malformed",
            ApiError::Revoked => "token_revoked",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::SelfFollow => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::Unauthorized
            | ApiError::Expired
            | ApiError::Malformed
            | ApiError::Revoked => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_)
            | ApiError::AlreadyFollowing
            | ApiError::NotFollowing
            | ApiError::AlreadyLiked
            | ApiError::NotLiked => StatusCode::CONFLICT,
            ApiError::UnsupportedMethod => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Internal(detail) => tracing::error!(error = %detail, "request failed"),
            e if e.is_soft() => tracing::debug!(error = %e, "soft failure"),
            e if e.is_auth_failure() => tracing::warn!(error = %e, "authentication failed"),
            e => tracing::info!(error = %e, "request rejected"),
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.public_message(),
            "kind": self.kind(),
        }))
    }
}

// Infrastructure failures never carry a client-facing meaning.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
