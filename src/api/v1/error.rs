use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(rejection) = err.find::<ApiRejection>() {
        (rejection.code, rejection.message.clone())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        (ApiErrorCode::InvalidToken, e.to_string())
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::MethodNotAllowed.to_string(),
        )
    } else {
        (
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
        )
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid request")]
    InvalidInput,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("User not found")]
    UserNotFound,
    #[error("You can't send a friend request to yourself")]
    SelfRequest,
    #[error("You are already friends")]
    AlreadyFriends,
    #[error("You have already submitted a request")]
    DuplicateRequest,
    #[error("Friend request not found")]
    RequestNotFound,
    #[error("You don't have any friend requests")]
    NoRequestsFound,
    #[error("Friend relationship not found for user")]
    NotFriends,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidInput
            | ApiErrorCode::SelfRequest
            | ApiErrorCode::NoRequestsFound
            | ApiErrorCode::NotFriends => StatusCode::BAD_REQUEST,
            ApiErrorCode::UsernameTaken
            | ApiErrorCode::AlreadyFriends
            | ApiErrorCode::DuplicateRequest => StatusCode::CONFLICT,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::UserNotFound | ApiErrorCode::RequestNotFound | ApiErrorCode::NotFound => {
                StatusCode::NOT_FOUND
            }
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The rejection handlers raise: a code plus the message shown to the client,
/// which is the code's text unless the error carries its own detail.
#[derive(Debug)]
pub struct ApiRejection {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiRejection {
    pub fn new(code: ApiErrorCode) -> Self {
        ApiRejection {
            code,
            message: code.to_string(),
        }
    }
}

impl reject::Reject for ApiRejection {}

impl From<ApiErrorCode> for ApiRejection {
    fn from(code: ApiErrorCode) -> Self {
        ApiRejection::new(code)
    }
}

impl From<AuthError> for ApiRejection {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(detail) => ApiRejection {
                code: ApiErrorCode::InvalidInput,
                message: detail,
            },
            other => ApiRejection::new(other.into()),
        }
    }
}

impl From<RelationError> for ApiRejection {
    fn from(error: RelationError) -> Self {
        ApiRejection::new(error.into())
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::DuplicateUsername => ApiErrorCode::UsernameTaken,
            AuthError::InvalidInput(_) => ApiErrorCode::InvalidInput,
            AuthError::UserNotFound => ApiErrorCode::UserNotFound,
            AuthError::TokenInvalid => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<RelationError> for ApiErrorCode {
    fn from(error: RelationError) -> Self {
        match error {
            RelationError::UserNotFound => ApiErrorCode::UserNotFound,
            RelationError::SelfRequest => ApiErrorCode::SelfRequest,
            RelationError::AlreadyFriends => ApiErrorCode::AlreadyFriends,
            RelationError::DuplicateRequest => ApiErrorCode::DuplicateRequest,
            RelationError::RequestNotFound => ApiErrorCode::RequestNotFound,
            RelationError::NoRequestsFound => ApiErrorCode::NoRequestsFound,
            RelationError::NotFriends => ApiErrorCode::NotFriends,
            RelationError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}
