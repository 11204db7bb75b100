use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn reply<T: Serialize>(status: StatusCode, data: T) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&ApiResponse::ok(data)), status)
}

fn rejection<E: Into<ApiRejection>>(error: E) -> warp::Rejection {
    reject::custom(error.into())
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: UserId,
    pub username: String,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        AccountView {
            id: account.id,
            username: account.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub from: String,
    pub to: String,
    pub created_at: DateTime<Utc>,
}

impl From<FriendRequest> for RequestView {
    fn from(request: FriendRequest) -> Self {
        RequestView {
            id: request.id,
            from: request.from.username,
            to: request.to.username,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// region accounts

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: UserId,
    pub username: String,
    pub auth_tokens: AuthTokens,
}

pub async fn signup(
    body: CredentialsRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        username: body.username,
        password: body.password,
    };
    let created = auth_service.signup(signup_input).await.map_err(rejection)?;

    let response = SignupResponse {
        user_id: created.account.id,
        username: created.account.username,
        auth_tokens: created.tokens,
    };
    Ok(reply(StatusCode::CREATED, response))
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub auth_tokens: AuthTokens,
}

pub async fn login(
    body: CredentialsRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let login_result = auth_service.login(login_input).await.map_err(rejection)?;

    let response = LoginResponse {
        user_id: login_result.user_id,
        auth_tokens: login_result.tokens,
    };
    Ok(reply(StatusCode::OK, response))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh_token(&body.refresh_token)
        .await
        .map_err(rejection)?;
    Ok(reply(StatusCode::OK, tokens))
}

pub async fn lookup_account(
    username: String,
    _user_id: UserId,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = user_service
        .resolve_username(&username)
        .await
        .map_err(rejection)?;
    let account = user_service.get_account(id).await.map_err(rejection)?;
    Ok(reply(StatusCode::OK, AccountView::from(account)))
}

// endregion

// region friends

/// `to_user` is a username.
#[derive(Debug, Deserialize)]
pub struct TargetUserRequest {
    pub to_user: String,
}

pub async fn list_friends(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let friends = relationship_service
        .list_friends(user_id)
        .await
        .map_err(rejection)?;

    let friends: Vec<AccountView> = friends.into_iter().map(AccountView::from).collect();
    Ok(reply(StatusCode::OK, friends))
}

pub async fn get_friend(
    other: UserId,
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let friend = relationship_service
        .get_friend(user_id, other)
        .await
        .map_err(rejection)?;
    Ok(reply(StatusCode::OK, AccountView::from(friend)))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: RelationshipStatus,
    pub message: String,
}

pub async fn relationship_status(
    other: UserId,
    user_id: UserId,
    user_service: Arc<dyn UserService>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let status = relationship_service
        .relationship_status(user_id, other)
        .await
        .map_err(rejection)?;
    let other = user_service.get_account(other).await.map_err(rejection)?;

    let response = StatusResponse {
        status,
        message: status.message(&other.username),
    };
    Ok(reply(StatusCode::OK, response))
}

pub async fn remove_friend(
    user_id: UserId,
    body: TargetUserRequest,
    user_service: Arc<dyn UserService>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let other = user_service
        .resolve_username(&body.to_user)
        .await
        .map_err(rejection)?;
    relationship_service
        .remove_friend(user_id, other)
        .await
        .map_err(rejection)?;
    Ok(reply(
        StatusCode::OK,
        MessageResponse {
            message: "Friend removed",
        },
    ))
}

pub async fn remove_all_friends(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = relationship_service
        .remove_all_friends(user_id)
        .await
        .map_err(rejection)?;
    Ok(reply(StatusCode::OK, CountResponse { count }))
}

// endregion

// region requests

pub async fn list_outgoing_requests(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let requests = relationship_service
        .list_outgoing_requests(user_id)
        .await
        .map_err(rejection)?;

    let requests: Vec<RequestView> = requests.into_iter().map(RequestView::from).collect();
    Ok(reply(StatusCode::OK, requests))
}

pub async fn list_incoming_requests(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let requests = relationship_service
        .list_incoming_requests(user_id)
        .await
        .map_err(rejection)?;

    let requests: Vec<RequestView> = requests.into_iter().map(RequestView::from).collect();
    Ok(reply(StatusCode::OK, requests))
}

#[derive(Debug, Serialize)]
pub struct SendRequestResponse {
    /// Absent when the request resolved straight into a friendship.
    pub id: Option<RequestId>,
    pub from: String,
    pub to: String,
    pub befriended: bool,
}

pub async fn send_request(
    user_id: UserId,
    body: TargetUserRequest,
    user_service: Arc<dyn UserService>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let to = user_service
        .resolve_username(&body.to_user)
        .await
        .map_err(rejection)?;
    let outcome = relationship_service
        .send_friend_request(user_id, to)
        .await
        .map_err(rejection)?;

    let response = match outcome {
        RequestOutcome::Pending(request) => SendRequestResponse {
            id: Some(request.id),
            from: request.from.username,
            to: request.to.username,
            befriended: false,
        },
        RequestOutcome::Befriended => {
            let me = user_service.get_account(user_id).await.map_err(rejection)?;
            debug!(from = %me, to = %body.to_user, "request answered a pending one");
            SendRequestResponse {
                id: None,
                from: me.username,
                to: body.to_user,
                befriended: true,
            }
        }
    };
    Ok(reply(StatusCode::CREATED, response))
}

pub async fn cancel_request(
    user_id: UserId,
    body: TargetUserRequest,
    user_service: Arc<dyn UserService>,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let to = user_service
        .resolve_username(&body.to_user)
        .await
        .map_err(rejection)?;
    relationship_service
        .cancel_friend_request(user_id, to)
        .await
        .map_err(rejection)?;
    Ok(reply(
        StatusCode::OK,
        MessageResponse {
            message: "Friend request canceled",
        },
    ))
}

pub async fn cancel_all_requests(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = relationship_service
        .cancel_all_friend_requests(user_id)
        .await
        .map_err(rejection)?;
    Ok(reply(StatusCode::OK, CountResponse { count }))
}

/// `id` is the sender's account id.
#[derive(Debug, Deserialize)]
pub struct SenderRequest {
    pub id: UserId,
}

pub async fn accept_request(
    user_id: UserId,
    body: SenderRequest,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    relationship_service
        .accept_friend_request(user_id, body.id)
        .await
        .map_err(rejection)?;
    Ok(reply(
        StatusCode::CREATED,
        MessageResponse {
            message: "Friend request accepted",
        },
    ))
}

pub async fn accept_all_requests(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = relationship_service
        .accept_all_friend_requests(user_id)
        .await
        .map_err(rejection)?;
    Ok(reply(StatusCode::CREATED, CountResponse { count }))
}

pub async fn reject_request(
    user_id: UserId,
    body: SenderRequest,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    relationship_service
        .reject_friend_request(user_id, body.id)
        .await
        .map_err(rejection)?;
    Ok(reply(
        StatusCode::CREATED,
        MessageResponse {
            message: "Friend request rejected",
        },
    ))
}

pub async fn reject_all_requests(
    user_id: UserId,
    relationship_service: Arc<dyn RelationshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = relationship_service
        .reject_all_friend_requests(user_id)
        .await
        .map_err(rejection)?;
    Ok(reply(StatusCode::OK, CountResponse { count }))
}

// endregion
