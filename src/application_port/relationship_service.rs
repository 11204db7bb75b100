use crate::application_port::AuthError;
use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("user not found")]
    UserNotFound,
    #[error("you can't send a friend request to yourself")]
    SelfRequest,
    #[error("you are already friends")]
    AlreadyFriends,
    #[error("you have already submitted a request")]
    DuplicateRequest,
    #[error("friend request not found")]
    RequestNotFound,
    #[error("you don't have any friend requests")]
    NoRequestsFound,
    #[error("friend relationship not found for user")]
    NotFriends,
    #[error("store error: {0}")]
    Store(String),
}

// account lookups go through the auth-side repo
impl From<AuthError> for RelationError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::UserNotFound => RelationError::UserNotFound,
            other => RelationError::Store(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// The request is waiting for the receiver.
    Pending(FriendRequest),
    /// The receiver had already asked; both are friends now.
    Befriended,
}

#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    async fn send_friend_request(
        &self,
        me: UserId,
        to: UserId,
    ) -> Result<RequestOutcome, RelationError>;
    async fn cancel_friend_request(&self, me: UserId, to: UserId) -> Result<(), RelationError>;
    async fn cancel_all_friend_requests(&self, me: UserId) -> Result<u64, RelationError>;
    async fn accept_friend_request(&self, me: UserId, from: UserId) -> Result<(), RelationError>;
    async fn accept_all_friend_requests(&self, me: UserId) -> Result<u64, RelationError>;
    async fn reject_friend_request(&self, me: UserId, from: UserId) -> Result<(), RelationError>;
    async fn reject_all_friend_requests(&self, me: UserId) -> Result<u64, RelationError>;
    async fn remove_friend(&self, me: UserId, other: UserId) -> Result<(), RelationError>;
    async fn remove_all_friends(&self, me: UserId) -> Result<u64, RelationError>;
    async fn list_friends(&self, me: UserId) -> Result<Vec<Account>, RelationError>;
    async fn get_friend(&self, me: UserId, other: UserId) -> Result<Account, RelationError>;
    async fn list_outgoing_requests(&self, me: UserId)
    -> Result<Vec<FriendRequest>, RelationError>;
    async fn list_incoming_requests(&self, me: UserId)
    -> Result<Vec<FriendRequest>, RelationError>;
    async fn relationship_status(
        &self,
        me: UserId,
        other: UserId,
    ) -> Result<RelationshipStatus, RelationError>;
}
