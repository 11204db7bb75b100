use crate::domain_model::{Account, FriendshipId, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A pending, directed proposal. Both endpoints are embedded so listings can
/// be rendered without another lookup.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FriendRequest {
    pub id: RequestId,
    pub from: Account,
    pub to: Account,
    pub created_at: DateTime<Utc>,
}

/// One directed half of a friendship: `from` considers `to` a friend.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Friendship {
    pub id: FriendshipId,
    pub from: UserId,
    pub to: UserId,
    pub created_at: DateTime<Utc>,
}

/// Row filter shared by the request and friendship tables. `None` matches any.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct RequestFilter {
    pub from: Option<UserId>,
    pub to: Option<UserId>,
}

impl RequestFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn pair(from: UserId, to: UserId) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn from_user(from: UserId) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn to_user(to: UserId) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    pub fn matches(&self, from: UserId, to: UserId) -> bool {
        self.from.is_none_or(|f| f == from) && self.to.is_none_or(|t| t == to)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Friends,
    OutgoingPending,
    IncomingPending,
    None,
}

impl RelationshipStatus {
    pub fn message(&self, other: &str) -> String {
        match self {
            RelationshipStatus::Friends => format!("You are friends with {other}"),
            RelationshipStatus::OutgoingPending => "There is an outgoing friend request".to_owned(),
            RelationshipStatus::IncomingPending => "There is an incoming friend request".to_owned(),
            RelationshipStatus::None => "Nothing".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_on_given_endpoints_only() {
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();

        assert!(RequestFilter::any().matches(a, b));
        assert!(RequestFilter::from_user(a).matches(a, c));
        assert!(!RequestFilter::from_user(a).matches(b, a));
        assert!(RequestFilter::to_user(b).matches(c, b));
        assert!(RequestFilter::pair(a, b).matches(a, b));
        assert!(!RequestFilter::pair(a, b).matches(b, a));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&RelationshipStatus::OutgoingPending).unwrap();
        assert_eq!(json, "\"outgoing_pending\"");
        assert_eq!(
            RelationshipStatus::Friends.message("bob"),
            "You are friends with bob"
        );
        assert_eq!(RelationshipStatus::None.message("bob"), "Nothing");
    }
}
