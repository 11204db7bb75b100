use super::{FriendshipLedger, RequestLedger};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;

pub struct RealRelationshipService {
    accounts: Arc<dyn AccountRepo>,
    requests: RequestLedger,
    friendships: FriendshipLedger,
    tx_manager: Arc<dyn TxManager>,
}

impl RealRelationshipService {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        requests: RequestLedger,
        friendships: FriendshipLedger,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            accounts,
            requests,
            friendships,
            tx_manager,
        }
    }

    async fn begin(&self) -> Result<Box<dyn StorageTx<'_> + '_>, RelationError> {
        self.tx_manager
            .begin()
            .await
            .map_err(|e| RelationError::Store(e.to_string()))
    }

    async fn require_account(
        &self,
        tx: &mut dyn StorageTx<'_>,
        user_id: UserId,
    ) -> Result<Account, RelationError> {
        self.accounts
            .get_in_tx(tx, user_id)
            .await?
            .ok_or(RelationError::UserNotFound)
    }
}

async fn commit(tx: Box<dyn StorageTx<'_> + '_>) -> Result<(), RelationError> {
    tx.commit()
        .await
        .map_err(|e| RelationError::Store(e.to_string()))
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn send_friend_request(
        &self,
        me: UserId,
        to: UserId,
    ) -> Result<RequestOutcome, RelationError> {
        debug!(%me, %to, "send friend request");
        let mut tx = self.begin().await?;
        let outcome = self.requests.create(&mut *tx, me, to).await?;
        commit(tx).await?;
        Ok(outcome)
    }

    async fn cancel_friend_request(&self, me: UserId, to: UserId) -> Result<(), RelationError> {
        debug!(%me, %to, "cancel friend request");
        let mut tx = self.begin().await?;
        self.requests.remove(&mut *tx, me, to).await?;
        commit(tx).await
    }

    async fn cancel_all_friend_requests(&self, me: UserId) -> Result<u64, RelationError> {
        let mut tx = self.begin().await?;
        let canceled = self
            .requests
            .remove_all(&mut *tx, RequestFilter::from_user(me))
            .await?;
        commit(tx).await?;
        debug!(%me, canceled, "canceled all outgoing friend requests");
        Ok(canceled)
    }

    async fn accept_friend_request(&self, me: UserId, from: UserId) -> Result<(), RelationError> {
        let mut tx = self.begin().await?;
        self.requests.accept(&mut *tx, from, me).await?;
        commit(tx).await?;
        info!(%me, %from, "friend request accepted");
        Ok(())
    }

    async fn accept_all_friend_requests(&self, me: UserId) -> Result<u64, RelationError> {
        let mut tx = self.begin().await?;
        let accepted = self.requests.accept_all(&mut *tx, me).await?;
        commit(tx).await?;
        info!(%me, accepted, "accepted all incoming friend requests");
        Ok(accepted)
    }

    async fn reject_friend_request(&self, me: UserId, from: UserId) -> Result<(), RelationError> {
        debug!(%me, %from, "reject friend request");
        let mut tx = self.begin().await?;
        self.requests.remove(&mut *tx, from, me).await?;
        commit(tx).await
    }

    async fn reject_all_friend_requests(&self, me: UserId) -> Result<u64, RelationError> {
        let mut tx = self.begin().await?;
        let rejected = self
            .requests
            .remove_all(&mut *tx, RequestFilter::to_user(me))
            .await?;
        commit(tx).await?;
        debug!(%me, rejected, "rejected all incoming friend requests");
        Ok(rejected)
    }

    async fn remove_friend(&self, me: UserId, other: UserId) -> Result<(), RelationError> {
        let mut tx = self.begin().await?;
        // not being friends is fine; the call is idempotent
        let removed = self.friendships.remove_pair(&mut *tx, me, other).await?;
        commit(tx).await?;
        debug!(%me, %other, removed, "remove friend");
        Ok(())
    }

    async fn remove_all_friends(&self, me: UserId) -> Result<u64, RelationError> {
        let mut tx = self.begin().await?;
        let removed = self.friendships.remove_all_for(&mut *tx, me).await?;
        commit(tx).await?;
        debug!(%me, removed, "removed all friends");
        Ok(removed)
    }

    async fn list_friends(&self, me: UserId) -> Result<Vec<Account>, RelationError> {
        let mut tx = self.begin().await?;
        let friends = self.friendships.list_friends_of(&mut *tx, me).await?;
        commit(tx).await?;
        Ok(friends)
    }

    async fn get_friend(&self, me: UserId, other: UserId) -> Result<Account, RelationError> {
        let mut tx = self.begin().await?;
        let account = self.require_account(&mut *tx, other).await?;
        if !self.friendships.are_friends(&mut *tx, me, other).await? {
            return Err(RelationError::NotFriends);
        }
        commit(tx).await?;
        Ok(account)
    }

    async fn list_outgoing_requests(
        &self,
        me: UserId,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        let mut tx = self.begin().await?;
        let requests = self.requests.list_by_sender(&mut *tx, me).await?;
        commit(tx).await?;
        Ok(requests)
    }

    async fn list_incoming_requests(
        &self,
        me: UserId,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        let mut tx = self.begin().await?;
        let requests = self.requests.list_by_receiver(&mut *tx, me).await?;
        commit(tx).await?;
        Ok(requests)
    }

    async fn relationship_status(
        &self,
        me: UserId,
        other: UserId,
    ) -> Result<RelationshipStatus, RelationError> {
        let mut tx = self.begin().await?;
        self.require_account(&mut *tx, other).await?;

        let status = if self.friendships.are_friends(&mut *tx, me, other).await? {
            RelationshipStatus::Friends
        } else if self.requests.find(&mut *tx, me, other).await?.is_some() {
            RelationshipStatus::OutgoingPending
        } else if self.requests.find(&mut *tx, other, me).await?.is_some() {
            RelationshipStatus::IncomingPending
        } else {
            RelationshipStatus::None
        };

        commit(tx).await?;
        Ok(status)
    }
}
