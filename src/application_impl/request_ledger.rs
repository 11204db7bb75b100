use super::FriendshipLedger;
use crate::application_port::{RelationError, RequestOutcome};
use crate::domain_model::*;
use crate::domain_port::{AccountRepo, FriendRequestRepo, StorageTx};
use crate::logger::*;
use std::sync::Arc;

/// Pending, directed friend requests.
///
/// Every mutation of the requests between two accounts first takes the pair
/// lock (both account rows, lower id first). Two requests racing in opposite
/// directions therefore run one after the other, and the second one sees the
/// first one's row.
#[derive(Clone)]
pub struct RequestLedger {
    accounts: Arc<dyn AccountRepo>,
    requests: Arc<dyn FriendRequestRepo>,
    friendships: FriendshipLedger,
}

impl RequestLedger {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        requests: Arc<dyn FriendRequestRepo>,
        friendships: FriendshipLedger,
    ) -> Self {
        Self {
            accounts,
            requests,
            friendships,
        }
    }

    /// Locks the pair and checks that both accounts exist.
    async fn lock_pair(
        &self,
        tx: &mut dyn StorageTx<'_>,
        a: UserId,
        b: UserId,
    ) -> Result<(), RelationError> {
        let pair = UserPair::new(a, b);
        let expected = if pair.is_same() { 1 } else { 2 };
        let found = self.accounts.lock_pair_in_tx(tx, pair).await?;
        if found < expected {
            return Err(RelationError::UserNotFound);
        }
        Ok(())
    }

    /// Sends a request from `from` to `to`.
    ///
    /// Runs in two steps on the caller's transaction:
    /// 1. take the pair lock, which also proves both accounts exist;
    /// 2. reject self, existing friendship and duplicate requests, then
    ///    either insert the request or, when `to` has already asked `from`,
    ///    create the friendship and drop the reciprocal request instead.
    pub async fn create(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<RequestOutcome, RelationError> {
        if from == to {
            return Err(RelationError::SelfRequest);
        }

        self.lock_pair(&mut *tx, from, to).await?;

        if self.friendships.are_friends(&mut *tx, from, to).await? {
            return Err(RelationError::AlreadyFriends);
        }
        if self.requests.exists_in_tx(&mut *tx, from, to).await? {
            return Err(RelationError::DuplicateRequest);
        }

        if self.requests.exists_in_tx(&mut *tx, to, from).await? {
            self.friendships.create_pair(&mut *tx, from, to).await?;
            self.requests
                .delete_in_tx(&mut *tx, RequestFilter::pair(to, from))
                .await?;
            info!(%from, %to, "mutual friend requests resolved into a friendship");
            return Ok(RequestOutcome::Befriended);
        }

        self.requests
            .insert_in_tx(&mut *tx, RequestId::new(), from, to)
            .await?;
        let request = self
            .find(&mut *tx, from, to)
            .await?
            .ok_or_else(|| RelationError::Store("inserted friend request not found".to_owned()))?;
        debug!(%from, %to, request = %request.id, "friend request created");

        Ok(RequestOutcome::Pending(request))
    }

    /// Deletes the request `from -> to`; used for both cancel and reject.
    pub async fn remove(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError> {
        self.lock_pair(&mut *tx, from, to).await?;

        let deleted = self
            .requests
            .delete_in_tx(&mut *tx, RequestFilter::pair(from, to))
            .await?;
        if deleted == 0 {
            return Err(RelationError::RequestNotFound);
        }
        Ok(())
    }

    /// Bulk delete without a pair lock; no matches is not an error.
    pub async fn remove_all(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError> {
        self.requests.delete_in_tx(tx, filter).await
    }

    /// `to` accepts the request from `from`.
    pub async fn accept(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError> {
        self.lock_pair(&mut *tx, from, to).await?;

        if !self.requests.exists_in_tx(&mut *tx, from, to).await? {
            return Err(RelationError::RequestNotFound);
        }
        self.friendships.create_pair(&mut *tx, to, from).await?;
        self.requests
            .delete_in_tx(&mut *tx, RequestFilter::pair(from, to))
            .await?;
        Ok(())
    }

    /// Accepts every request addressed to `to`.
    ///
    /// The first listing only tells which senders to lock. Once `to` and all
    /// of them are locked, no request to `to` can be canceled or added, and a
    /// locking re-read gives the rows that are actually accepted.
    pub async fn accept_all(
        &self,
        tx: &mut dyn StorageTx<'_>,
        to: UserId,
    ) -> Result<u64, RelationError> {
        let pending = self.list_by_receiver(&mut *tx, to).await?;
        if pending.is_empty() {
            return Err(RelationError::NoRequestsFound);
        }

        let mut user_ids: Vec<UserId> = pending.iter().map(|r| r.from.id).collect();
        user_ids.push(to);
        self.accounts.lock_accounts_in_tx(&mut *tx, &user_ids).await?;

        let pending = self
            .requests
            .find_for_update_in_tx(&mut *tx, RequestFilter::to_user(to))
            .await?;
        if pending.is_empty() {
            return Err(RelationError::NoRequestsFound);
        }

        self.friendships.create_all_pairs(&mut *tx, &pending).await
    }

    pub async fn find(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<Option<FriendRequest>, RelationError> {
        Ok(self
            .filter(tx, RequestFilter::pair(from, to))
            .await?
            .into_iter()
            .next())
    }

    pub async fn filter(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        self.requests.find_in_tx(tx, filter).await
    }

    pub async fn list_by_sender(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        self.filter(tx, RequestFilter::from_user(from)).await
    }

    pub async fn list_by_receiver(
        &self,
        tx: &mut dyn StorageTx<'_>,
        to: UserId,
    ) -> Result<Vec<FriendRequest>, RelationError> {
        self.filter(tx, RequestFilter::to_user(to)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::application_port::{RelationError, RequestOutcome};
    use crate::domain_model::*;
    use crate::domain_port::{AccountRepo, FriendRequestRepo, StorageTx};
    use crate::infra_memory::MemoryFriendRequestRepo;
    use crate::test_util::Fixture;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// While armed, plain reads keep returning the first result, like a
    /// repeatable-read snapshot, and the request `canceled` disappears right
    /// after that first read as if its sender canceled concurrently.
    struct SnapshotRequests {
        inner: MemoryFriendRequestRepo,
        canceled: Mutex<Option<(UserId, UserId)>>,
        snapshot: Mutex<Option<Vec<FriendRequest>>>,
        armed: AtomicBool,
    }

    impl SnapshotRequests {
        fn new() -> Self {
            SnapshotRequests {
                inner: MemoryFriendRequestRepo::new(),
                canceled: Mutex::new(None),
                snapshot: Mutex::new(None),
                armed: AtomicBool::new(false),
            }
        }

        fn arm(&self, from: UserId, to: UserId) {
            *self.canceled.lock().unwrap() = Some((from, to));
            self.armed.store(true, Ordering::SeqCst);
        }

        fn disarm(&self) {
            self.armed.store(false, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl FriendRequestRepo for SnapshotRequests {
        async fn insert_in_tx(
            &self,
            tx: &mut dyn StorageTx<'_>,
            id: RequestId,
            from: UserId,
            to: UserId,
        ) -> Result<(), RelationError> {
            self.inner.insert_in_tx(tx, id, from, to).await
        }

        async fn find_in_tx(
            &self,
            tx: &mut dyn StorageTx<'_>,
            filter: RequestFilter,
        ) -> Result<Vec<FriendRequest>, RelationError> {
            if !self.armed.load(Ordering::SeqCst) {
                return self.inner.find_in_tx(tx, filter).await;
            }
            if let Some(rows) = self.snapshot.lock().unwrap().clone() {
                return Ok(rows);
            }

            let rows = self.inner.find_in_tx(&mut *tx, filter).await?;
            *self.snapshot.lock().unwrap() = Some(rows.clone());
            let canceled = self.canceled.lock().unwrap().take();
            if let Some((from, to)) = canceled {
                self.inner
                    .delete_in_tx(&mut *tx, RequestFilter::pair(from, to))
                    .await?;
            }
            Ok(rows)
        }

        async fn find_for_update_in_tx(
            &self,
            tx: &mut dyn StorageTx<'_>,
            filter: RequestFilter,
        ) -> Result<Vec<FriendRequest>, RelationError> {
            self.inner.find_for_update_in_tx(tx, filter).await
        }

        async fn exists_in_tx(
            &self,
            tx: &mut dyn StorageTx<'_>,
            from: UserId,
            to: UserId,
        ) -> Result<bool, RelationError> {
            self.inner.exists_in_tx(tx, from, to).await
        }

        async fn delete_in_tx(
            &self,
            tx: &mut dyn StorageTx<'_>,
            filter: RequestFilter,
        ) -> Result<u64, RelationError> {
            self.inner.delete_in_tx(tx, filter).await
        }
    }

    #[tokio::test]
    async fn create_persists_a_pending_request() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;

        let mut tx = fx.begin().await;
        let outcome = fx.requests.create(&mut *tx, alice, bob).await.unwrap();
        tx.commit().await.unwrap();

        match outcome {
            RequestOutcome::Pending(request) => {
                assert_eq!(request.from.username, "alice");
                assert_eq!(request.to.username, "bob");
            }
            RequestOutcome::Befriended => panic!("expected a pending request"),
        }
        assert!(fx.pending(alice, bob).await);
        assert!(!fx.pending(bob, alice).await);
    }

    #[tokio::test]
    async fn create_rejects_self_requests() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;

        let mut tx = fx.begin().await;
        let err = fx.requests.create(&mut *tx, alice, alice).await.unwrap_err();
        assert!(matches!(err, RelationError::SelfRequest));
    }

    #[tokio::test]
    async fn create_rejects_unknown_receiver() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;

        let mut tx = fx.begin().await;
        let err = fx
            .requests
            .create(&mut *tx, alice, UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelationError::UserNotFound));
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_existing_friends() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;
        let carol = fx.account("carol").await;

        let mut tx = fx.begin().await;
        fx.requests.create(&mut *tx, alice, bob).await.unwrap();
        let err = fx.requests.create(&mut *tx, alice, bob).await.unwrap_err();
        assert!(matches!(err, RelationError::DuplicateRequest));

        fx.friendships.create_pair(&mut *tx, alice, carol).await.unwrap();
        let err = fx.requests.create(&mut *tx, carol, alice).await.unwrap_err();
        assert!(matches!(err, RelationError::AlreadyFriends));
    }

    #[tokio::test]
    async fn reciprocal_request_becomes_a_friendship() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;

        let mut tx = fx.begin().await;
        fx.requests.create(&mut *tx, alice, bob).await.unwrap();
        let outcome = fx.requests.create(&mut *tx, bob, alice).await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(outcome, RequestOutcome::Befriended));
        assert_eq!(fx.friendship_rows(alice, bob).await, (1, 1));
        assert_eq!(fx.request_count().await, 0);
    }

    #[tokio::test]
    async fn remove_requires_an_existing_request() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;

        let mut tx = fx.begin().await;
        let err = fx.requests.remove(&mut *tx, alice, bob).await.unwrap_err();
        assert!(matches!(err, RelationError::RequestNotFound));

        fx.requests.create(&mut *tx, alice, bob).await.unwrap();
        fx.requests.remove(&mut *tx, alice, bob).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(fx.request_count().await, 0);
    }

    #[tokio::test]
    async fn accept_all_turns_every_incoming_request_into_a_friendship() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;
        let carol = fx.account("carol").await;

        let mut tx = fx.begin().await;
        let err = fx.requests.accept_all(&mut *tx, carol).await.unwrap_err();
        assert!(matches!(err, RelationError::NoRequestsFound));

        fx.requests.create(&mut *tx, alice, carol).await.unwrap();
        fx.requests.create(&mut *tx, bob, carol).await.unwrap();
        let outcome = fx.requests.create(&mut *tx, carol, bob).await.unwrap();
        assert!(matches!(outcome, RequestOutcome::Befriended));
        assert_eq!(fx.requests.accept_all(&mut *tx, carol).await.unwrap(), 1);
        tx.commit().await.unwrap();

        // carol -> bob was a reciprocal request and resolved on its own
        assert_eq!(fx.friendship_rows(alice, carol).await, (1, 1));
        assert_eq!(fx.friendship_rows(bob, carol).await, (1, 1));
        assert_eq!(fx.request_count().await, 0);
    }

    #[tokio::test]
    async fn listings_filter_by_direction() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;
        let carol = fx.account("carol").await;

        let mut tx = fx.begin().await;
        fx.requests.create(&mut *tx, alice, bob).await.unwrap();
        fx.requests.create(&mut *tx, alice, carol).await.unwrap();
        fx.requests.create(&mut *tx, carol, bob).await.unwrap();

        let sent = fx.requests.list_by_sender(&mut *tx, alice).await.unwrap();
        let received = fx.requests.list_by_receiver(&mut *tx, bob).await.unwrap();

        assert_eq!(
            sent.iter().map(|r| r.to.id).collect::<Vec<_>>(),
            vec![bob, carol]
        );
        assert_eq!(
            received.iter().map(|r| r.from.id).collect::<Vec<_>>(),
            vec![alice, carol]
        );
        assert!(fx.requests.find(&mut *tx, bob, alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn accept_all_skips_requests_canceled_after_the_first_read() {
        let repo = Arc::new(SnapshotRequests::new());
        let fx = Fixture::with_request_repo(repo.clone());
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;
        let carol = fx.account("carol").await;

        let mut tx = fx.begin().await;
        fx.requests.create(&mut *tx, alice, carol).await.unwrap();
        fx.requests.create(&mut *tx, bob, carol).await.unwrap();
        tx.commit().await.unwrap();

        repo.arm(alice, carol);
        let mut tx = fx.begin().await;
        let accepted = fx.requests.accept_all(&mut *tx, carol).await.unwrap();
        tx.commit().await.unwrap();
        repo.disarm();

        assert_eq!(accepted, 1);
        assert_eq!(fx.friendship_rows(alice, carol).await, (0, 0));
        assert_eq!(fx.friendship_rows(bob, carol).await, (1, 1));
        assert_eq!(fx.request_count().await, 0);
    }

    #[tokio::test]
    async fn accept_all_fails_when_every_request_was_canceled() {
        let repo = Arc::new(SnapshotRequests::new());
        let fx = Fixture::with_request_repo(repo.clone());
        let alice = fx.account("alice").await;
        let carol = fx.account("carol").await;

        let mut tx = fx.begin().await;
        fx.requests.create(&mut *tx, alice, carol).await.unwrap();
        tx.commit().await.unwrap();

        repo.arm(alice, carol);
        let mut tx = fx.begin().await;
        let err = fx.requests.accept_all(&mut *tx, carol).await.unwrap_err();
        drop(tx);
        repo.disarm();

        assert!(matches!(err, RelationError::NoRequestsFound));
        assert_eq!(fx.friendship_rows(alice, carol).await, (0, 0));
    }

    #[tokio::test]
    async fn lock_accounts_counts_distinct_existing_accounts() {
        let fx = Fixture::new();
        let alice = fx.account("alice").await;
        let bob = fx.account("bob").await;

        let mut tx = fx.begin().await;
        let locked = fx
            .accounts
            .lock_accounts_in_tx(&mut *tx, &[bob, alice, bob, UserId::new()])
            .await
            .unwrap();
        assert_eq!(locked, 2);
    }
}
