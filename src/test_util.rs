use crate::application_impl::{FriendshipLedger, RealRelationshipService, RequestLedger};
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use std::sync::Arc;

/// Services and ledgers wired onto a fresh in-memory store.
pub struct Fixture {
    pub tx_manager: Arc<dyn TxManager>,
    pub accounts: Arc<dyn AccountRepo>,
    pub friendships: FriendshipLedger,
    pub requests: RequestLedger,
    pub service: RealRelationshipService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_request_repo(Arc::new(MemoryFriendRequestRepo::new()))
    }

    /// Same wiring, with `request_repo` standing in for the memory one.
    pub fn with_request_repo(request_repo: Arc<dyn FriendRequestRepo>) -> Self {
        let tx_manager: Arc<dyn TxManager> = Arc::new(MemoryTxManager::new(MemoryStore::new()));
        let accounts: Arc<dyn AccountRepo> = Arc::new(MemoryAccountRepo::new());
        let friendship_repo: Arc<dyn FriendshipRepo> = Arc::new(MemoryFriendshipRepo::new());

        let friendships = FriendshipLedger::new(friendship_repo.clone(), request_repo.clone());
        let requests = RequestLedger::new(accounts.clone(), request_repo.clone(), friendships.clone());
        let service = RealRelationshipService::new(
            accounts.clone(),
            requests.clone(),
            friendships.clone(),
            tx_manager.clone(),
        );

        Self {
            tx_manager,
            accounts,
            friendships,
            requests,
            service,
        }
    }

    pub async fn begin(&self) -> Box<dyn StorageTx<'_> + '_> {
        self.tx_manager.begin().await.unwrap()
    }

    pub async fn account(&self, username: &str) -> UserId {
        let mut tx = self.begin().await;
        let account = self
            .accounts
            .create_in_tx(&mut *tx, UserId::new(), username, "not-a-real-hash")
            .await
            .unwrap();
        tx.commit().await.unwrap();
        account.id
    }

    /// Committed friendship rows as `((a, b) count, (b, a) count)`.
    pub async fn friendship_rows(&self, a: UserId, b: UserId) -> (usize, usize) {
        let mut tx = self.begin().await;
        let forward = self
            .friendships
            .filter(&mut *tx, RequestFilter::pair(a, b))
            .await
            .unwrap()
            .len();
        let backward = self
            .friendships
            .filter(&mut *tx, RequestFilter::pair(b, a))
            .await
            .unwrap()
            .len();
        (forward, backward)
    }

    pub async fn pending(&self, from: UserId, to: UserId) -> bool {
        let mut tx = self.begin().await;
        self.requests
            .find(&mut *tx, from, to)
            .await
            .unwrap()
            .is_some()
    }

    pub async fn request_count(&self) -> usize {
        let mut tx = self.begin().await;
        self.requests
            .filter(&mut *tx, RequestFilter::any())
            .await
            .unwrap()
            .len()
    }
}
