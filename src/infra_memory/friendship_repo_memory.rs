use super::util::downcast;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;

#[derive(Debug, Default)]
pub struct MemoryFriendshipRepo;

impl MemoryFriendshipRepo {
    pub fn new() -> Self {
        MemoryFriendshipRepo
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MemoryFriendshipRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
        from: UserId,
        to: UserId,
    ) -> Result<(), RelationError> {
        downcast(tx).state().friendships.push(Friendship {
            id,
            from,
            to,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn exists_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        from: UserId,
        to: UserId,
    ) -> Result<bool, RelationError> {
        Ok(downcast(tx)
            .state()
            .friendships
            .iter()
            .any(|row| row.from == from && row.to == to))
    }

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<Vec<Friendship>, RelationError> {
        Ok(downcast(tx)
            .state()
            .friendships
            .iter()
            .filter(|row| filter.matches(row.from, row.to))
            .cloned()
            .collect())
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        filter: RequestFilter,
    ) -> Result<u64, RelationError> {
        let friendships = &mut downcast(tx).state().friendships;

        let before = friendships.len();
        friendships.retain(|row| !filter.matches(row.from, row.to));

        Ok((before - friendships.len()) as u64)
    }

    async fn list_friends_of_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        user_id: UserId,
    ) -> Result<Vec<Account>, RelationError> {
        let state = &*downcast(tx).state();

        let mut friends = state
            .friendships
            .iter()
            .filter(|row| row.to == user_id)
            .map(|row| {
                state.account(row.from).cloned().ok_or_else(|| {
                    RelationError::Store(format!("dangling friendship endpoint {}", row.from))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        friends.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(friends)
    }
}
