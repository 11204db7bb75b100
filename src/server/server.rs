use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{SessionBackend, Settings, StoreBackend};
use anyhow::anyhow;
use chrono::Duration;
use nanoid::nanoid;
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Repository handles for one storage backend.
struct Repos {
    tx_manager: Arc<dyn TxManager>,
    accounts: Arc<dyn AccountRepo>,
    requests: Arc<dyn FriendRequestRepo>,
    friendships: Arc<dyn FriendshipRepo>,
}

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub relationship_service: Arc<dyn RelationshipService>,
    run_id: String,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);

        let (repos, pool) = match settings.store.backend {
            StoreBackend::Mysql => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.mysql_dsn is required for the mysql backend"))?;
                let pool = Pool::<MySql>::connect(dsn).await?;
                let tx_manager = MySqlTxManager::new(pool.clone())
                    .with_lock_wait_timeout(settings.store.lock_wait_timeout_secs);
                let repos = Repos {
                    tx_manager: Arc::new(tx_manager),
                    accounts: Arc::new(MySqlAccountRepo::new()),
                    requests: Arc::new(MySqlFriendRequestRepo::new()),
                    friendships: Arc::new(MySqlFriendshipRepo::new()),
                };
                (repos, Some(pool))
            }
            StoreBackend::Memory => {
                let repos = Repos {
                    tx_manager: Arc::new(MemoryTxManager::new(MemoryStore::new())),
                    accounts: Arc::new(MemoryAccountRepo::new()),
                    requests: Arc::new(MemoryFriendRequestRepo::new()),
                    friendships: Arc::new(MemoryFriendshipRepo::new()),
                };
                (repos, None)
            }
        };

        let session_store: Arc<dyn AuthSessionStore> = match settings.session.backend {
            SessionBackend::Redis => {
                let dsn = settings
                    .session
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("session.redis_dsn is required for the redis backend"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisAuthSessionStore::new(
                    redis_manager,
                    settings.session.key_prefix.clone(),
                ))
            }
            SessionBackend::Memory => Arc::new(MemoryAuthSessionStore::new()),
        };

        let key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| {
                warn!("JWT_SIGNING_KEY is not set, using the development key");
                "my-dev-secret-key".to_string()
            })
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::seconds(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::seconds(settings.auth.refresh_ttl_secs),
            signing_key: key,
        }));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            repos.accounts.clone(),
            credential_hasher,
            token_codec,
            session_store,
            repos.tx_manager.clone(),
            AccountPolicy {
                min_username_len: settings.auth.min_username_len,
                min_password_len: settings.auth.min_password_len,
            },
        ));

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            repos.accounts.clone(),
            repos.tx_manager.clone(),
        ));

        let friendships = FriendshipLedger::new(repos.friendships, repos.requests.clone());
        let requests = RequestLedger::new(
            repos.accounts.clone(),
            repos.requests,
            friendships.clone(),
        );
        let relationship_service: Arc<dyn RelationshipService> =
            Arc::new(RealRelationshipService::new(
                repos.accounts,
                requests,
                friendships,
                repos.tx_manager,
            ));

        info!(
            %run_id,
            store = ?settings.store.backend,
            session = ?settings.session.backend,
            "server started"
        );

        Ok(Self {
            auth_service,
            user_service,
            relationship_service,
            run_id,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!(run_id = %self.run_id, "server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
