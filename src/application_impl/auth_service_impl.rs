use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::{AccountRepo, AuthSessionStore, TxManager};
use crate::logger::*;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub struct Argon2PasswordHasher;

fn join_error(e: tokio::task::JoinError) -> AuthError {
    AuthError::InternalError(format!("hashing task failed: {e}"))
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::InternalError(e.to_string()))
        })
        .await
        .map_err(join_error)?
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&password_hash)
                .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

            match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
            }
        })
        .await
        .map_err(join_error)?
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    typ: TokenKind,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn gen_jti() -> String {
        Uuid::new_v4().to_string()
    }

    fn encode(
        &self,
        user: UserId,
        jti: String,
        typ: TokenKind,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl = match typ {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        };
        let iat = Utc::now();
        let exp = iat + ttl;
        let claims = Claims {
            sub: user.to_string(),
            exp: exp.timestamp(),
            iat: iat.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti,
            typ,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((token, exp))
    }

    fn decode(&self, token: &str, typ: TokenKind) -> Result<TokenVerifyResult, AuthError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.leeway = 0;
        v.set_audience(&[self.cfg.audience.as_str()]);
        v.set_issuer(&[self.cfg.issuer.as_str()]);
        let data = decode::<Claims>(token, &DecodingKey::from_secret(&self.cfg.signing_key), &v)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?;

        // an access token must not pass as a refresh token and vice versa
        if data.claims.typ != typ {
            return Err(AuthError::TokenInvalid);
        }
        let user_id = data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::TokenInvalid)?;
        Ok(TokenVerifyResult {
            user_id,
            jti: Some(data.claims.jti),
        })
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: UserId,
        jti: Option<String>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let jti = jti.unwrap_or_else(Self::gen_jti);
        let (token, exp) = self.encode(user, jti, TokenKind::Access)?;
        Ok((AccessToken(token), exp))
    }

    async fn issue_refresh_token(
        &self,
        user: UserId,
        jti: String,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp) = self.encode(user, jti, TokenKind::Refresh)?;
        Ok((RefreshToken(token), exp))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        self.decode(&token.0, TokenKind::Access)
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        self.decode(&token.0, TokenKind::Refresh)
    }
}

/// Signup input limits, in characters.
#[derive(Debug, Clone, Copy)]
pub struct AccountPolicy {
    pub min_username_len: usize,
    pub min_password_len: usize,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        AccountPolicy {
            min_username_len: 3,
            min_password_len: 8,
        }
    }
}

impl AccountPolicy {
    fn validate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.trim() != username || username.is_empty() {
            return Err(AuthError::InvalidInput(
                "username must not be blank or padded with whitespace".to_owned(),
            ));
        }
        if username.chars().count() < self.min_username_len {
            return Err(AuthError::InvalidInput(format!(
                "username must be at least {} characters",
                self.min_username_len
            )));
        }
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::InvalidInput(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }
        Ok(())
    }
}

pub struct RealAuthService {
    accounts: Arc<dyn AccountRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn AuthSessionStore>,
    tx_manager: Arc<dyn TxManager>,
    policy: AccountPolicy,
}

impl RealAuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn AuthSessionStore>,
        tx_manager: Arc<dyn TxManager>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            accounts,
            credential_hasher,
            token_codec,
            session_store,
            tx_manager,
            policy,
        }
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    async fn account_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let exists = self.accounts.get_in_tx(&mut *tx, user_id).await?.is_some();
        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(exists)
    }

    /// Issues an access/refresh pair sharing one fresh `jti` and registers
    /// the `jti` as the live refresh session.
    async fn issue_tokens(&self, user_id: UserId) -> Result<AuthTokens, AuthError> {
        let jti = Uuid::new_v4().to_string();

        let (access_token, access_exp) = self
            .token_codec
            .issue_access_token(user_id, Some(jti.clone()))
            .await?;
        let (refresh_token, refresh_exp) = self
            .token_codec
            .issue_refresh_token(user_id, jti.clone())
            .await?;

        self.session_store
            .save_refresh_jti(user_id, &jti, Self::ttl_secs(refresh_exp))
            .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<SignupResult, AuthError> {
        let SignupInput { username, password } = request;
        self.policy.validate(&username, &password)?;

        // hashing is slow; keep it out of the transaction
        let password_hash = self.credential_hasher.hash_password(&password).await?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let account = self
            .accounts
            .create_in_tx(&mut *tx, UserId::new(), &username, &password_hash)
            .await?;
        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        info!(user_id = %account.id, username = %account.username, "account created");

        let tokens = self.issue_tokens(account.id).await?;
        Ok(SignupResult { account, tokens })
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { username, password } = request;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let credentials = self
            .accounts
            .get_credentials_in_tx(&mut *tx, &username)
            .await?;
        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let credentials = credentials.ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &credentials.password_hash)
            .await?;
        if !ok {
            debug!(%username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let user_id = credentials.account.id;
        let tokens = self.issue_tokens(user_id).await?;
        Ok(LoginResult { user_id, tokens })
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let verified = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_owned()))
            .await?;

        if !self.account_exists(verified.user_id).await? {
            return Err(AuthError::UserNotFound);
        }
        Ok(verified.user_id)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let verified = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_owned()))
            .await?;
        let user_id = verified.user_id;
        let jti = verified.jti.ok_or(AuthError::TokenInvalid)?;

        // rotation: a refresh token can be exchanged once
        match self.session_store.consume_refresh_jti(&jti).await? {
            Some(owner) if owner == user_id => {}
            _ => return Err(AuthError::TokenInvalid),
        }

        if !self.account_exists(user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        debug!(%user_id, "refresh token rotated");
        self.issue_tokens(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::*;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            issuer: "rapport-test".to_owned(),
            audience: "rapport-test-clients".to_owned(),
            access_ttl: Duration::minutes(5),
            refresh_ttl: Duration::days(1),
            signing_key: b"test-signing-key".to_vec(),
        }
    }

    fn service() -> RealAuthService {
        RealAuthService::new(
            Arc::new(MemoryAccountRepo::new()),
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(jwt_config())),
            Arc::new(MemoryAuthSessionStore::new()),
            Arc::new(MemoryTxManager::new(MemoryStore::new())),
            AccountPolicy::default(),
        )
    }

    fn signup_input(username: &str, password: &str) -> SignupInput {
        SignupInput {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn signup_issues_tokens_for_the_new_account() {
        let auth = service();
        let res = auth
            .signup(signup_input("alice", "correct horse"))
            .await
            .unwrap();

        assert_eq!(res.account.username, "alice");
        let user_id = auth.verify_token(&res.tokens.access_token.0).await.unwrap();
        assert_eq!(user_id, res.account.id);
        assert!(res.tokens.refresh_token_expires_at > res.tokens.access_token_expires_at);
    }

    #[tokio::test]
    async fn signup_rejects_taken_usernames_and_short_input() {
        let auth = service();
        auth.signup(signup_input("alice", "correct horse"))
            .await
            .unwrap();

        let err = auth
            .signup(signup_input("alice", "another password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err = auth.signup(signup_input("al", "correct horse")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        let err = auth.signup(signup_input("bob", "short")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let auth = service();
        let created = auth
            .signup(signup_input("alice", "correct horse"))
            .await
            .unwrap();

        let ok = auth
            .login(LoginInput {
                username: "alice".to_owned(),
                password: "correct horse".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user_id, created.account.id);

        let err = auth
            .login(LoginInput {
                username: "alice".to_owned(),
                password: "wrong horse".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth
            .login(LoginInput {
                username: "nobody".to_owned(),
                password: "correct horse".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn refresh_tokens_rotate_and_are_single_use() {
        let auth = service();
        let created = auth
            .signup(signup_input("alice", "correct horse"))
            .await
            .unwrap();
        let first = created.tokens.refresh_token.0;

        let rotated = auth.refresh_token(&first).await.unwrap();
        let err = auth.refresh_token(&first).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        // the replacement is live
        auth.refresh_token(&rotated.refresh_token.0).await.unwrap();
    }

    #[tokio::test]
    async fn token_kinds_are_not_interchangeable() {
        let auth = service();
        let created = auth
            .signup(signup_input("alice", "correct horse"))
            .await
            .unwrap();

        let err = auth
            .refresh_token(&created.tokens.access_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        let err = auth
            .verify_token(&created.tokens.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        let err = auth.verify_token("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn expired_access_tokens_are_reported_as_such() {
        let codec = JwtHs256Codec::new(JwtConfig {
            access_ttl: Duration::seconds(-10),
            ..jwt_config()
        });
        let (token, _) = codec.issue_access_token(UserId::new(), None).await.unwrap();

        let err = codec.verify_access_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn password_hashes_verify() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash_password("correct horse").await.unwrap();

        assert!(hasher.verify_password("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify_password("wrong horse", &hash).await.unwrap());
    }
}
