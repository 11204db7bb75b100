//! Process-local backend. All transactions are serialized on one mutex, so
//! it is meant for development and tests, not for multiple server replicas.

mod account_repo_memory;
mod auth_session_store_memory;
mod friend_request_repo_memory;
mod friendship_repo_memory;

pub use account_repo_memory::*;
pub use auth_session_store_memory::*;
pub use friend_request_repo_memory::*;
pub use friendship_repo_memory::*;

mod repo_tx_memory;

pub use repo_tx_memory::*;

mod util;
