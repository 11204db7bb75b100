mod account_repo_mysql;
mod friend_request_repo_mysql;
mod friendship_repo_mysql;

pub use account_repo_mysql::*;
pub use friend_request_repo_mysql::*;
pub use friendship_repo_mysql::*;

mod repo_tx_mysql;

pub use repo_tx_mysql::*;

mod util;
