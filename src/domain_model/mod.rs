mod friend;
mod key;
mod user;

pub use friend::*;
pub use key::*;
pub use user::*;
