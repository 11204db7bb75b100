mod auth_service_impl;
mod friendship_ledger;
mod relationship_service_impl;
mod request_ledger;
mod user_service_impl;

pub use auth_service_impl::*;
pub use friendship_ledger::*;
pub use relationship_service_impl::*;
pub use request_ledger::*;
pub use user_service_impl::*;
