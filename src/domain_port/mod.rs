// store

mod session_store;

pub use session_store::*;

// repo

mod auth_repo;
mod history_repo;
mod user_repo;

mod repo_tx;

pub use auth_repo::*;
pub use history_repo::*;
pub use user_repo::*;

pub use repo_tx::*;
