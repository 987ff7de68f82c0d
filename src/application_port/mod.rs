mod account_service;
mod auth_service;
mod history_service;
mod token_transport;

pub use account_service::*;
pub use auth_service::*;
pub use history_service::*;
pub use token_transport::*;
