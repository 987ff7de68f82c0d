mod history;
mod session;
mod token;
mod user;

pub use history::*;
pub use session::*;
pub use token::*;
pub use user::*;
