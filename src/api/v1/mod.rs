mod error;
mod handler;
mod router;
mod transport;

pub use error::recover_error;
pub use router::routes;
pub use transport::{CookiePolicy, CookieTransport};
