mod account_service_impl;
mod auth_service_impl;
mod history_service_impl;
mod session_store_memory;

pub use account_service_impl::*;
pub use auth_service_impl::*;
pub use history_service_impl::*;
pub use session_store_memory::*;

#[cfg(test)]
pub(crate) mod test_support;
