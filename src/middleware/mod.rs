mod client_identity;
mod error_handler;

pub use client_identity::{ClientId, UNKNOWN_CLIENT, client_identity, resolve_client_id};
pub use error_handler::{ErrorLogged, log_errors};
