//! HTTP gateway exposing sync and query endpoints with bearer auth.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::GatewayServer;
