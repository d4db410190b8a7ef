//! ezft server: range-aware static file serving over HTTP.

pub mod config;
pub mod error;
mod handlers;
pub mod middleware;
pub mod range;
pub mod server;

pub use config::{BasicAuth, ServerConfig};
pub use error::ApiError;
pub use server::{router, serve, serve_on};
