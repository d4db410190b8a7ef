//! CLI command handlers, one per file.

mod checksum;
mod client;
mod server;

pub use checksum::run_checksum;
pub use client::run_client;
pub use server::run_server;

#[cfg(test)]
pub(crate) use client::download_config;
#[cfg(test)]
pub(crate) use server::server_config;
