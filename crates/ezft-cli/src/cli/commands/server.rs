//! `ezft server`: serve a directory until interrupted.

use anyhow::Result;
use ezft_core::config::ServerDefaults;
use ezft_server::{BasicAuth, ServerConfig};
use tokio_util::sync::CancellationToken;

use super::super::{signal, ServerArgs};

/// Flags override the `[server]` table.
pub(crate) fn server_config(args: &ServerArgs, defaults: &ServerDefaults) -> ServerConfig {
    let basic_auth = match (&args.auth_user, &args.auth_password) {
        (Some(username), Some(password)) => Some(BasicAuth {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => defaults.basic_auth.as_ref().map(|a| BasicAuth {
            username: a.username.clone(),
            password: a.password.clone(),
        }),
    };
    ServerConfig {
        root: args.dir.clone().unwrap_or_else(|| defaults.root.clone()),
        port: args.port.unwrap_or(defaults.port),
        basic_auth,
    }
}

pub async fn run_server(args: ServerArgs, defaults: &ServerDefaults) -> Result<()> {
    let config = server_config(&args, defaults);
    println!(
        "EZFT server listening on {} (root: {})",
        config.bind_addr(),
        config.root.display()
    );

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        signal::shutdown_signal().await;
        println!("Shutting down server...");
        token.cancel();
    });

    ezft_server::serve(config, shutdown).await
}
