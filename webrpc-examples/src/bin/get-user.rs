//! GetUser demo
//!
//! Fetches user 1 from a gRPC-Web endpoint, once through each calling
//! convention, and prints the user's name.
//!
//! Usage:
//!   # Against a gRPC-Web proxy on the default address:
//!   cargo run --bin get-user
//!
//!   # Or specify a custom hostname:
//!   cargo run --bin get-user -- https://api.example.com
//!
//!   # With call tracing:
//!   RUST_LOG=webrpc_client=debug cargo run --bin get-user

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webrpc_client::{CallOptions, ClientBuilder, HyperTransport};
use webrpc_examples::{UserId, UserServiceClient, UserServicePromiseClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let hostname = env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    println!("=== GetUser ===");
    println!("Hostname: {hostname}");
    println!();

    // Both conventions share one transport and its connection pool.
    let transport = Arc::new(HyperTransport::new()?);

    println!("Future style...");
    let promise = ClientBuilder::new(hostname.as_str())
        .transport(transport.clone())
        .timeout(Duration::from_secs(10))
        .build_promise()
        .map(UserServicePromiseClient::new)?;

    match promise.get_user(&UserId { id: 1 }, CallOptions::new()).await {
        Ok(user) => {
            info!(id = user.id, "future-style call succeeded");
            println!("  name: {}", user.name);
        }
        Err(err) => {
            warn!(kind = ?err.kind(), code = %err.code(), "future-style call failed");
            println!("  failed ({:?}): {err}", err.kind());
        }
    }

    println!("Callback style...");
    let callback = ClientBuilder::new(hostname.as_str())
        .transport(transport)
        .timeout(Duration::from_secs(10))
        .build_callback()
        .map(UserServiceClient::new)?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    callback.get_user(&UserId { id: 1 }, CallOptions::new(), move |outcome| {
        let _ = tx.send(outcome);
    });

    match rx.await? {
        Ok(user) => {
            info!(id = user.id, "callback-style call succeeded");
            println!("  name: {}", user.name);
        }
        Err(err) => {
            warn!(kind = ?err.kind(), code = %err.code(), "callback-style call failed");
            println!("  failed ({:?}): {err}", err.kind());
        }
    }

    Ok(())
}
