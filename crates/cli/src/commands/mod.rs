//! CLI Commands

pub mod config;
pub mod run;
pub mod serve;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Token cancelled on the first Ctrl-C
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, stopping");
            trigger.cancel();
        }
    });
    token
}
