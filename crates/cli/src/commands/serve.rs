//! Start a project's dev server and keep it running

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use drt_common::DrtConfig;
use drt_runner::{BinaryLocator, ConfiguredBinaries, DevServerLauncher, DevServerRegistry};

use crate::output::{print_info, print_success};

#[derive(Args)]
pub struct ServeArgs {
    /// Project root containing the `test/` directory
    #[arg(short, long, default_value = ".")]
    project: PathBuf,
}

pub async fn execute(args: ServeArgs, config: DrtConfig) -> Result<()> {
    let locator = ConfiguredBinaries::from_config(&config);
    let mut launcher = DevServerLauncher::new(locator.dev_server()?, &config.server);
    launcher.terminate_grace = config.browser.terminate_grace();
    let registry = DevServerRegistry::new(launcher);

    let cancel = super::ctrl_c_token();
    let readiness = registry.acquire(&args.project);

    tokio::select! {
        ready = readiness.wait() => {
            if let Err(e) = ready {
                registry.shutdown().await;
                return Err(e.into());
            }
        }
        _ = cancel.cancelled() => {
            registry.shutdown().await;
            return Ok(());
        }
    }

    print_success(&format!(
        "Dev server for {} ready at {}",
        args.project.display(),
        config.server_url()
    ));
    print_info("Press Ctrl-C to stop");

    cancel.cancelled().await;
    registry.shutdown().await;
    Ok(())
}
