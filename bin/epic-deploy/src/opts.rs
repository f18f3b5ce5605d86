use std::{path::PathBuf, time::Duration};

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use epic_contracts::CONTRACT_NAME;
use epic_deployer::{
    DEFAULT_INVOCATIONS, DEFAULT_PROJECT_ROOT, DEFAULT_RPC_URL, DEV_PRIVATE_KEY, DeployConfig,
    EvmEnvironment, Runner,
};
use eyre::Result;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "epic-deploy")]
#[command(version, about = "Deploy MyEpicNFT to a local network and mint two tokens", long_about = None)]
pub(crate) struct DeployArgs {
    /// JSON-RPC endpoint of the target network
    #[arg(long, env = "EPIC_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Private key of the deploying account (defaults to the first dev account)
    #[arg(
        long,
        env = "EPIC_PRIVATE_KEY",
        default_value = DEV_PRIVATE_KEY,
        hide_default_value = true,
        hide_env_values = true
    )]
    private_key: PrivateKeySigner,

    /// Root of the Foundry project containing the contract
    #[arg(long, default_value = DEFAULT_PROJECT_ROOT)]
    project_root: PathBuf,

    /// Use existing artifacts instead of running `forge build`
    #[arg(long)]
    skip_build: bool,

    /// Blocks each transaction must be buried under
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    confirmations: u64,

    /// Seconds to wait for each confirmation
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
}

impl DeployArgs {
    pub(crate) async fn run(self) -> Result<()> {
        let config = DeployConfig::new(self.rpc_url, self.private_key)
            .with_project_root(self.project_root)
            .with_build(!self.skip_build)
            .with_confirmations(self.confirmations)
            .with_timeout(Duration::from_secs(self.timeout));

        let env = EvmEnvironment::connect(&config)?;
        info!(
            rpc_url = %config.rpc_url,
            deployer = %env.deployer(),
            contract = CONTRACT_NAME,
            "starting deployment"
        );

        let report = Runner::new(env, CONTRACT_NAME)
            .with_invocations(DEFAULT_INVOCATIONS)
            .run()
            .await?;

        info!(minted = report.invocations.len(), "all mints confirmed");
        Ok(())
    }
}
