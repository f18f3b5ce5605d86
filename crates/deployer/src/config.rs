use std::{path::PathBuf, time::Duration};

use alloy::signers::local::PrivateKeySigner;

/// JSON-RPC endpoint of a local development node (anvil, hardhat).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// First prefunded account of the standard development mnemonic
/// ("test test ... junk"), shared by anvil and hardhat.
pub const DEV_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Foundry project holding the contract sources.
pub const DEFAULT_PROJECT_ROOT: &str = "contracts";

pub const DEFAULT_CONFIRMATIONS: u64 = 1;

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for [`EvmEnvironment`](crate::EvmEnvironment).
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub rpc_url: String,
    /// Account that deploys the contract and sends every invocation.
    pub signer: PrivateKeySigner,
    pub project_root: PathBuf,
    /// Run `forge build` before resolving artifacts.
    pub build: bool,
    /// Blocks a transaction must be buried under before it counts as confirmed.
    pub confirmations: u64,
    /// Upper bound on each confirmation wait.
    pub timeout: Duration,
}

impl DeployConfig {
    /// Config for `rpc_url` and `signer`, everything else at its default.
    pub fn new(rpc_url: impl Into<String>, signer: PrivateKeySigner) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            signer,
            project_root: PathBuf::from(DEFAULT_PROJECT_ROOT),
            build: true,
            confirmations: DEFAULT_CONFIRMATIONS,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_project_root(mut self, project_root: impl Into<PathBuf>) -> Self {
        self.project_root = project_root.into();
        self
    }

    pub fn with_build(mut self, build: bool) -> Self {
        self.build = build;
        self
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
