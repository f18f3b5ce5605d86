//! Deploys a contract and drives its action method against an execution environment.
//!
//! The [`Runner`] performs one fixed sequence: resolve the contract, deploy it,
//! wait for the deployment, then invoke the action a fixed number of times,
//! waiting for each call before sending the next. The environment is injected,
//! [`EvmEnvironment`] is the JSON-RPC implementation used by the binary.

mod artifacts;
mod config;
pub mod environment;
mod error;
mod evm;
mod runner;

pub use artifacts::{ArtifactError, ArtifactStore};
pub use config::{
    DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_CONFIRMATIONS, DEFAULT_PROJECT_ROOT, DEFAULT_RPC_URL,
    DEV_PRIVATE_KEY, DeployConfig,
};
pub use error::DeployError;
pub use evm::{EvmContract, EvmEnvironment, EvmFactory, EvmInvocation, ReceiptError};
pub use runner::{DEFAULT_INVOCATIONS, RunFailure, RunReport, RunState, Runner};
