//! Handles exposed by the execution environment the runner deploys into.
//!
//! Each handle is produced by the previous step and consumed (or borrowed) by
//! the next one, so the type system enforces the order the runner follows:
//! factory, instance, pending invocation.

use alloy::primitives::{Address, TxHash};

use crate::DeployError;

/// Entry point into a chain: resolves named contracts into deployable factories.
#[async_trait::async_trait]
pub trait ExecutionEnvironment: Send + Sync {
    type Factory: ContractFactory;

    /// Resolve the contract called `name`, compiling it first if the environment does so.
    async fn get_factory(&self, name: &str) -> Result<Self::Factory, DeployError>;
}

/// A resolved contract that can be deployed exactly once.
#[async_trait::async_trait]
pub trait ContractFactory: Send {
    type Instance: ContractInstance;

    /// Submit the deployment with no constructor arguments.
    async fn deploy(self) -> Result<Self::Instance, DeployError>;
}

/// A contract whose deployment has been submitted.
#[async_trait::async_trait]
pub trait ContractInstance: Send + Sync {
    type Invocation: PendingInvocation;

    /// Address the contract is (or will be) deployed at.
    fn address(&self) -> Address;

    /// Wait until the deployment transaction is confirmed.
    async fn wait_deployed(&mut self) -> Result<(), DeployError>;

    /// Submit one call of the contract's action method.
    async fn invoke_action(&self) -> Result<Self::Invocation, DeployError>;
}

/// A submitted state-changing call.
#[async_trait::async_trait]
pub trait PendingInvocation: Send {
    /// Wait until the call is confirmed and return its transaction hash.
    async fn wait(self) -> Result<TxHash, DeployError>;
}
