//! Execution environment backed by an EVM JSON-RPC node.

use std::time::Duration;

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    sol_types::SolCall,
};
use epic_contracts::IMyEpicNFT;
use eyre::Result;
use tracing::debug;

use crate::{
    ArtifactStore, DeployConfig, DeployError,
    environment::{ContractFactory, ContractInstance, ExecutionEnvironment, PendingInvocation},
};

/// Receipts that are mined but do not confirm what was submitted.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    #[error("deployment {tx_hash} created {}, expected {expected}", created(.actual))]
    UnexpectedAddress {
        tx_hash: TxHash,
        expected: Address,
        actual: Option<Address>,
    },
}

fn created(actual: &Option<Address>) -> String {
    actual.map_or_else(|| "no contract".to_string(), |address| address.to_string())
}

/// Settings shared by every transaction the environment submits.
#[derive(Debug, Clone, Copy)]
struct ConfirmationPolicy {
    confirmations: u64,
    timeout: Duration,
}

impl ConfirmationPolicy {
    /// Wait for `pending` to be mined and reject reverted receipts.
    async fn wait(
        self,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TransactionReceipt, DeployError> {
        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .with_timeout(Some(self.timeout))
            .get_receipt()
            .await
            .map_err(DeployError::confirmation)?;

        if !receipt.status() {
            return Err(DeployError::confirmation(ReceiptError::Reverted { tx_hash }));
        }
        Ok(receipt)
    }
}

/// Deploys Foundry artifacts through a signing HTTP provider.
pub struct EvmEnvironment {
    provider: DynProvider,
    deployer: Address,
    artifacts: ArtifactStore,
    build: bool,
    action: Bytes,
    confirmation: ConfirmationPolicy,
}

impl EvmEnvironment {
    /// Build a provider for `config`. No request is sent until the first step runs.
    pub fn connect(config: &DeployConfig) -> Result<Self> {
        let deployer = config.signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(config.signer.clone()))
            .connect_http(config.rpc_url.parse()?)
            .erased();

        Ok(Self {
            provider,
            deployer,
            artifacts: ArtifactStore::new(&config.project_root),
            build: config.build,
            action: IMyEpicNFT::makeAnEpicNFTCall {}.abi_encode().into(),
            confirmation: ConfirmationPolicy {
                confirmations: config.confirmations,
                timeout: config.timeout,
            },
        })
    }

    /// Replace the calldata sent by [`ContractInstance::invoke_action`].
    pub fn with_action(mut self, calldata: impl Into<Bytes>) -> Self {
        self.action = calldata.into();
        self
    }

    /// Account that signs every transaction.
    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

#[async_trait::async_trait]
impl ExecutionEnvironment for EvmEnvironment {
    type Factory = EvmFactory;

    async fn get_factory(&self, name: &str) -> Result<EvmFactory, DeployError> {
        if self.build {
            self.artifacts
                .build()
                .await
                .map_err(|err| DeployError::factory_resolution(name, err))?;
        }

        let bytecode = self
            .artifacts
            .load(name)
            .await
            .map_err(|err| DeployError::factory_resolution(name, err))?;
        debug!(
            contract = name,
            bytecode_len = bytecode.len(),
            "loaded creation bytecode"
        );

        Ok(EvmFactory {
            provider: self.provider.clone(),
            deployer: self.deployer,
            bytecode,
            action: self.action.clone(),
            confirmation: self.confirmation,
        })
    }
}

pub struct EvmFactory {
    provider: DynProvider,
    deployer: Address,
    bytecode: Bytes,
    action: Bytes,
    confirmation: ConfirmationPolicy,
}

#[async_trait::async_trait]
impl ContractFactory for EvmFactory {
    type Instance = EvmContract;

    async fn deploy(self) -> Result<EvmContract, DeployError> {
        // The nonce is pinned so the CREATE address is known before the receipt.
        let nonce = self
            .provider
            .get_transaction_count(self.deployer)
            .pending()
            .await
            .map_err(DeployError::deployment)?;

        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_nonce(nonce)
            .with_deploy_code(self.bytecode);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(DeployError::deployment)?;

        let address = self.deployer.create(nonce);
        debug!(
            %address,
            tx_hash = %pending.tx_hash(),
            nonce,
            "deployment submitted"
        );

        Ok(EvmContract {
            provider: self.provider,
            deployer: self.deployer,
            address,
            deployment: Some(pending),
            action: self.action,
            confirmation: self.confirmation,
        })
    }
}

pub struct EvmContract {
    provider: DynProvider,
    deployer: Address,
    address: Address,
    /// Deployment transaction, until it has been waited on.
    deployment: Option<PendingTransactionBuilder<Ethereum>>,
    action: Bytes,
    confirmation: ConfirmationPolicy,
}

#[async_trait::async_trait]
impl ContractInstance for EvmContract {
    type Invocation = EvmInvocation;

    fn address(&self) -> Address {
        self.address
    }

    async fn wait_deployed(&mut self) -> Result<(), DeployError> {
        let Some(pending) = self.deployment.take() else {
            return Ok(());
        };

        let receipt = self.confirmation.wait(pending).await?;
        if receipt.contract_address != Some(self.address) {
            return Err(DeployError::confirmation(ReceiptError::UnexpectedAddress {
                tx_hash: receipt.transaction_hash,
                expected: self.address,
                actual: receipt.contract_address,
            }));
        }

        debug!(
            address = %self.address,
            block_number = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "deployment confirmed"
        );
        Ok(())
    }

    async fn invoke_action(&self) -> Result<EvmInvocation, DeployError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_to(self.address)
            .with_input(self.action.clone());
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(DeployError::invocation)?;

        debug!(tx_hash = %pending.tx_hash(), "action submitted");
        Ok(EvmInvocation {
            pending,
            confirmation: self.confirmation,
        })
    }
}

pub struct EvmInvocation {
    pending: PendingTransactionBuilder<Ethereum>,
    confirmation: ConfirmationPolicy,
}

#[async_trait::async_trait]
impl PendingInvocation for EvmInvocation {
    async fn wait(self) -> Result<TxHash, DeployError> {
        let receipt = self.confirmation.wait(self.pending).await?;
        debug!(
            tx_hash = %receipt.transaction_hash,
            block_number = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "action mined"
        );
        Ok(receipt.transaction_hash)
    }
}
