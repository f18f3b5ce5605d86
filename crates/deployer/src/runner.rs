//! The fixed deploy-then-invoke sequence.

use std::fmt;

use alloy::primitives::{Address, TxHash};
use tracing::{debug, info};

use crate::{
    DeployError,
    environment::{ContractFactory, ContractInstance, ExecutionEnvironment, PendingInvocation},
};

/// Number of action invocations performed after deployment.
pub const DEFAULT_INVOCATIONS: usize = 2;

/// Progress of a run. A failed run is aborted in the last state it reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    FactoryResolved,
    Deployed,
    /// The `n`th invocation is confirmed (1-based).
    Invoked(usize),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::FactoryResolved => f.write_str("factory resolved"),
            Self::Deployed => f.write_str("deployed"),
            Self::Invoked(n) => write!(f, "invocation {n} confirmed"),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Address the contract was deployed at.
    pub address: Address,
    /// Confirmed invocation transactions, in submission order.
    pub invocations: Vec<TxHash>,
}

/// A run that aborted. Steps confirmed before the failure stay on chain.
#[derive(Debug, thiserror::Error)]
#[error("run aborted after `{reached}`: {source}")]
pub struct RunFailure {
    pub reached: RunState,
    pub source: DeployError,
}

/// Drives a contract through deployment and a fixed number of action invocations.
///
/// Every step waits for the previous one to finish. The first error aborts the
/// sequence and nothing is retried.
#[derive(Debug)]
pub struct Runner<E> {
    env: E,
    contract: String,
    invocations: usize,
}

impl<E: ExecutionEnvironment> Runner<E> {
    pub fn new(env: E, contract: impl Into<String>) -> Self {
        Self {
            env,
            contract: contract.into(),
            invocations: DEFAULT_INVOCATIONS,
        }
    }

    /// Set how many times the action is invoked after deployment.
    pub fn with_invocations(mut self, invocations: usize) -> Self {
        self.invocations = invocations;
        self
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub async fn run(&self) -> Result<RunReport, RunFailure> {
        let mut state = RunState::Init;
        self.drive(&mut state)
            .await
            .map_err(|source| RunFailure {
                reached: state,
                source,
            })
    }

    async fn drive(&self, state: &mut RunState) -> Result<RunReport, DeployError> {
        let factory = self.env.get_factory(&self.contract).await?;
        *state = RunState::FactoryResolved;
        debug!(contract = %self.contract, "resolved contract factory");

        let mut instance = factory.deploy().await?;
        instance.wait_deployed().await?;
        *state = RunState::Deployed;

        let address = instance.address();
        info!(contract = %self.contract, %address, "contract deployed");

        let mut invocations = Vec::with_capacity(self.invocations);
        for index in 1..=self.invocations {
            let pending = instance.invoke_action().await?;
            let tx_hash = pending.wait().await?;
            *state = RunState::Invoked(index);
            info!(index, %tx_hash, "action confirmed");
            invocations.push(tx_hash);
        }

        Ok(RunReport {
            address,
            invocations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{io, sync::Arc};
    use test_case::test_case;
    use tracing_subscriber::fmt::MakeWriter;

    const CONTRACT: &str = "MyEpicNFT";

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        GetFactory(String),
        Deploy,
        WaitDeployed,
        Invoke(usize),
        Wait(usize),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FailAt {
        Factory,
        Deploy,
        WaitDeployed,
        Invoke(usize),
        Wait(usize),
    }

    #[derive(Clone)]
    struct MockEnv {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_at: Option<FailAt>,
        address: Address,
    }

    impl MockEnv {
        fn new(fail_at: Option<FailAt>) -> Self {
            Self {
                calls: Arc::default(),
                fail_at,
                address: Address::repeat_byte(0x42),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().push(call);
        }

        fn fails_at(&self, at: FailAt) -> bool {
            self.fail_at == Some(at)
        }

        fn invoked(&self) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|call| matches!(call, Call::Invoke(_)))
                .count()
        }
    }

    fn fault(msg: &str) -> io::Error {
        io::Error::other(msg.to_string())
    }

    struct MockFactory(MockEnv);
    struct MockInstance(MockEnv);
    struct MockInvocation(MockEnv, usize);

    #[async_trait::async_trait]
    impl ExecutionEnvironment for MockEnv {
        type Factory = MockFactory;

        async fn get_factory(&self, name: &str) -> Result<MockFactory, DeployError> {
            self.record(Call::GetFactory(name.to_string()));
            if self.fails_at(FailAt::Factory) {
                return Err(DeployError::factory_resolution(name, fault("no such artifact")));
            }
            Ok(MockFactory(self.clone()))
        }
    }

    #[async_trait::async_trait]
    impl ContractFactory for MockFactory {
        type Instance = MockInstance;

        async fn deploy(self) -> Result<MockInstance, DeployError> {
            self.0.record(Call::Deploy);
            if self.0.fails_at(FailAt::Deploy) {
                return Err(DeployError::deployment(fault("connection refused")));
            }
            Ok(MockInstance(self.0))
        }
    }

    #[async_trait::async_trait]
    impl ContractInstance for MockInstance {
        type Invocation = MockInvocation;

        fn address(&self) -> Address {
            self.0.address
        }

        async fn wait_deployed(&mut self) -> Result<(), DeployError> {
            self.0.record(Call::WaitDeployed);
            if self.0.fails_at(FailAt::WaitDeployed) {
                return Err(DeployError::confirmation(fault("deployment reverted")));
            }
            Ok(())
        }

        async fn invoke_action(&self) -> Result<MockInvocation, DeployError> {
            let index = self.0.invoked() + 1;
            self.0.record(Call::Invoke(index));
            if self.0.fails_at(FailAt::Invoke(index)) {
                return Err(DeployError::invocation(fault("execution reverted")));
            }
            Ok(MockInvocation(self.0.clone(), index))
        }
    }

    #[async_trait::async_trait]
    impl PendingInvocation for MockInvocation {
        async fn wait(self) -> Result<TxHash, DeployError> {
            let Self(env, index) = self;
            env.record(Call::Wait(index));
            if env.fails_at(FailAt::Wait(index)) {
                return Err(DeployError::confirmation(fault("timed out")));
            }
            Ok(TxHash::repeat_byte(index as u8))
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_successful_run() {
        let env = MockEnv::new(None);
        let report = Runner::new(env.clone(), CONTRACT).run().await.unwrap();

        assert_eq!(report.address, env.address);
        assert_eq!(
            report.invocations,
            vec![TxHash::repeat_byte(1), TxHash::repeat_byte(2)]
        );
        assert_eq!(
            env.calls(),
            vec![
                Call::GetFactory(CONTRACT.to_string()),
                Call::Deploy,
                Call::WaitDeployed,
                Call::Invoke(1),
                Call::Wait(1),
                Call::Invoke(2),
                Call::Wait(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_address_logged_once() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let env = MockEnv::new(None);
        let report = Runner::new(env, CONTRACT).run().await.unwrap();

        let address = report.address.to_string();
        let output = logs.contents();
        let lines: Vec<_> = output.lines().filter(|line| line.contains(&address)).collect();
        assert_eq!(lines.len(), 1, "unexpected log output:\n{output}");
        assert!(lines[0].contains("contract deployed"));
    }

    #[tokio::test]
    async fn test_invocation_count_is_configurable() {
        let env = MockEnv::new(None);
        let report = Runner::new(env.clone(), CONTRACT)
            .with_invocations(5)
            .run()
            .await
            .unwrap();

        assert_eq!(report.invocations.len(), 5);
        assert_eq!(env.invoked(), 5);
    }

    #[tokio::test]
    async fn test_zero_invocations_only_deploys() {
        let env = MockEnv::new(None);
        let report = Runner::new(env.clone(), CONTRACT)
            .with_invocations(0)
            .run()
            .await
            .unwrap();

        assert!(report.invocations.is_empty());
        assert_eq!(
            env.calls(),
            vec![
                Call::GetFactory(CONTRACT.to_string()),
                Call::Deploy,
                Call::WaitDeployed,
            ]
        );
    }

    #[test_case(
        FailAt::Factory,
        RunState::Init,
        vec![Call::GetFactory(CONTRACT.to_string())]
        ; "factory resolution failure skips deployment"
    )]
    #[test_case(
        FailAt::Deploy,
        RunState::FactoryResolved,
        vec![Call::GetFactory(CONTRACT.to_string()), Call::Deploy]
        ; "deployment failure skips invocations"
    )]
    #[test_case(
        FailAt::WaitDeployed,
        RunState::FactoryResolved,
        vec![Call::GetFactory(CONTRACT.to_string()), Call::Deploy, Call::WaitDeployed]
        ; "deployment confirmation failure skips invocations"
    )]
    #[test_case(
        FailAt::Invoke(1),
        RunState::Deployed,
        vec![
            Call::GetFactory(CONTRACT.to_string()),
            Call::Deploy,
            Call::WaitDeployed,
            Call::Invoke(1),
        ]
        ; "first invocation failure skips the second"
    )]
    #[test_case(
        FailAt::Wait(1),
        RunState::Deployed,
        vec![
            Call::GetFactory(CONTRACT.to_string()),
            Call::Deploy,
            Call::WaitDeployed,
            Call::Invoke(1),
            Call::Wait(1),
        ]
        ; "first confirmation failure skips the second invocation"
    )]
    #[test_case(
        FailAt::Invoke(2),
        RunState::Invoked(1),
        vec![
            Call::GetFactory(CONTRACT.to_string()),
            Call::Deploy,
            Call::WaitDeployed,
            Call::Invoke(1),
            Call::Wait(1),
            Call::Invoke(2),
        ]
        ; "second invocation failure keeps the first"
    )]
    #[test_case(
        FailAt::Wait(2),
        RunState::Invoked(1),
        vec![
            Call::GetFactory(CONTRACT.to_string()),
            Call::Deploy,
            Call::WaitDeployed,
            Call::Invoke(1),
            Call::Wait(1),
            Call::Invoke(2),
            Call::Wait(2),
        ]
        ; "second confirmation failure keeps the first"
    )]
    #[tokio::test]
    async fn test_fail_fast(fail_at: FailAt, reached: RunState, expected: Vec<Call>) {
        let env = MockEnv::new(Some(fail_at));
        let failure = Runner::new(env.clone(), CONTRACT).run().await.unwrap_err();

        assert_eq!(failure.reached, reached);
        assert_eq!(env.calls(), expected);

        let kind_matches = match fail_at {
            FailAt::Factory => matches!(failure.source, DeployError::FactoryResolution { .. }),
            FailAt::Deploy => matches!(failure.source, DeployError::Deployment(_)),
            FailAt::WaitDeployed | FailAt::Wait(_) => {
                matches!(failure.source, DeployError::Confirmation(_))
            }
            FailAt::Invoke(_) => matches!(failure.source, DeployError::Invocation(_)),
        };
        assert!(kind_matches, "unexpected error: {}", failure.source);
    }

    #[tokio::test]
    async fn test_failure_message_names_stage_and_cause() {
        let env = MockEnv::new(Some(FailAt::Deploy));
        let failure = Runner::new(env, CONTRACT).run().await.unwrap_err();

        let msg = failure.to_string();
        assert!(msg.contains("factory resolved"), "{msg}");
        assert!(msg.contains("connection refused"), "{msg}");
    }
}
