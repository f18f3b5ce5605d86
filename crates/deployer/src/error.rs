/// Boxed error carried as the source of every [`DeployError`] variant.
pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by the execution environment.
///
/// None of these are retried. The runner aborts on the first one it sees.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The named contract could not be found or did not compile.
    #[error("failed to resolve contract factory for `{name}`: {source}")]
    FactoryResolution {
        name: String,
        #[source]
        source: BoxError,
    },
    /// The deployment transaction could not be submitted.
    #[error("failed to deploy contract: {0}")]
    Deployment(#[source] BoxError),
    /// A submitted transaction timed out, reverted or produced an unexpected receipt.
    #[error("failed to confirm transaction: {0}")]
    Confirmation(#[source] BoxError),
    /// The action call was rejected before it could be mined.
    #[error("failed to invoke contract action: {0}")]
    Invocation(#[source] BoxError),
}

impl DeployError {
    pub fn factory_resolution(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::FactoryResolution {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn deployment(source: impl Into<BoxError>) -> Self {
        Self::Deployment(source.into())
    }

    pub fn confirmation(source: impl Into<BoxError>) -> Self {
        Self::Confirmation(source.into())
    }

    pub fn invocation(source: impl Into<BoxError>) -> Self {
        Self::Invocation(source.into())
    }
}
