//! Foundry project artifacts: compiling the project and loading creation bytecode.

use std::{
    io,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use alloy::primitives::{Bytes, hex};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

/// Foundry's default output directory, relative to the project root.
const OUT_DIR: &str = "out";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no artifact at {} (is the contract name correct and the project built?)", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read artifact {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed artifact {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("artifact {} has no creation bytecode", path.display())]
    EmptyBytecode { path: PathBuf },
    #[error("artifact {} has invalid bytecode: {source}", path.display())]
    InvalidBytecode {
        path: PathBuf,
        source: hex::FromHexError,
    },
    #[error("failed to run `forge build`: {0}")]
    ForgeUnavailable(#[source] io::Error),
    #[error("`forge build` failed ({status}): {stderr}")]
    ForgeFailed { status: ExitStatus, stderr: String },
}

#[derive(Deserialize)]
struct FoundryArtifact {
    bytecode: BytecodeObject,
}

#[derive(Deserialize)]
struct BytecodeObject {
    object: String,
}

/// A Foundry project on disk.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the artifact Foundry writes for `name` (`out/<name>.sol/<name>.json`).
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root
            .join(OUT_DIR)
            .join(format!("{name}.sol"))
            .join(format!("{name}.json"))
    }

    /// Compile the project with `forge build`.
    pub async fn build(&self) -> Result<(), ArtifactError> {
        debug!(root = %self.root.display(), "running forge build");

        let output = Command::new("forge")
            .arg("build")
            .arg("--root")
            .arg(&self.root)
            .output()
            .await
            .map_err(ArtifactError::ForgeUnavailable)?;

        if !output.status.success() {
            return Err(ArtifactError::ForgeFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Load the creation bytecode of contract `name`.
    pub async fn load(&self, name: &str) -> Result<Bytes, ArtifactError> {
        let path = self.artifact_path(name);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound { path });
            }
            Err(source) => return Err(ArtifactError::Io { path, source }),
        };
        parse_bytecode(&path, &json)
    }
}

fn parse_bytecode(path: &Path, json: &str) -> Result<Bytes, ArtifactError> {
    let artifact: FoundryArtifact =
        serde_json::from_str(json).map_err(|source| ArtifactError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let bytecode = hex::decode(artifact.bytecode.object.trim()).map_err(|source| {
        ArtifactError::InvalidBytecode {
            path: path.to_path_buf(),
            source,
        }
    })?;
    if bytecode.is_empty() {
        return Err(ArtifactError::EmptyBytecode {
            path: path.to_path_buf(),
        });
    }

    Ok(bytecode.into())
}
