//! Chunk merge orchestration
//!
//! Large source material is analyzed in chunks; before the upsert engine
//! runs, the chunk results must be reduced to one logical batch. The
//! semantic merge itself is external and opaque to this crate. Two
//! implementations of the client seam:
//! - `CommandMergeClient`: pipes the chunk list as JSON through a
//!   configured external command (production)
//! - `MockMergeClient`: returns preconfigured results (testing)
//!
//! Orchestration is deliberately thin: nothing to merge is a hard error,
//! a single chunk passes through untouched, and a failed external merge
//! fails the whole step. A partial merge has no meaning downstream.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::model::AnalysisResult;

/// Errors from chunk merge operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("no analysis chunks to merge")]
    Empty,
    #[error("merge backend not available: {0}")]
    Unavailable(String),
    #[error("merge invocation failed: {0}")]
    InvocationFailed(String),
    #[error("merge output parse error: {0}")]
    ParseError(String),
}

/// Client trait for the external semantic merge.
///
/// Abstracts over how the merge backend is reached (subprocess, mock)
/// so the orchestrator and CLI don't depend on transport.
#[async_trait]
pub trait MergeClient: Send + Sync {
    /// Check if the merge backend is reachable.
    async fn is_available(&self) -> bool;

    /// Reduce N chunk results into one logical result.
    async fn merge(&self, chunks: &[AnalysisResult]) -> Result<AnalysisResult, MergeError>;
}

/// Production client: spawns a configured command, writes the chunk
/// list as JSON to its stdin, and parses one `AnalysisResult` from its
/// stdout.
pub struct CommandMergeClient {
    command: String,
}

impl CommandMergeClient {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl MergeClient for CommandMergeClient {
    async fn is_available(&self) -> bool {
        !self.command.trim().is_empty()
    }

    async fn merge(&self, chunks: &[AnalysisResult]) -> Result<AnalysisResult, MergeError> {
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(MergeError::Unavailable("no merge command configured".to_string()));
        };

        let input = serde_json::to_string(chunks)
            .map_err(|e| MergeError::InvocationFailed(e.to_string()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MergeError::Unavailable(format!("{}: {}", self.command, e)))?;

        // Feed stdin while the output side drains; writing the whole
        // payload first stalls once both pipe buffers fill. A command
        // that exits without consuming its input shows up in the exit
        // status, so the write result is not inspected.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(input.as_bytes()).await;
            }
        };
        let (output, _) = tokio::join!(child.wait_with_output(), feed);
        let output = output.map_err(|e| MergeError::InvocationFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MergeError::InvocationFailed(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| MergeError::ParseError(e.to_string()))
    }
}

/// Mock client for testing. Returns a preconfigured result.
pub struct MockMergeClient {
    available: bool,
    response: Option<AnalysisResult>,
    fail: bool,
}

impl MockMergeClient {
    /// Create a mock client that reports as available.
    pub fn available() -> Self {
        Self {
            available: true,
            response: None,
            fail: false,
        }
    }

    /// Create a mock client that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            response: None,
            fail: false,
        }
    }

    /// Register the merged result to return.
    pub fn with_response(mut self, response: AnalysisResult) -> Self {
        self.response = Some(response);
        self
    }

    /// Make every merge call fail.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl MergeClient for MockMergeClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn merge(&self, _chunks: &[AnalysisResult]) -> Result<AnalysisResult, MergeError> {
        if !self.available {
            return Err(MergeError::Unavailable(
                "mock client configured as unavailable".to_string(),
            ));
        }
        if self.fail {
            return Err(MergeError::InvocationFailed("mock merge failure".to_string()));
        }
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(MergeError::InvocationFailed(
                "no mock response configured".to_string(),
            )),
        }
    }
}

/// Reduces chunked analysis results to one logical batch.
pub struct ChunkMerger {
    client: Box<dyn MergeClient>,
}

impl ChunkMerger {
    pub fn new(client: Box<dyn MergeClient>) -> Self {
        Self { client }
    }

    /// Merge chunk results. Empty input is a hard error; a single chunk
    /// passes through without touching the backend.
    pub async fn merge_chunks(
        &self,
        mut chunks: Vec<AnalysisResult>,
    ) -> Result<AnalysisResult, MergeError> {
        if chunks.is_empty() {
            return Err(MergeError::Empty);
        }
        if chunks.len() == 1 {
            return Ok(chunks.remove(0));
        }
        if !self.client.is_available().await {
            return Err(MergeError::Unavailable(
                "merge backend required for multiple chunks".to_string(),
            ));
        }
        self.client.merge(&chunks).await
    }
}
