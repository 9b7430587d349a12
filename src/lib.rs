//! Trellis: Incremental Knowledge-Vault Builder
//!
//! Ingests structured analysis results (questions, answers, and notes
//! extracted from source material by an external AI step) and assembles
//! them into a persistent, cross-linked vault of text documents. Re-runs
//! merge into existing documents instead of replacing them: membership
//! and attribution only grow, creation timestamps never move, and an
//! unchanged batch over unchanged disk state reproduces identical bytes.
//!
//! # Core Concepts
//!
//! - **Contributions**: Questions, Answers, and Notes, written once per id
//! - **Topics and Areas**: derived groupings, upserted monotonically
//! - **People**: per-author projections recomputed from the full known set
//!
//! # Example
//!
//! ```
//! use trellis::vault::Frontmatter;
//!
//! let mut fm = Frontmatter::new();
//! fm.push_str("title", "Auth");
//! fm.push_list("sources", ["slack-export"]);
//! assert!(fm.encode().starts_with("---\ntitle: \"Auth\"\n"));
//! ```

pub mod builder;
pub mod merge;
pub mod model;
pub mod stats;
pub mod vault;

pub use builder::{RunReport, UpsertEngine};
pub use merge::{ChunkMerger, CommandMergeClient, MergeClient, MergeError, MockMergeClient};
pub use model::{AnalysisResult, Answer, Contribution, ContributionKind, Link, Note, Question};
pub use stats::VaultStats;
pub use vault::{SourceSync, SyncState, Vault, VaultError, VaultResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
