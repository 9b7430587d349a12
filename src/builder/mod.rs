//! Incremental document-graph builder
//!
//! Turns one analyzed batch into upserts against the vault's five entity
//! kinds. The scanner recovers prior state, the aggregate folds compute
//! merged membership, classification decides per-topic display, and the
//! engine orders the steps and owns the failure policy.

pub mod aggregate;
pub mod classify;
pub mod engine;
pub mod scanner;

pub use aggregate::{AreaAggregate, TopicAggregate};
pub use classify::{classify, TopicClassification};
pub use engine::{RunReport, UpsertEngine};
pub use scanner::{ContributionDoc, ContributionIndex, ExistingEntity};
