//! Vault document store
//!
//! The vault is a plain directory of documents with structured headers
//! and wiki cross-references. This module owns the on-disk contract:
//! the frontmatter codec, the section/block document model with its
//! regenerable fenced region, slug and name normalization, the layout,
//! and the filesystem handle with sync bookkeeping.

pub mod document;
pub mod frontmatter;
pub mod ident;
pub mod layout;
mod store;

pub use document::{
    generated_region, parse_wiki_links, Block, Document, Section, WikiLink, GENERATED_BEGIN,
    GENERATED_END,
};
pub use frontmatter::{extract_value, split_document, FieldValue, Frontmatter, FrontmatterError};
pub use ident::{extract_ordinal, normalize_person_name, slugify};
pub use store::{
    SourceSync, SyncState, Vault, VaultError, VaultResult, DESCRIPTION_PLACEHOLDER,
};
