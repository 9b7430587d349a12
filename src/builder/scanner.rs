//! Existing-state scanner
//!
//! Recovers prior state from persisted documents so a run can merge into
//! history instead of replacing it. Reads lean on the tolerant
//! frontmatter codec, since the vault accumulates files from older
//! format revisions and hand edits. A document that still fails to
//! parse is worth a warning, never an abort; the run proceeds as if
//! that document held no prior data.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::{Answer, ContributionKind, Note, Question};
use crate::vault::{
    generated_region, parse_wiki_links, Frontmatter, Vault, VaultError, VaultResult,
};

/// Prior state of an Area, Topic, or Person document.
#[derive(Debug, Clone, Default)]
pub struct ExistingEntity {
    /// Title as persisted; kept so a slug collision with a differently
    /// spelled batch title does not rename the entity.
    pub title: Option<String>,
    pub sources: BTreeSet<String>,
    pub contributors: BTreeSet<String>,
    /// Creation timestamp exactly as persisted. Re-emitted verbatim,
    /// never reparsed, so the first write wins forever.
    pub created: Option<String>,
    /// Topic titles recovered from the generated "Topics" link labels.
    pub topics: Vec<String>,
}

/// Header fields of a persisted Question/Answer/Note document.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionDoc {
    pub id: String,
    pub kind: ContributionKind,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub area: Option<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub answered_by: Option<String>,
    pub answers_question: Option<String>,
}

/// Everything known to be persisted, keyed by contribution id.
pub type ContributionIndex = BTreeMap<String, ContributionDoc>;

impl ContributionDoc {
    pub fn from_question(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            kind: ContributionKind::Question,
            author: q.author.clone(),
            date: Some(q.date),
            area: q.area.clone(),
            topics: q.topics.clone(),
            tags: q.tags.clone(),
            answered_by: q.answered_by.clone(),
            answers_question: None,
        }
    }

    pub fn from_answer(a: &Answer) -> Self {
        Self {
            id: a.id.clone(),
            kind: ContributionKind::Answer,
            author: a.author.clone(),
            date: Some(a.date),
            area: a.area.clone(),
            topics: a.topics.clone(),
            tags: a.tags.clone(),
            answered_by: None,
            answers_question: a.answers_question.clone(),
        }
    }

    pub fn from_note(n: &Note) -> Self {
        Self {
            id: n.id.clone(),
            kind: ContributionKind::Note,
            author: n.author.clone(),
            date: Some(n.date),
            area: n.area.clone(),
            topics: n.topics.clone(),
            tags: n.tags.clone(),
            answered_by: None,
            answers_question: None,
        }
    }
}

/// Read prior Area/Topic/Person state from a vault-relative path.
///
/// Errors bubble up so the caller can log and fall back to an empty
/// `ExistingEntity`; a missing file is not special-cased here because
/// callers check existence first.
pub fn read_existing(vault: &Vault, rel: &str) -> VaultResult<ExistingEntity> {
    let text = vault.read_to_string(rel)?;
    let fm = Frontmatter::parse(&text)?;

    let mut entity = ExistingEntity {
        title: fm.str_value("title"),
        sources: fm.list_value("sources").into_iter().collect(),
        contributors: fm.list_value("contributors").into_iter().collect(),
        created: fm.str_value("created"),
        topics: Vec::new(),
    };
    if let Some(region) = generated_region(&text) {
        entity.topics = topics_section_labels(region);
    }
    Ok(entity)
}

/// Labels of cross-reference links under the region's "Topics" heading.
fn topics_section_labels(region: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut in_topics = false;
    for line in region.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            in_topics = heading.trim() == "Topics";
            continue;
        }
        if !in_topics {
            continue;
        }
        for link in parse_wiki_links(line) {
            if !link.embed {
                labels.push(link.label);
            }
        }
    }
    labels
}

/// Read one persisted contribution document.
pub fn read_contribution(path: &Path) -> VaultResult<ContributionDoc> {
    let text = std::fs::read_to_string(path)?;
    let fm = Frontmatter::parse(&text)?;

    let id = match fm.str_value("id") {
        Some(id) => id,
        // Old files relied on the file name alone.
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string(),
    };
    let kind = match ContributionKind::kind_of(&id).or_else(|| kind_from_path(path)) {
        Some(kind) => kind,
        None => {
            return Err(VaultError::Document(format!(
                "unrecognized contribution id '{id}'"
            )))
        }
    };
    let date = fm
        .str_value("date")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));

    Ok(ContributionDoc {
        kind,
        id,
        author: fm.str_value("author").unwrap_or_default(),
        date,
        area: fm.str_value("area").filter(|a| !a.trim().is_empty()),
        topics: fm.list_value("topics"),
        tags: fm.list_value("tags"),
        answered_by: fm.str_value("answeredBy"),
        answers_question: fm.str_value("answersQuestion"),
    })
}

/// Kind of a document placed in a kind directory but carrying an id with
/// no recognized prefix.
fn kind_from_path(path: &Path) -> Option<ContributionKind> {
    let parent = path.parent()?.file_name()?.to_str()?;
    ContributionKind::all()
        .into_iter()
        .find(|k| k.dir_name() == parent)
}

/// Walk the three flat contribution directories into an immutable index.
///
/// An explicit fold: every readable document lands in the returned map,
/// unreadable ones are logged and skipped (the run continues with
/// partial information).
pub fn scan_contributions(vault: &Vault) -> VaultResult<ContributionIndex> {
    let mut index = ContributionIndex::new();
    for kind in ContributionKind::all() {
        for path in vault.list_markdown(kind.dir_name())? {
            match read_contribution(&path) {
                Ok(doc) => {
                    index.insert(doc.id.clone(), doc);
                }
                Err(e) => {
                    warn!("Skipping unreadable contribution {}: {}", path.display(), e);
                }
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Vault) {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path().join("vault")).unwrap();
        (dir, vault)
    }

    #[test]
    fn test_read_existing_canonical_document() {
        let (_dir, vault) = open_temp();
        vault
            .write(
                "areas/backend/backend.md",
                "---\n\
                 title: \"Backend\"\n\
                 created: \"2024-03-01T12:00:00Z\"\n\
                 sources: [\"src1\", \"src2\"]\n\
                 contributors: [\"Alice\", \"Bob\"]\n\
                 ---\n\
                 \n\
                 # Backend\n\
                 \n\
                 <!-- trellis:begin -->\n\
                 \n\
                 ## Topics\n\
                 - [[auth|Auth]]\n\
                 - [[session-handling|Session Handling]]\n\
                 <!-- trellis:end -->\n",
            )
            .unwrap();

        let entity = read_existing(&vault, "areas/backend/backend.md").unwrap();
        assert_eq!(entity.title.as_deref(), Some("Backend"));
        assert_eq!(entity.created.as_deref(), Some("2024-03-01T12:00:00Z"));
        assert_eq!(
            entity.sources.iter().cloned().collect::<Vec<_>>(),
            vec!["src1", "src2"]
        );
        assert_eq!(entity.contributors.len(), 2);
        assert_eq!(entity.topics, vec!["Auth", "Session Handling"]);
    }

    #[test]
    fn test_read_existing_tolerates_legacy_syntax() {
        let (_dir, vault) = open_temp();
        // Unquoted scalars and a single unbracketed source.
        vault
            .write(
                "topics/auth/auth.md",
                "---\ntitle: Auth\nsources: src1\ncontributors: Alice\ncreated: 2024-03-01T12:00:00Z\n---\nbody\n",
            )
            .unwrap();

        let entity = read_existing(&vault, "topics/auth/auth.md").unwrap();
        assert_eq!(entity.title.as_deref(), Some("Auth"));
        assert_eq!(entity.sources.iter().cloned().collect::<Vec<_>>(), vec!["src1"]);
        assert_eq!(
            entity.contributors.iter().cloned().collect::<Vec<_>>(),
            vec!["Alice"]
        );
        assert_eq!(entity.created.as_deref(), Some("2024-03-01T12:00:00Z"));
        assert!(entity.topics.is_empty());
    }

    #[test]
    fn test_read_existing_absent_keys_are_zero_values() {
        let (_dir, vault) = open_temp();
        vault
            .write("topics/auth/auth.md", "---\ntitle: \"Auth\"\n---\n")
            .unwrap();

        let entity = read_existing(&vault, "topics/auth/auth.md").unwrap();
        assert!(entity.sources.is_empty());
        assert!(entity.contributors.is_empty());
        assert!(entity.created.is_none());
    }

    #[test]
    fn test_read_contribution_fields() {
        let (_dir, vault) = open_temp();
        vault
            .write(
                "answers/a_0001.md",
                "---\n\
                 id: \"a_0001\"\n\
                 author: \"Bob\"\n\
                 date: \"2024-03-01T12:00:00Z\"\n\
                 area: \"Backend\"\n\
                 topics: [\"Auth\"]\n\
                 tags: [\"jwt\"]\n\
                 answersQuestion: \"q_0001\"\n\
                 ---\n\
                 \n\
                 Use refresh tokens.\n",
            )
            .unwrap();

        let doc = read_contribution(&vault.path("answers/a_0001.md")).unwrap();
        assert_eq!(doc.id, "a_0001");
        assert_eq!(doc.kind, ContributionKind::Answer);
        assert_eq!(doc.author, "Bob");
        assert_eq!(doc.area.as_deref(), Some("Backend"));
        assert_eq!(doc.topics, vec!["Auth"]);
        assert_eq!(doc.tags, vec!["jwt"]);
        assert_eq!(doc.answers_question.as_deref(), Some("q_0001"));
        assert!(doc.answered_by.is_none());
        assert!(doc.date.is_some());
    }

    #[test]
    fn test_read_contribution_falls_back_to_file_stem() {
        let (_dir, vault) = open_temp();
        vault
            .write("questions/q_0007.md", "---\nauthor: \"Alice\"\n---\nbody\n")
            .unwrap();

        let doc = read_contribution(&vault.path("questions/q_0007.md")).unwrap();
        assert_eq!(doc.id, "q_0007");
        assert_eq!(doc.kind, ContributionKind::Question);
    }

    #[test]
    fn test_scan_skips_unreadable_documents() {
        let (_dir, vault) = open_temp();
        vault
            .write(
                "questions/q_0001.md",
                "---\nid: \"q_0001\"\nauthor: \"Alice\"\n---\nok\n",
            )
            .unwrap();
        // No frontmatter at all: parse fails, scan continues.
        vault.write("questions/q_0002.md", "just text\n").unwrap();
        vault
            .write(
                "notes/n_0001.md",
                "---\nid: \"n_0001\"\nauthor: \"Cara\"\n---\nnote\n",
            )
            .unwrap();

        let index = scan_contributions(&vault).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains_key("q_0001"));
        assert!(index.contains_key("n_0001"));
        assert!(!index.contains_key("q_0002"));
    }

    #[test]
    fn test_scan_empty_vault() {
        let (_dir, vault) = open_temp();
        assert!(scan_contributions(&vault).unwrap().is_empty());
    }
}
